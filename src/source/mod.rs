use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::error::{PaladinError, QueryError};

pub mod relational;
pub mod sparql;
#[cfg(test)]
pub mod testing;

pub use relational::{MysqlSource, SqliteSource};
pub use sparql::SparqlSource;

pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

impl Identifier {
    // Only canonical i64 text folds to Int, so "042" stays textual.
    pub fn from_lexical(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(number) if number.to_string() == value => Self::Int(number),
            _ => Self::Text(value.to_string()),
        }
    }

    pub fn from_real(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Self::Int(value as i64)
        } else {
            Self::Text(value.to_string())
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

pub type Population = BTreeSet<Identifier>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SourceKind {
    Mysql,
    Sqlite,
    SparqlEndpoint,
}

impl SourceKind {
    pub fn parse(raw: &str) -> Result<Self, PaladinError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::Mysql),
            "sqlite" | "sql" => Ok(Self::Sqlite),
            "sparql-endpoint" | "sparql" => Ok(Self::SparqlEndpoint),
            other => Err(PaladinError::configuration(format!(
                "unsupported data source kind '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::SparqlEndpoint => "sparql-endpoint",
        }
    }
}

#[derive(Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    // MySQL host, SQLite file path or SPARQL endpoint URL.
    pub location: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub query_timeout: Duration,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

pub trait DataSource {
    fn kind(&self) -> SourceKind;

    fn try_query(&mut self, text: &str) -> Result<Population, QueryError>;

    // Must be idempotent.
    fn close(&mut self);

    fn query(&mut self, text: &str) -> Population {
        match self.try_query(text) {
            Ok(population) => population,
            Err(err) => {
                warn!(
                    source = self.kind().as_str(),
                    error = %err,
                    query = %text,
                    "query failed, treating result as empty"
                );
                Population::new()
            }
        }
    }
}

pub fn connect(config: &SourceConfig) -> Result<Box<dyn DataSource>, PaladinError> {
    match config.kind {
        SourceKind::Mysql => Ok(Box::new(MysqlSource::connect(config)?)),
        SourceKind::Sqlite => Ok(Box::new(SqliteSource::open(
            &config.location,
            config.query_timeout,
        )?)),
        SourceKind::SparqlEndpoint => Ok(Box::new(SparqlSource::connect(
            &config.location,
            config.query_timeout,
        )?)),
    }
}
