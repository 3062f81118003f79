use std::path::Path;
use std::time::Duration;

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Value};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use super::{DEFAULT_MYSQL_PORT, DataSource, Identifier, Population, SourceConfig, SourceKind};
use crate::error::{PaladinError, QueryError};

// Both relational backends collect the first column of every row.

pub struct MysqlSource {
    connection: Option<Conn>,
}

impl MysqlSource {
    pub fn connect(config: &SourceConfig) -> Result<Self, PaladinError> {
        let port = config.port.unwrap_or(DEFAULT_MYSQL_PORT);
        let location = format!("{}:{port}", config.location);
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.location.as_str()))
            .tcp_port(port)
            .user(config.user.as_deref())
            .pass(config.password.as_deref())
            .db_name(config.database.as_deref())
            .tcp_connect_timeout(Some(config.query_timeout))
            .read_timeout(Some(config.query_timeout))
            .write_timeout(Some(config.query_timeout));

        let connection = Conn::new(opts).map_err(|err| PaladinError::Connection {
            kind: SourceKind::Mysql.as_str(),
            location: location.clone(),
            reason: err.to_string(),
        })?;

        info!(
            location = %location,
            database = config.database.as_deref().unwrap_or_default(),
            "connected to mysql data source"
        );
        Ok(Self {
            connection: Some(connection),
        })
    }
}

fn identifier_from_mysql(value: &Value) -> Option<Identifier> {
    match value {
        Value::NULL => None,
        Value::Int(number) => Some(Identifier::Int(*number)),
        Value::UInt(number) => Some(
            i64::try_from(*number)
                .map(Identifier::Int)
                .unwrap_or_else(|_| Identifier::Text(number.to_string())),
        ),
        Value::Float(number) => Some(Identifier::from_real(f64::from(*number))),
        Value::Double(number) => Some(Identifier::from_real(*number)),
        Value::Bytes(bytes) => Some(Identifier::from_lexical(&String::from_utf8_lossy(bytes))),
        temporal => Some(Identifier::Text(
            temporal.as_sql(true).trim_matches('\'').to_string(),
        )),
    }
}

impl DataSource for MysqlSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mysql
    }

    fn try_query(&mut self, text: &str) -> Result<Population, QueryError> {
        let connection = self.connection.as_mut().ok_or(QueryError::Closed)?;
        let result = connection.query_iter(text)?;
        if result.columns().as_ref().is_empty() {
            return Err(QueryError::NoColumns);
        }

        let mut population = Population::new();
        for row in result {
            let row = row?;
            if let Some(identifier) = row.as_ref(0).and_then(identifier_from_mysql) {
                population.insert(identifier);
            }
        }

        debug!(rows = population.len(), "mysql query finished");
        Ok(population)
    }

    fn close(&mut self) {
        self.connection = None;
    }
}

pub struct SqliteSource {
    connection: Option<Connection>,
}

impl SqliteSource {
    pub fn open(path: &str, query_timeout: Duration) -> Result<Self, PaladinError> {
        let connection_error = |reason: String| PaladinError::Connection {
            kind: SourceKind::Sqlite.as_str(),
            location: path.to_string(),
            reason,
        };

        if !Path::new(path).exists() {
            return Err(connection_error("database file does not exist".to_string()));
        }

        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| connection_error(err.to_string()))?;
        connection
            .busy_timeout(query_timeout)
            .map_err(|err| connection_error(err.to_string()))?;

        info!(path = %path, "opened sqlite data source read-only");
        Ok(Self::from_connection(connection))
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
        }
    }
}

fn identifier_from_value(value: ValueRef<'_>) -> Option<Identifier> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(number) => Some(Identifier::Int(number)),
        ValueRef::Real(number) => Some(Identifier::from_real(number)),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(Identifier::from_lexical(&String::from_utf8_lossy(bytes)))
        }
    }
}

impl DataSource for SqliteSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Sqlite
    }

    fn try_query(&mut self, text: &str) -> Result<Population, QueryError> {
        let connection = self.connection.as_ref().ok_or(QueryError::Closed)?;
        let mut statement = connection.prepare(text)?;
        if statement.column_count() == 0 {
            return Err(QueryError::NoColumns);
        }

        let mut rows = statement.query([])?;
        let mut population = Population::new();
        while let Some(row) = rows.next()? {
            if let Some(identifier) = identifier_from_value(row.get_ref(0)?) {
                population.insert(identifier);
            }
        }

        debug!(rows = population.len(), "sqlite query finished");
        Ok(population)
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err((_, err)) = connection.close() {
                debug!(error = %err, "sqlite connection did not close cleanly");
            }
        }
    }
}

impl Drop for SqliteSource {
    fn drop(&mut self) {
        self.close();
    }
}
