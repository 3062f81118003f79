use std::collections::HashMap;

use super::{DataSource, Identifier, Population, SourceKind};
use crate::error::QueryError;

// Unknown queries fail.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    responses: HashMap<String, Option<Population>>,
    pub issued: Vec<String>,
    pub closed: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, query: &str, values: &[i64]) -> Self {
        self.responses.insert(query.to_string(), Some(ids(values)));
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.responses.insert(query.to_string(), None);
        self
    }

    pub fn issued_count(&self, query: &str) -> usize {
        self.issued.iter().filter(|issued| *issued == query).count()
    }
}

impl DataSource for ScriptedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Sqlite
    }

    fn try_query(&mut self, text: &str) -> Result<Population, QueryError> {
        if self.closed {
            return Err(QueryError::Closed);
        }
        self.issued.push(text.to_string());
        match self.responses.get(text) {
            Some(Some(population)) => Ok(population.clone()),
            Some(None) => Err(QueryError::MalformedResult(format!(
                "scripted failure for '{text}'"
            ))),
            None => Err(QueryError::MalformedResult(format!(
                "no scripted response for '{text}'"
            ))),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

pub fn ids(values: &[i64]) -> Population {
    values.iter().copied().map(Identifier::Int).collect()
}
