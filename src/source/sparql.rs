use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info};

use super::{DataSource, Identifier, Population, SourceKind};
use crate::error::{PaladinError, QueryError};

const RESULTS_MEDIA_TYPE: &str = "application/sparql-results+json";
const USER_AGENT: &str = concat!("paladin/", env!("CARGO_PKG_VERSION"));
const PROBE_QUERY: &str = "ASK {}";

pub struct SparqlSource {
    endpoint: String,
    client: Option<Client>,
}

impl SparqlSource {
    pub fn connect(endpoint: &str, query_timeout: Duration) -> Result<Self, PaladinError> {
        let connection_error = |reason: String| PaladinError::Connection {
            kind: SourceKind::SparqlEndpoint.as_str(),
            location: endpoint.to_string(),
            reason,
        };

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(query_timeout)
            .build()
            .map_err(|err| connection_error(err.to_string()))?;

        let source = Self {
            endpoint: endpoint.to_string(),
            client: Some(client),
        };
        source
            .send(PROBE_QUERY)
            .map_err(|err| connection_error(err.to_string()))?;

        info!(endpoint = %endpoint, "connected to sparql endpoint");
        Ok(source)
    }

    fn send(&self, text: &str) -> Result<Value, QueryError> {
        let client = self.client.as_ref().ok_or(QueryError::Closed)?;
        let response = client
            .post(&self.endpoint)
            .header(ACCEPT, RESULTS_MEDIA_TYPE)
            .form(&[("query", text)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QueryError::Status(status.as_u16(), body));
        }

        Ok(response.json()?)
    }
}

// Unbound solutions are skipped.
pub fn parse_select_results(document: &Value) -> Result<Population, QueryError> {
    let variable = document
        .pointer("/head/vars/0")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::MalformedResult("no projection variable in head".into()))?;
    let bindings = document
        .pointer("/results/bindings")
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::MalformedResult("missing results.bindings".into()))?;

    let mut population = Population::new();
    for solution in bindings {
        let Some(term) = solution.get(variable) else {
            continue;
        };
        let value = term.get("value").and_then(Value::as_str).ok_or_else(|| {
            QueryError::MalformedResult(format!("binding for ?{variable} has no value"))
        })?;
        population.insert(Identifier::from_lexical(value));
    }
    Ok(population)
}

impl DataSource for SparqlSource {
    fn kind(&self) -> SourceKind {
        SourceKind::SparqlEndpoint
    }

    fn try_query(&mut self, text: &str) -> Result<Population, QueryError> {
        let document = self.send(text)?;
        let population = parse_select_results(&document)?;
        debug!(solutions = population.len(), "sparql query finished");
        Ok(population)
    }

    fn close(&mut self) {
        self.client = None;
    }
}
