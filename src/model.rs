use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PaladinError;
use crate::source::{DEFAULT_QUERY_TIMEOUT_MS, SourceConfig, SourceKind};

#[derive(Debug, Clone, Deserialize)]
pub struct TreeDescription {
    pub data_source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
    pub population: String,
    pub tree: NodeSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub validation: Option<String>,
    #[serde(default)]
    pub left: Option<ChildSpec>,
    #[serde(default)]
    pub right: Option<ChildSpec>,
}

// "" in a child slot means no child.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChildSpec {
    Node(Box<NodeSpec>),
    Placeholder(String),
}

impl TreeDescription {
    pub fn source_config(
        &self,
        timeout_override_ms: Option<u64>,
    ) -> Result<SourceConfig, PaladinError> {
        let kind = SourceKind::parse(&self.data_source)?;
        let (field, raw_location) = match kind {
            SourceKind::Mysql | SourceKind::SparqlEndpoint => ("url", self.url.as_deref()),
            SourceKind::Sqlite => ("database", self.database.as_deref()),
        };
        let location = non_empty(raw_location).ok_or_else(|| {
            PaladinError::configuration(format!(
                "data source '{}' requires a non-empty '{field}' field",
                kind.as_str()
            ))
        })?;

        let timeout_ms = timeout_override_ms
            .or(self.query_timeout_ms)
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_MS);

        Ok(SourceConfig {
            kind,
            location,
            port: self.port,
            user: non_empty(self.user.as_deref()),
            password: self.password.clone(),
            database: non_empty(self.database.as_deref()),
            query_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeCounts {
    pub validated: usize,
    pub violated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub summary_version: u32,
    pub run_id: String,
    pub strategy: String,
    pub started_at: String,
    pub finished_at: String,
    pub tree_path: String,
    pub data_source: String,
    pub population_size: usize,
    pub node_count: usize,
    pub visited_node_count: usize,
    pub report_path: String,
    pub nodes: BTreeMap<String, NodeCounts>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_description_resolves_connection_parameters() {
        let raw = r#"
        {
          "data_source": "mysql",
          "url": "127.0.0.1",
          "port": 3306,
          "user": "root",
          "password": "secret",
          "database": "paladin",
          "population": "SELECT id FROM patients",
          "tree": { "name": "root", "target": "", "validation": "SELECT id FROM ok", "left": "", "right": "" }
        }
        "#;

        let description: TreeDescription =
            serde_json::from_str(raw).expect("description should deserialize");
        let config = description
            .source_config(None)
            .expect("mysql config should resolve");
        assert_eq!(config.kind, SourceKind::Mysql);
        assert_eq!(config.location, "127.0.0.1");
        assert_eq!(config.port, Some(3306));
        assert_eq!(config.user.as_deref(), Some("root"));
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.database.as_deref(), Some("paladin"));
        assert!(!format!("{config:?}").contains("secret"));
        assert_eq!(
            config.query_timeout,
            Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS)
        );
        assert!(matches!(description.tree.left, Some(ChildSpec::Placeholder(ref s)) if s.is_empty()));
    }

    #[test]
    fn sqlite_description_uses_database_as_location() {
        let raw = r#"
        {
          "data_source": "sqlite",
          "database": "cohort.sqlite",
          "population": "SELECT id FROM patients",
          "tree": { "name": "root" }
        }
        "#;

        let description: TreeDescription =
            serde_json::from_str(raw).expect("description should deserialize");
        let config = description
            .source_config(None)
            .expect("sqlite config should resolve");
        assert_eq!(config.kind, SourceKind::Sqlite);
        assert_eq!(config.location, "cohort.sqlite");
        assert_eq!(config.port, None);
    }

    #[test]
    fn source_config_prefers_cli_timeout_override() {
        let raw = r#"
        {
          "data_source": "sparql-endpoint",
          "url": "http://localhost:8890/sparql",
          "query_timeout_ms": 500,
          "population": "SELECT ?p WHERE { ?p a <Patient> }",
          "tree": { "name": "root" }
        }
        "#;

        let description: TreeDescription =
            serde_json::from_str(raw).expect("description should deserialize");
        let from_file = description.source_config(None).expect("config should resolve");
        assert_eq!(from_file.query_timeout, Duration::from_millis(500));
        let overridden = description
            .source_config(Some(2_000))
            .expect("config should resolve");
        assert_eq!(overridden.query_timeout, Duration::from_secs(2));
        assert_eq!(overridden.kind, SourceKind::SparqlEndpoint);
    }

    #[test]
    fn source_config_requires_location_for_kind() {
        let raw = r#"
        {
          "data_source": "sparql-endpoint",
          "database": "unused.sqlite",
          "population": "SELECT ?p WHERE {}",
          "tree": { "name": "root" }
        }
        "#;

        let description: TreeDescription =
            serde_json::from_str(raw).expect("description should deserialize");
        let err = description
            .source_config(None)
            .expect_err("missing url should be rejected");
        assert!(matches!(err, PaladinError::Configuration(_)));
    }

    #[test]
    fn node_spec_requires_name() {
        let raw = r#"{ "target": "SELECT 1", "validation": null }"#;
        assert!(serde_json::from_str::<NodeSpec>(raw).is_err());
    }
}
