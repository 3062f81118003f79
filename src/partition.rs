use serde::Serialize;

use crate::source::{DataSource, Population};
use crate::tree::ValidationNode;

// validated and violated are disjoint; their union is the narrowed population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodePartition {
    pub validated: Population,
    pub violated: Population,
}

impl NodePartition {
    pub fn population_size(&self) -> usize {
        self.validated.len() + self.violated.len()
    }
}

pub fn partition(
    node: &ValidationNode,
    mut population: Population,
    source: &mut dyn DataSource,
) -> NodePartition {
    if let Some(target_query) = node.target_query.as_deref() {
        let target = source.query(target_query);
        population.retain(|identifier| target.contains(identifier));
    }

    let Some(validation_query) = node.validation_query.as_deref() else {
        return NodePartition {
            validated: population,
            violated: Population::new(),
        };
    };

    let passing = source.query(validation_query);
    let (validated, violated) = population
        .into_iter()
        .partition(|identifier| passing.contains(identifier));
    NodePartition {
        validated,
        violated,
    }
}
