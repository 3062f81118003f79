use std::collections::HashSet;

use crate::error::PaladinError;
use crate::model::{ChildSpec, NodeSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationNode {
    pub name: String,
    pub target_query: Option<String>,
    pub validation_query: Option<String>,
    pub left: Option<Box<ValidationNode>>,
    pub right: Option<Box<ValidationNode>>,
}

impl ValidationNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_query: None,
            validation_query: None,
            left: None,
            right: None,
        }
    }

    pub fn with_target(mut self, query: impl Into<String>) -> Self {
        self.target_query = Some(query.into());
        self
    }

    pub fn with_validation(mut self, query: impl Into<String>) -> Self {
        self.validation_query = Some(query.into());
        self
    }

    pub fn with_left(mut self, child: ValidationNode) -> Self {
        self.left = Some(Box::new(child));
        self
    }

    pub fn with_right(mut self, child: ValidationNode) -> Self {
        self.right = Some(Box::new(child));
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTree {
    root: ValidationNode,
}

impl ValidationTree {
    pub fn new(root: ValidationNode) -> Result<Self, PaladinError> {
        let tree = Self { root };
        tree.check_names()?;
        Ok(tree)
    }

    pub fn from_spec(spec: &NodeSpec) -> Result<Self, PaladinError> {
        Self::new(node_from_spec(spec)?)
    }

    pub fn root(&self) -> &ValidationNode {
        &self.root
    }

    pub fn preorder(&self) -> Vec<&ValidationNode> {
        let mut ordered = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            ordered.push(node);
            if let Some(right) = node.right.as_deref() {
                stack.push(right);
            }
            if let Some(left) = node.left.as_deref() {
                stack.push(left);
            }
        }
        ordered
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.preorder()
            .into_iter()
            .map(|node| node.name.as_str())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    fn check_names(&self) -> Result<(), PaladinError> {
        let mut seen = HashSet::new();
        for node in self.preorder() {
            if node.name.trim().is_empty() {
                return Err(PaladinError::configuration("node name must not be empty"));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(PaladinError::configuration(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
        }
        Ok(())
    }
}

fn non_empty_query(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(str::to_string)
}

fn child_from_spec(
    parent: &str,
    slot: &str,
    child: &Option<ChildSpec>,
) -> Result<Option<Box<ValidationNode>>, PaladinError> {
    match child {
        None => Ok(None),
        Some(ChildSpec::Placeholder(text)) if text.trim().is_empty() => Ok(None),
        Some(ChildSpec::Placeholder(text)) => Err(PaladinError::configuration(format!(
            "node '{parent}' has a {slot} child that is neither a node nor empty: '{text}'"
        ))),
        Some(ChildSpec::Node(spec)) => Ok(Some(Box::new(node_from_spec(spec)?))),
    }
}

fn node_from_spec(spec: &NodeSpec) -> Result<ValidationNode, PaladinError> {
    Ok(ValidationNode {
        name: spec.name.trim().to_string(),
        target_query: non_empty_query(&spec.target),
        validation_query: non_empty_query(&spec.validation),
        left: child_from_spec(&spec.name, "left", &spec.left)?,
        right: child_from_spec(&spec.name, "right", &spec.right)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<ValidationTree, PaladinError> {
        let spec: NodeSpec = serde_json::from_str(raw).expect("node spec should deserialize");
        ValidationTree::from_spec(&spec)
    }

    #[test]
    fn from_spec_treats_empty_strings_and_nulls_as_absent() {
        let tree = parse(
            r#"
            {
              "name": "R",
              "target": "",
              "validation": "Q1",
              "left": { "name": "A", "target": null, "validation": "", "left": "", "right": null },
              "right": { "name": "B", "validation": "Q2" }
            }
            "#,
        )
        .expect("tree should build");

        let expected = ValidationNode::new("R")
            .with_validation("Q1")
            .with_left(ValidationNode::new("A"))
            .with_right(ValidationNode::new("B").with_validation("Q2"));
        assert_eq!(tree.root(), &expected);
        assert!(tree.root().left.as_deref().is_some_and(ValidationNode::is_leaf));
    }

    #[test]
    fn preorder_visits_left_subtree_before_right() {
        let tree = ValidationTree::new(
            ValidationNode::new("R")
                .with_left(ValidationNode::new("A").with_right(ValidationNode::new("A2")))
                .with_right(ValidationNode::new("B").with_left(ValidationNode::new("B1"))),
        )
        .expect("tree should build");

        assert_eq!(tree.node_names(), vec!["R", "A", "A2", "B", "B1"]);
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = parse(
            r#"{ "name": "R", "left": { "name": "X" }, "right": { "name": "X" } }"#,
        )
        .expect_err("duplicate names should be rejected");
        assert!(err.to_string().contains("duplicate node name 'X'"));
    }

    #[test]
    fn blank_names_and_bogus_children_are_rejected() {
        assert!(parse(r#"{ "name": "  " }"#).is_err());
        let err = parse(r#"{ "name": "R", "left": "A" }"#)
            .expect_err("non-empty placeholder should be rejected");
        assert!(matches!(err, PaladinError::Configuration(_)));
    }
}
