use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::NodeCounts;
use crate::partition::NodePartition;
use crate::source::Identifier;
use crate::util::ensure_parent_directory;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    entries: BTreeMap<String, NodePartition>,
    visit_order: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, partition: NodePartition) {
        if self.entries.insert(name.to_string(), partition).is_none() {
            self.visit_order.push(name.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&NodePartition> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodePartition)> {
        self.entries
            .iter()
            .map(|(name, partition)| (name.as_str(), partition))
    }

    pub fn visit_order(&self) -> &[String] {
        &self.visit_order
    }

    pub fn same_partitions(&self, other: &Report) -> bool {
        self.entries == other.entries
    }

    pub fn node_counts(&self) -> BTreeMap<String, NodeCounts> {
        self.iter()
            .map(|(name, partition)| {
                (
                    name.to_string(),
                    NodeCounts {
                        validated: partition.validated.len(),
                        violated: partition.violated.len(),
                    },
                )
            })
            .collect()
    }

    // Unvisited names in column_order are skipped; short columns pad with empty cells.
    pub fn write_csv<W: Write>(&self, writer: &mut W, column_order: &[&str]) -> Result<()> {
        let columns: Vec<(String, Vec<&Identifier>)> = column_order
            .iter()
            .filter_map(|name| self.entries.get(*name).map(|partition| (*name, partition)))
            .flat_map(|(name, partition)| {
                [
                    (
                        format!("{name}_validated"),
                        partition.validated.iter().collect(),
                    ),
                    (
                        format!("{name}_violated"),
                        partition.violated.iter().collect(),
                    ),
                ]
            })
            .collect();

        let header: Vec<String> = columns.iter().map(|(name, _)| csv_field(name)).collect();
        writeln!(writer, "{}", header.join(",")).context("failed to write csv header")?;

        let row_count = columns.iter().map(|(_, values)| values.len()).max().unwrap_or(0);
        for row in 0..row_count {
            let cells: Vec<String> = columns
                .iter()
                .map(|(_, values)| {
                    values
                        .get(row)
                        .map(|identifier| csv_field(&identifier.to_string()))
                        .unwrap_or_default()
                })
                .collect();
            writeln!(writer, "{}", cells.join(",")).context("failed to write csv row")?;
        }
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path, column_order: &[&str]) -> Result<()> {
        ensure_parent_directory(path)?;
        let file = File::create(path)
            .with_context(|| format!("failed to create report file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer, column_order)?;
        writer
            .flush()
            .with_context(|| format!("failed to flush report file: {}", path.display()))
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
