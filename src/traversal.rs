use clap::ValueEnum;
use tracing::{debug, info};

use crate::partition::{NodePartition, partition};
use crate::report::Report;
use crate::source::{DataSource, Population};
use crate::trace::ViolationObserver;
use crate::tree::{ValidationNode, ValidationTree};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Strategy {
    DepthFirstRecursive,
    DepthFirstIterative,
    BreadthFirstIterative,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Self::DepthFirstRecursive,
        Self::DepthFirstIterative,
        Self::BreadthFirstIterative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DepthFirstRecursive => "depth-first-recursive",
            Self::DepthFirstIterative => "depth-first-iterative",
            Self::BreadthFirstIterative => "breadth-first-iterative",
        }
    }
}

#[derive(Default)]
pub struct TraversalOptions<'a> {
    pub observer: Option<&'a mut dyn ViolationObserver>,
    pub verbose: bool,
}

type Pending<'t> = (&'t ValidationNode, Population);

pub fn traverse(
    strategy: Strategy,
    tree: &ValidationTree,
    population: Population,
    source: &mut dyn DataSource,
    options: &mut TraversalOptions<'_>,
) -> Report {
    info!(
        strategy = strategy.as_str(),
        nodes = tree.node_count(),
        population = population.len(),
        "starting traversal"
    );

    let report = match strategy {
        Strategy::DepthFirstRecursive => depth_first_recursive(tree, population, source, options),
        Strategy::DepthFirstIterative => depth_first_iterative(tree, population, source, options),
        Strategy::BreadthFirstIterative => {
            breadth_first_iterative(tree, population, source, options)
        }
    };

    info!(
        strategy = strategy.as_str(),
        visited = report.len(),
        "traversal finished"
    );
    report
}

pub fn depth_first_recursive(
    tree: &ValidationTree,
    population: Population,
    source: &mut dyn DataSource,
    options: &mut TraversalOptions<'_>,
) -> Report {
    fn visit(
        node: &ValidationNode,
        population: Population,
        source: &mut dyn DataSource,
        report: &mut Report,
        options: &mut TraversalOptions<'_>,
    ) {
        let split = process_node(node, population, source, report, options);
        let (left, right) = live_children(node, split);
        if let Some((child, population)) = left {
            visit(child, population, source, report, options);
        }
        if let Some((child, population)) = right {
            visit(child, population, source, report, options);
        }
    }

    let mut report = Report::new();
    visit(tree.root(), population, source, &mut report, options);
    report
}

pub fn depth_first_iterative(
    tree: &ValidationTree,
    population: Population,
    source: &mut dyn DataSource,
    options: &mut TraversalOptions<'_>,
) -> Report {
    let mut report = Report::new();
    let mut stack: Vec<Pending<'_>> = vec![(tree.root(), population)];

    while let Some((node, population)) = stack.pop() {
        let split = process_node(node, population, source, &mut report, options);
        let (left, right) = live_children(node, split);
        // Right goes in first so left pops first.
        stack.extend(right);
        stack.extend(left);
    }
    report
}

pub fn breadth_first_iterative(
    tree: &ValidationTree,
    population: Population,
    source: &mut dyn DataSource,
    options: &mut TraversalOptions<'_>,
) -> Report {
    let mut report = Report::new();
    let mut next_level: Vec<Pending<'_>> = vec![(tree.root(), population)];

    while !next_level.is_empty() {
        let level = std::mem::take(&mut next_level);
        for (node, population) in level {
            let split = process_node(node, population, source, &mut report, options);
            let (left, right) = live_children(node, split);
            next_level.extend(left);
            next_level.extend(right);
        }
    }
    report
}

fn process_node(
    node: &ValidationNode,
    population: Population,
    source: &mut dyn DataSource,
    report: &mut Report,
    options: &mut TraversalOptions<'_>,
) -> NodePartition {
    let incoming = population.len();
    let split = partition(node, population, source);

    if let Some(observer) = options.observer.as_deref_mut() {
        observer.observe_violations(&node.name, &split.violated);
    }

    if options.verbose {
        info!(
            node = %node.name,
            incoming,
            target_population = split.population_size(),
            validated = split.validated.len(),
            violated = split.violated.len(),
            "validated node"
        );
    } else {
        debug!(
            node = %node.name,
            incoming,
            validated = split.validated.len(),
            violated = split.violated.len(),
            "validated node"
        );
    }

    report.record(&node.name, split.clone());
    split
}

// Left gets the validated set, right the violated set; empty inputs are pruned.
fn live_children(
    node: &ValidationNode,
    split: NodePartition,
) -> (Option<Pending<'_>>, Option<Pending<'_>>) {
    let NodePartition {
        validated,
        violated,
    } = split;
    let left = node
        .left
        .as_deref()
        .filter(|_| !validated.is_empty())
        .map(|child| (child, validated));
    let right = node
        .right
        .as_deref()
        .filter(|_| !violated.is_empty())
        .map(|child| (child, violated));
    (left, right)
}
