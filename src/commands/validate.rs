use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::PaladinError;
use crate::model::{RunSummary, TreeDescription};
use crate::report::Report;
use crate::source::{self, DataSource};
use crate::trace::{TRACE_HEADER, TraceRecorder, append_summary, open_log};
use crate::traversal::{TraversalOptions, traverse};
use crate::tree::ValidationTree;
use crate::util::{default_run_id, ensure_directory, rfc3339_utc, write_json_pretty};

const SUMMARY_VERSION: u32 = 1;

struct RunOutcome {
    report: Report,
    population_size: usize,
}

pub fn run(args: Cli) -> Result<()> {
    let started = Instant::now();
    let started_ts = Utc::now();
    let run_id = args
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(started_ts));

    info!(
        tree = %args.tree_path.display(),
        strategy = args.strategy.as_str(),
        run_id = %run_id,
        "starting validation run"
    );

    let description = load_description(&args.tree_path)?;
    let tree = ValidationTree::from_spec(&description.tree)?;
    let source_config = description.source_config(args.query_timeout_ms)?;
    let mut source = source::connect(&source_config)?;

    let outcome = validate_population(
        &args,
        &run_id,
        started,
        &description,
        &tree,
        source.as_mut(),
    );
    source.close();
    let outcome = outcome?;

    let column_order = tree.node_names();
    outcome
        .report
        .write_csv_file(&args.output, &column_order)?;

    info!(
        path = %args.output.display(),
        visited = outcome.report.len(),
        nodes = tree.node_count(),
        "wrote validation report"
    );

    if let Some(summary_path) = args.summary_path.as_deref() {
        let summary = RunSummary {
            summary_version: SUMMARY_VERSION,
            run_id,
            strategy: args.strategy.as_str().to_string(),
            started_at: rfc3339_utc(started_ts),
            finished_at: rfc3339_utc(Utc::now()),
            tree_path: args.tree_path.display().to_string(),
            data_source: source_config.kind.as_str().to_string(),
            population_size: outcome.population_size,
            node_count: tree.node_count(),
            visited_node_count: outcome.report.len(),
            report_path: args.output.display().to_string(),
            nodes: outcome.report.node_counts(),
        };
        write_json_pretty(summary_path, &summary)?;
        info!(path = %summary_path.display(), "wrote run summary");
    }

    Ok(())
}

fn load_description(path: &Path) -> Result<TreeDescription> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let description = serde_json::from_slice(&raw).map_err(|err| {
        PaladinError::configuration(format!("failed to parse {}: {err}", path.display()))
    })?;
    Ok(description)
}

fn validate_population(
    args: &Cli,
    run_id: &str,
    started: Instant,
    description: &TreeDescription,
    tree: &ValidationTree,
    source: &mut dyn DataSource,
) -> Result<RunOutcome> {
    let population = source.query(&description.population);
    if population.is_empty() {
        warn!("population query returned no identifiers");
    }
    let population_size = population.len();
    info!(population = population_size, "loaded initial population");

    if !args.trace {
        let report = traverse(
            args.strategy,
            tree,
            population,
            source,
            &mut TraversalOptions {
                observer: None,
                verbose: args.verbose,
            },
        );
        return Ok(RunOutcome {
            report,
            population_size,
        });
    }

    ensure_directory(&args.trace_dir)?;
    let trace_path = args.trace_dir.join("trace.csv");
    let metrics_path = args.trace_dir.join("metrics.csv");
    let trace_log = BufWriter::new(open_log(&trace_path, TRACE_HEADER)?);
    let mut recorder = TraceRecorder::new(run_id, args.strategy.as_str(), started, trace_log);

    let report = traverse(
        args.strategy,
        tree,
        population,
        source,
        &mut TraversalOptions {
            observer: Some(&mut recorder),
            verbose: args.verbose,
        },
    );

    let (summary, _) = recorder.finish();
    append_summary(&metrics_path, &summary)?;
    info!(
        trace = %trace_path.display(),
        metrics = %metrics_path.display(),
        registrations = summary.total,
        "wrote diefficiency trace"
    );

    Ok(RunOutcome {
        report,
        population_size,
    })
}
