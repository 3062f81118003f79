use std::path::PathBuf;

use clap::Parser;

use crate::traversal::Strategy;

#[derive(Parser, Debug)]
#[command(
    name = "paladin",
    version,
    about = "Validate an entity population against a tree of data-quality rules"
)]
pub struct Cli {
    /// JSON tree description (data source, population query, rule tree).
    pub tree_path: PathBuf,

    #[arg(value_enum)]
    pub strategy: Strategy,

    #[arg(long, default_value = "result.csv")]
    pub output: PathBuf,

    #[arg(long)]
    pub summary_path: Option<PathBuf>,

    /// Record diefficiency trace and metrics logs.
    #[arg(long, default_value_t = false)]
    pub trace: bool,

    #[arg(long, default_value = ".")]
    pub trace_dir: PathBuf,

    #[arg(long)]
    pub run_id: Option<String>,

    #[arg(long)]
    pub query_timeout_ms: Option<u64>,

    /// Log every processed node.
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}
