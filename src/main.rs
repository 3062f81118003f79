use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use paladin::cli::Cli;
use paladin::commands;
use paladin::error::PaladinError;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(
            stage = failure_stage(&err),
            error = %err,
            "validation run failed"
        );
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    commands::validate::run(cli)
}

fn failure_stage(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<PaladinError>() {
        Some(PaladinError::Configuration(_)) => "configuration",
        Some(PaladinError::Connection { .. }) => "connection",
        None => "io",
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
