use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::warn;

use crate::source::Population;

pub const TRACE_HEADER: &str = "test,approach,answer,time";
pub const METRICS_HEADER: &str = "test,approach,tfft,totaltime,comp";

// Called once per node, right after its violated set is computed.
pub trait ViolationObserver {
    fn observe_violations(&mut self, node: &str, violated: &Population);
}

pub struct TraceRecorder<W: Write> {
    run_id: String,
    approach: String,
    started: Instant,
    registered: u64,
    first: Option<Duration>,
    last: Option<Duration>,
    sink: W,
    write_failed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    pub run_id: String,
    pub approach: String,
    pub time_to_first: Duration,
    pub time_to_last: Duration,
    pub total: u64,
}

impl TraceSummary {
    pub fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{},{},{:.6},{:.6},{}",
            self.run_id,
            self.approach,
            self.time_to_first.as_secs_f64(),
            self.time_to_last.as_secs_f64(),
            self.total
        )
    }
}

impl<W: Write> TraceRecorder<W> {
    // Elapsed times are measured from `started`, the beginning of the run.
    pub fn new(
        run_id: impl Into<String>,
        approach: impl Into<String>,
        started: Instant,
        sink: W,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            approach: approach.into(),
            started,
            registered: 0,
            first: None,
            last: None,
            sink,
            write_failed: false,
        }
    }

    pub fn registered(&self) -> u64 {
        self.registered
    }

    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            run_id: self.run_id.clone(),
            approach: self.approach.clone(),
            time_to_first: self.first.unwrap_or_default(),
            time_to_last: self.last.unwrap_or_default(),
            total: self.registered,
        }
    }

    pub fn finish(mut self) -> (TraceSummary, W) {
        if let Err(err) = self.sink.flush() {
            warn!(error = %err, "failed to flush trace log");
        }
        (self.summary(), self.sink)
    }

    fn register(&mut self) {
        let elapsed = self.started.elapsed();
        self.registered += 1;
        self.first.get_or_insert(elapsed);
        self.last = Some(elapsed);

        if self.write_failed {
            return;
        }
        let written = writeln!(
            self.sink,
            "{},{},{},{:.6}",
            self.run_id,
            self.approach,
            self.registered,
            elapsed.as_secs_f64()
        );
        if let Err(err) = written {
            warn!(error = %err, "failed to write trace row, further rows are dropped");
            self.write_failed = true;
        }
    }
}

impl<W: Write> ViolationObserver for TraceRecorder<W> {
    fn observe_violations(&mut self, _node: &str, violated: &Population) {
        for _ in violated {
            self.register();
        }
    }
}

pub fn open_log(path: &Path, header: &str) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log: {}", path.display()))?;
    let length = file
        .metadata()
        .with_context(|| format!("failed to stat log: {}", path.display()))?
        .len();
    if length == 0 {
        writeln!(file, "{header}")
            .with_context(|| format!("failed to write log header: {}", path.display()))?;
    }
    Ok(file)
}

pub fn append_summary(path: &Path, summary: &TraceSummary) -> Result<()> {
    let mut file = open_log(path, METRICS_HEADER)?;
    summary
        .write_row(&mut file)
        .with_context(|| format!("failed to append metrics row: {}", path.display()))
}
