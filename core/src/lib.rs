pub mod audit;
pub mod core;
pub mod http;
pub mod report;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use crate::audit::{run_audit, run_audit_with, AuditSummary};
pub use crate::core::engine::ScanEngine;
pub use crate::core::prober::UrlProber;
pub use crate::core::result_aggregator::ResultAggregator;
pub use crate::core::target_manager::TargetManager;
pub use crate::core::{FlawLabel, ProbeOutcome, ProbeStatus, Target};
pub use crate::http::{FetchedResponse, HttpClient, Transport, TransportError};
pub use crate::report::{write_report, ReportFormat, ReportWriter};
pub use crate::utils::detector::FlawDetector;
pub use crate::utils::read_targets;

/// Scan configuration shared by the CLI and library callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub input: String,
    pub output: String,
    pub workers: usize,
    /// Per-request timeout in seconds; 0 keeps the client default.
    pub timeout: u64,
    pub proxy: String,
    pub format: ReportFormat,
    pub dry_run: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            workers: default_workers(),
            timeout: 0,
            proxy: String::new(),
            format: ReportFormat::Csv,
            dry_run: false,
        }
    }
}

impl ScanConfig {
    pub fn proxy_ref(&self) -> Option<&str> {
        if self.proxy.is_empty() { None } else { Some(&self.proxy) }
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        if self.timeout == 0 { None } else { Some(Duration::from_secs(self.timeout)) }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input.trim().is_empty() {
            anyhow::bail!("no input file given");
        }
        if self.output.trim().is_empty() && !self.dry_run {
            anyhow::bail!("no output file given");
        }
        if self.workers == 0 {
            anyhow::bail!("worker count must be at least 1");
        }
        Ok(())
    }
}

/// Number of processing units on the host, or 1 if it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Output abstraction for the scan pipeline.
/// Core code reports through this; the CLI decides how it looks.
pub trait ScanEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_outcome(&self, outcome: &ProbeOutcome);
    fn on_progress(&self, phase: &str, current: usize, total: usize);
}

pub type SinkRef = Arc<dyn ScanEventSink>;

/// Colored one-line summary of an outcome worth showing, `None` for
/// clean or non-200 results.
pub fn describe_outcome(outcome: &ProbeOutcome) -> Option<String> {
    use colored::*;
    match &outcome.status {
        ProbeStatus::Error(description) => Some(format!(
            "{} {} {}",
            "[!]".yellow().bold(),
            outcome.url.white(),
            format!("Error: {}", description).dimmed()
        )),
        ProbeStatus::Http(_) if !outcome.flaws.is_empty() => Some(format!(
            "{} {} {}",
            "[+]".green().bold(),
            outcome.url.white(),
            outcome.flaws_field().red()
        )),
        ProbeStatus::Http(_) => None,
    }
}

/// Terminal output sink without progress display.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl ScanEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        let colored = match level {
            "success" => message.green().to_string(),
            "error"   => message.red().to_string(),
            "warn"    => message.yellow().to_string(),
            "phase"   => message.bright_cyan().bold().to_string(),
            _         => message.to_string(),
        };
        if level == "error" {
            eprintln!("{}", colored);
        } else {
            println!("{}", colored);
        }
    }

    fn on_outcome(&self, outcome: &ProbeOutcome) {
        if let Some(line) = describe_outcome(outcome) {
            println!("{}", line);
        }
    }

    fn on_progress(&self, _phase: &str, _current: usize, _total: usize) {}
}

/// Discards every event.
pub struct SilentSink;

impl SilentSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl ScanEventSink for SilentSink {
    fn on_log(&self, _level: &str, _message: &str) {}
    fn on_outcome(&self, _outcome: &ProbeOutcome) {}
    fn on_progress(&self, _phase: &str, _current: usize, _total: usize) {}
}
