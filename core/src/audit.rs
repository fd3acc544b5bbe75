use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::Context;
use log::info;

use crate::core::engine::ScanEngine;
use crate::core::prober::UrlProber;
use crate::core::{ProbeOutcome, ProbeStatus};
use crate::http::{HttpClient, Transport};
use crate::report::ReportWriter;
use crate::utils::read_targets;
use crate::{ScanConfig, SinkRef};

/// Per-run tallies. Per-URL failures land here, never in the error path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub total: usize,
    pub scanned: usize,
    pub flagged: usize,
    pub non_success: usize,
    pub errors: usize,
}

impl AuditSummary {
    pub fn from_outcomes(outcomes: &[ProbeOutcome]) -> Self {
        let mut summary = Self { total: outcomes.len(), ..Self::default() };
        for outcome in outcomes {
            match outcome.status {
                ProbeStatus::Http(200) => {
                    summary.scanned += 1;
                    if !outcome.flaws.is_empty() {
                        summary.flagged += 1;
                    }
                }
                ProbeStatus::Http(_) => summary.non_success += 1,
                ProbeStatus::Error(_) => summary.errors += 1,
            }
        }
        summary
    }

    pub fn report(&self, sink: &SinkRef) {
        sink.on_log("phase", "SCAN SUMMARY:");
        sink.on_log("info", &format!("  Targets:        {}", self.total));
        sink.on_log("info", &format!("  Scanned (200):  {}", self.scanned));
        sink.on_log("info", &format!("  Other status:   {}", self.non_success));
        sink.on_log("info", &format!("  Unreachable:    {}", self.errors));
        if self.flagged == 0 {
            sink.on_log("success", "[+] No risky patterns found.");
        } else {
            sink.on_log("warn", &format!("[+] {} script(s) with risky patterns.", self.flagged));
        }
    }
}

/// Runs a full audit with the reqwest transport built from `config`.
pub async fn run_audit(config: &ScanConfig, sink: SinkRef) -> anyhow::Result<AuditSummary> {
    config.validate()?;
    let client = HttpClient::new(config.timeout_duration(), config.proxy_ref())?;
    run_audit_with(config, Arc::new(client), sink).await
}

/// Reads targets, probes them through `transport`, and writes the report
/// row by row in input order. Only input/output failures are errors.
pub async fn run_audit_with(
    config: &ScanConfig,
    transport: Arc<dyn Transport>,
    sink: SinkRef,
) -> anyhow::Result<AuditSummary> {
    config.validate()?;

    let targets = read_targets(&config.input)
        .with_context(|| format!("failed to read input file '{}'", config.input))?;
    sink.on_log("success", &format!("[+] Loaded {} target(s) from {}", targets.len(), config.input));

    if config.dry_run {
        for target in &targets {
            sink.on_log("info", &format!("[DRY RUN] Would probe target: {}", target.as_str()));
        }
        return Ok(AuditSummary { total: targets.len(), ..AuditSummary::default() });
    }

    let file = File::create(&config.output)
        .with_context(|| format!("failed to create output file '{}'", config.output))?;
    let mut writer = ReportWriter::new(BufWriter::new(file), config.format);
    writer
        .write_header()
        .with_context(|| format!("failed to write report header to '{}'", config.output))?;

    let engine = ScanEngine::new(Arc::new(UrlProber::new(transport)), config.workers, Arc::clone(&sink));
    sink.on_log("phase", &format!("[*] Probing with {} worker(s)...", engine.concurrency_limit()));

    let outcomes = engine
        .run_streaming(targets, |outcome| writer.write_row(outcome))
        .await
        .with_context(|| format!("failed to write report to '{}'", config.output))?;

    let rows = writer.rows_written();
    writer
        .finish()
        .with_context(|| format!("failed to flush report to '{}'", config.output))?;

    info!("Wrote {} row(s) to {}", rows, config.output);
    Ok(AuditSummary::from_outcomes(&outcomes))
}
