//! Report serialization.
//!
//! CSV is the primary format: header `URL,Status Code,Flaws`, one row per
//! target, CRLF line endings, quoting only where a field needs it. JSON
//! Lines carries the same three fields plus the raw error description.
//! Both writers flush after every row.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{FlawLabel, ProbeOutcome, ProbeStatus};

pub const HEADER: [&str; 3] = ["URL", "Status Code", "Flaws"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" | "jsonl" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize)]
struct JsonRow<'a> {
    url: &'a str,
    status: &'a ProbeStatus,
    flaws: &'a [FlawLabel],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

enum Output<W: Write> {
    Csv(csv::Writer<W>),
    Json(W),
}

/// Incremental report writer: header once, then rows in the order given.
pub struct ReportWriter<W: Write> {
    output: Output<W>,
    rows: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        let output = match format {
            ReportFormat::Csv => Output::Csv(
                csv::WriterBuilder::new()
                    .terminator(csv::Terminator::CRLF)
                    .from_writer(writer),
            ),
            ReportFormat::Json => Output::Json(writer),
        };
        Self { output, rows: 0 }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        match &mut self.output {
            Output::Csv(csv) => {
                csv.write_record(HEADER)?;
                csv.flush()
            }
            Output::Json(_) => Ok(()),
        }
    }

    pub fn write_row(&mut self, outcome: &ProbeOutcome) -> io::Result<()> {
        match &mut self.output {
            Output::Csv(csv) => {
                csv.write_record([
                    outcome.url.clone(),
                    outcome.status.label(),
                    outcome.flaws_field(),
                ])?;
                csv.flush()?;
            }
            Output::Json(out) => {
                let row = JsonRow {
                    url: &outcome.url,
                    status: &outcome.status,
                    flaws: &outcome.flaws,
                    error: match &outcome.status {
                        ProbeStatus::Error(description) => Some(description.as_str()),
                        ProbeStatus::Http(_) => None,
                    },
                };
                serde_json::to_writer(&mut *out, &row)?;
                out.write_all(b"\n")?;
                out.flush()?;
            }
        }
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        match self.output {
            Output::Csv(csv) => csv.into_inner().map_err(|e| e.into_error()),
            Output::Json(mut out) => {
                out.flush()?;
                Ok(out)
            }
        }
    }
}

/// Writes a complete report: header followed by one row per outcome.
pub fn write_report<W: Write>(
    outcomes: &[ProbeOutcome],
    writer: W,
    format: ReportFormat,
) -> io::Result<W> {
    let mut report = ReportWriter::new(writer, format);
    report.write_header()?;
    for outcome in outcomes {
        report.write_row(outcome)?;
    }
    report.finish()
}
