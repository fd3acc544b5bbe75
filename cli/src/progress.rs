use std::sync::{Arc, OnceLock};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use jsflaw_core::{describe_outcome, ProbeOutcome, ScanEventSink, SinkRef};

const TEMPLATE: &str = "{spinner:.cyan} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Console sink that keeps a progress bar at the bottom of the terminal.
/// The bar is created on the first progress event, so runs without any
/// targets never draw one.
pub struct ProgressSink {
    bar: OnceLock<ProgressBar>,
}

impl ProgressSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self { bar: OnceLock::new() })
    }

    fn print(&self, line: &str, to_stderr: bool) {
        let emit = || {
            if to_stderr {
                eprintln!("{}", line);
            } else {
                println!("{}", line);
            }
        };
        match self.bar.get() {
            Some(bar) if !bar.is_finished() => bar.suspend(emit),
            _ => emit(),
        }
    }
}

impl ScanEventSink for ProgressSink {
    fn on_log(&self, level: &str, message: &str) {
        let line = match level {
            "success" => message.green().to_string(),
            "error"   => message.red().to_string(),
            "warn"    => message.yellow().to_string(),
            "phase"   => message.bright_cyan().bold().to_string(),
            _         => message.to_string(),
        };
        self.print(&line, level == "error");
    }

    fn on_outcome(&self, outcome: &ProbeOutcome) {
        if let Some(line) = describe_outcome(outcome) {
            self.print(&line, false);
        }
    }

    fn on_progress(&self, phase: &str, current: usize, total: usize) {
        if total == 0 {
            return;
        }
        let bar = self.bar.get_or_init(|| {
            let style = ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            let bar = ProgressBar::new(total as u64).with_style(style);
            bar.set_message(phase.to_string());
            bar
        });
        bar.set_position(current as u64);
        if current >= total {
            bar.finish_and_clear();
        }
    }
}
