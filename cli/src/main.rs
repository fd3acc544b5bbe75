mod progress;

use clap::Parser;
use colored::*;
use log::LevelFilter;
use std::num::NonZeroUsize;
use std::process;

use jsflaw_core::{default_workers, run_audit, ConsoleSink, ReportFormat, ScanConfig, SinkRef};

use crate::progress::ProgressSink;

#[derive(Parser, Debug)]
#[command(
    name = "jsflaw",
    version,
    about = "Scan JavaScript URLs for risky coding patterns",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Basic scan:                     jsflaw urls.txt report.csv
  Ten workers:                    jsflaw urls.txt report.csv -w 10
  Through a proxy (Burp):         jsflaw urls.txt report.csv --proxy http://127.0.0.1:8080
  With a request timeout:         jsflaw urls.txt report.csv --timeout 15
  JSON Lines output:              jsflaw urls.txt report.jsonl -f json
  Dry-run test:                   jsflaw urls.txt report.csv --dry-run"
)]
pub struct Args {
    #[arg(help = "File containing JavaScript URLs (one per line)")]
    pub input: String,

    #[arg(help = "Output report path")]
    pub output: String,

    #[arg(short = 'w', long, help = "Number of concurrent workers [default: number of CPUs]")]
    pub workers: Option<NonZeroUsize>,

    #[arg(long, help = "Per-request timeout in seconds (default: none)")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Proxy URL (e.g. http://127.0.0.1:8080)")]
    pub proxy: Option<String>,

    #[arg(short = 'f', long, default_value = "csv",
        value_parser = clap::builder::PossibleValuesParser::new(["csv", "json"]),
        help = "Report format")]
    pub format: String,

    #[arg(short = 'v', long, default_value_t = false, help = "Debug logging")]
    pub verbose: bool,

    #[arg(long, default_value_t = false, help = "Print findings as lines instead of a progress bar")]
    pub no_progress: bool,

    #[arg(long, help = "Load the input and list targets without sending requests")]
    pub dry_run: bool,
}

impl Args {
    fn to_config(&self) -> Result<ScanConfig, String> {
        Ok(ScanConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            workers: self.workers.map_or_else(default_workers, NonZeroUsize::get),
            timeout: self.timeout.unwrap_or(0),
            proxy: self.proxy.clone().unwrap_or_default(),
            format: self.format.parse::<ReportFormat>()?,
            dry_run: self.dry_run,
        })
    }
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();
    init_logger(args.verbose);

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("[!] {}", e).red());
            process::exit(1);
        }
    };

    print_scan_config(&config);

    let sink: SinkRef = if args.no_progress || config.dry_run {
        ConsoleSink::new_ref()
    } else {
        ProgressSink::new_ref()
    };

    match run_audit(&config, sink.clone()).await {
        Ok(summary) => {
            if config.dry_run {
                println!("[DRY RUN] {} target(s), no requests sent", summary.total);
            } else {
                summary.report(&sink);
                println!("{}", format!("[+] Report written to {}", config.output).green().bold());
            }
        }
        Err(e) => {
            eprintln!("{}", format!("[!] {:#}", e).red());
            process::exit(1);
        }
    }
}

/// `RUST_LOG` is honored; `--verbose` forces debug output for this tool.
fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_module("jsflaw_core", LevelFilter::Debug);
        builder.filter_module("jsflaw", LevelFilter::Debug);
    }
    builder.format_timestamp(None);
    let _ = builder.try_init();
}

fn print_scan_config(config: &ScanConfig) {
    println!("{}", format!("[+] Input:    {}", config.input).green().bold());
    println!("{}", format!("[+] Workers:  {}", config.workers).blue());
    match config.timeout_duration() {
        Some(timeout) => println!("{}", format!("[+] Timeout:  {}s", timeout.as_secs()).blue()),
        None => println!("{}", "[+] Timeout:  client default".blue()),
    }
    println!("{}", format!("[+] Output:   {} ({})", config.output, config.format).blue());
    if let Some(proxy) = config.proxy_ref() {
        println!("{}", format!("[+] Proxy:    {}", proxy).yellow());
    }
    println!("{}", "──────────────────────────────────────────────────".dimmed());
}
