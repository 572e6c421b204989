//! Subcommands. Results go to stdout as JSON; logs go to stderr.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use engine::conf::AnalyzerConfig;
use engine::generate::{GenerateSummary, GeneratorOptions, LogGenerator};
use engine::parser::{SampleReport, VALIDATION_SAMPLE_SIZE};
use engine::pipeline::{detect_file_layout, validate_first_line, validate_format};
use engine::{LogLayout, ParseFailure, StatisticsSnapshot};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a log file and print totals and statistics
    Parse(ParseArgs),
    /// Check how well the head of a file fits a layout
    Validate(ValidateArgs),
    /// Guess the layout of a file from its first lines
    Detect(DetectArgs),
    /// Write a synthetic access log
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    path: PathBuf,
    /// extended (combined) or basic (common)
    #[arg(long)]
    layout: Option<LogLayout>,
    /// Worker threads; 0 = one per core
    #[arg(long)]
    workers: Option<usize>,
    /// Entries in each ranking
    #[arg(long)]
    top_n: Option<usize>,
    /// Skip statistics, print parse totals only
    #[arg(long)]
    no_stats: bool,
    /// Failure samples to print
    #[arg(long, default_value_t = 10)]
    samples: usize,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    path: PathBuf,
    #[arg(long)]
    layout: Option<LogLayout>,
    /// Lines to sample from the start of the file
    #[arg(long, default_value_t = VALIDATION_SAMPLE_SIZE)]
    sample: usize,
    /// Only check the first line
    #[arg(long)]
    first_line: bool,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    path: PathBuf,
    #[arg(long, default_value_t = VALIDATION_SAMPLE_SIZE)]
    sample: usize,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Output file
    #[arg(long, short)]
    output: PathBuf,
    #[arg(long, default_value_t = 10_000)]
    lines: u64,
    #[arg(long)]
    layout: Option<LogLayout>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Share of valid lines with a 4xx/5xx status (0.0-1.0)
    #[arg(long, default_value_t = 0.05)]
    error_rate: f64,
    /// Share of lines no layout accepts (0.0-1.0)
    #[arg(long, default_value_t = 0.01)]
    invalid_rate: f64,
}

/// Printed by `parse`.
#[derive(Debug, Serialize)]
struct ParseReport {
    file: PathBuf,
    layout: LogLayout,
    workers: usize,
    file_size: u64,
    total_lines: u64,
    parsed_lines: u64,
    error_lines: u64,
    error_rate: f64,
    elapsed_ms: u128,
    throughput_mb_s: f64,
    memory_delta_bytes: i64,
    read_warning: Option<String>,
    cancelled: bool,
    failure_samples: Vec<ParseFailure>,
    statistics: Option<StatisticsSnapshot>,
}

pub async fn run(command: Command, config: AnalyzerConfig) -> anyhow::Result<()> {
    match command {
        Command::Parse(args) => parse(args, config).await,
        Command::Validate(args) => validate(args, config).await,
        Command::Detect(args) => detect(args).await,
        Command::Generate(args) => generate(args, config).await,
    }
}

async fn parse(args: ParseArgs, mut config: AnalyzerConfig) -> anyhow::Result<()> {
    if let Some(layout) = args.layout {
        config.layout = layout;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    config.validate()?;

    let cancel = CancellationToken::new();
    let pipeline = config.pipeline().with_cancellation(cancel.clone());
    let engine = config.statistics_engine()?;

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current line");
            on_interrupt.cancel();
        }
    });

    let path = args.path.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.parse_path(&path))
        .await
        .context("parse task failed")?
        .with_context(|| format!("failed to parse {}", args.path.display()))?;

    if let Some(warning) = &outcome.read_warning {
        warn!(warning = %warning, "Results are partial");
    }

    let with_stats = !args.no_stats;
    let (outcome, statistics) = tokio::task::spawn_blocking(move || {
        let statistics = with_stats.then(|| engine.calculate(&outcome.records));
        (outcome, statistics)
    })
    .await
    .context("statistics task failed")?;

    let mut failure_samples = outcome.failure_samples.clone();
    failure_samples.truncate(args.samples);

    let report = ParseReport {
        file: args.path,
        layout: outcome.layout,
        workers: outcome.workers,
        file_size: outcome.file_size,
        total_lines: outcome.total_lines,
        parsed_lines: outcome.parsed_lines,
        error_lines: outcome.error_lines,
        error_rate: outcome.error_rate(),
        elapsed_ms: outcome.elapsed.as_millis(),
        throughput_mb_s: outcome.throughput_mb_s,
        memory_delta_bytes: outcome.memory_delta_bytes,
        read_warning: outcome.read_warning.clone(),
        cancelled: outcome.cancelled,
        failure_samples,
        statistics,
    };

    print_json(&report)
}

async fn validate(args: ValidateArgs, config: AnalyzerConfig) -> anyhow::Result<()> {
    let layout = args.layout.unwrap_or(config.layout);

    if args.first_line {
        let path = args.path.clone();
        tokio::task::spawn_blocking(move || validate_first_line(&path, layout))
            .await
            .context("validation task failed")??;
        info!(file = %args.path.display(), layout = %layout, "First line matches");
        return print_json(&serde_json::json!({ "layout": layout, "first_line_valid": true }));
    }

    let path = args.path.clone();
    let sample = args.sample;
    let report: SampleReport = tokio::task::spawn_blocking(move || validate_format(&path, layout, sample))
        .await
        .context("validation task failed")??;

    print_json(&report)?;
    if !report.valid {
        anyhow::bail!(
            "{} does not look like a {} access log ({} of {} sampled lines match)",
            args.path.display(),
            layout,
            report.matched,
            report.sampled
        );
    }
    Ok(())
}

async fn detect(args: DetectArgs) -> anyhow::Result<()> {
    let path = args.path.clone();
    let sample = args.sample;
    let report = tokio::task::spawn_blocking(move || detect_file_layout(&path, sample))
        .await
        .context("detection task failed")??;
    print_json(&report)
}

async fn generate(args: GenerateArgs, config: AnalyzerConfig) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&args.error_rate) || !(0.0..=1.0).contains(&args.invalid_rate) {
        anyhow::bail!("--error-rate and --invalid-rate must be between 0.0 and 1.0");
    }

    let options = GeneratorOptions {
        layout: args.layout.unwrap_or(config.layout),
        error_rate: args.error_rate,
        invalid_rate: args.invalid_rate,
        ..Default::default()
    };

    let output = args.output.clone();
    let lines = args.lines;
    let seed = args.seed;
    let summary: GenerateSummary = tokio::task::spawn_blocking(move || -> anyhow::Result<GenerateSummary> {
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let file = File::create(&output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        let mut generator = LogGenerator::with_options(seed, options);
        generator
            .write_to(BufWriter::new(file), lines)
            .with_context(|| format!("failed to write {}", output.display()))
    })
    .await
    .context("generate task failed")??;

    info!(
        file = %args.output.display(),
        lines = summary.lines,
        invalid = summary.invalid,
        size_mb = summary.bytes as f64 / (1024.0 * 1024.0),
        "Log generated"
    );
    print_json(&summary)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).context("failed to encode output")?;
    writeln!(out)?;
    Ok(())
}
