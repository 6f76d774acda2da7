//! Command-line interface for the image similarity engine.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::acquire::ImageSource;
use crate::batch::{BatchComparator, BatchReport, ImageDiscovery};
use crate::config::{EngineConfig, PASS_THRESHOLD};
use crate::pipeline::SimilarityEngine;
use crate::scoring::ComparisonResult;

/// Exit code for a comparison that scored below the threshold.
const EXIT_BELOW_THRESHOLD: u8 = 2;

/// Perceptual image similarity tool
///
/// Scores how closely generated pictures reproduce a target picture using
/// multi-scale structural similarity, color histograms and edge agreement.
#[derive(Parser, Debug)]
#[command(name = "promptmatch")]
#[command(author = "Prompt Match Team")]
#[command(version)]
#[command(about = "Score generated images against a target picture")]
#[command(long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare one generated image against a target
    Compare {
        /// Target image (file path or http(s) URL)
        target: String,

        /// Generated image (file path or http(s) URL)
        generated: String,

        /// Number of pyramid levels (1-5)
        #[arg(short, long)]
        scales: Option<usize>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pass threshold in percent
        #[arg(short, long, default_value_t = PASS_THRESHOLD)]
        threshold: f64,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank several generated images against a target
    Rank {
        /// Target image (file path or http(s) URL)
        target: String,

        /// Candidate images, URLs or directories of images
        #[arg(required = true)]
        candidates: Vec<String>,

        /// Scan candidate directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Maximum parallel comparisons (default: one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pass threshold in percent
        #[arg(short, long, default_value_t = PASS_THRESHOLD)]
        threshold: f64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// TOML configuration file to merge over the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Run the CLI application.
pub fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .init();
    } else if !cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .init();
    }

    match cli.command {
        Commands::Compare {
            target,
            generated,
            scales,
            config,
            threshold,
            json,
        } => run_compare(&target, &generated, scales, config, threshold, json, cli.quiet),
        Commands::Rank {
            target,
            candidates,
            recursive,
            jobs,
            config,
            threshold,
            json,
        } => run_rank(
            &target,
            &candidates,
            recursive,
            jobs,
            config,
            threshold,
            json,
            cli.quiet,
        ),
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load the configuration file, or the defaults when none is given.
fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Run compare command.
fn run_compare(
    target: &str,
    generated: &str,
    scales: Option<usize>,
    config: Option<PathBuf>,
    threshold: f64,
    json: bool,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let mut config = load_config(config.as_deref())?;
    if let Some(scales) = scales {
        config.scales = scales;
    }

    let engine = SimilarityEngine::try_new(config)?;
    let result = engine.compare(&ImageSource::parse(target), &ImageSource::parse(generated));

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !quiet {
        print!("{}", result);
        print_verdict(&result, threshold);
    }

    Ok(exit_code(&result, threshold))
}

/// Run rank command.
#[allow(clippy::too_many_arguments)]
fn run_rank(
    target: &str,
    candidates: &[String],
    recursive: bool,
    jobs: Option<usize>,
    config: Option<PathBuf>,
    threshold: f64,
    json: bool,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let config = load_config(config.as_deref())?;
    let sources = expand_candidates(candidates, recursive)?;
    anyhow::ensure!(!sources.is_empty(), "No candidate images found");

    let mut comparator = BatchComparator::new(SimilarityEngine::try_new(config)?);
    if let Some(jobs) = jobs {
        comparator = comparator.max_parallel(jobs);
    }

    let bar = if quiet || json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(sources.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} ({elapsed})")?
                .progress_chars("=> "),
        );
        bar
    };

    let report = comparator.rank_with_progress(
        &ImageSource::parse(target),
        &sources,
        |done, _total| bar.set_position(done as u64),
    )?;
    bar.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_ranking(&report, threshold);
    }

    Ok(if report.passed(threshold) > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_BELOW_THRESHOLD)
    })
}

/// Turn candidate arguments into sources, expanding directories.
fn expand_candidates(candidates: &[String], recursive: bool) -> anyhow::Result<Vec<ImageSource>> {
    let discovery = ImageDiscovery::new().recursive(recursive);
    let mut sources = Vec::new();

    for candidate in candidates {
        let path = Path::new(candidate);
        if path.is_dir() {
            let files = discovery
                .discover(path)
                .with_context(|| format!("Failed to scan {}", path.display()))?;
            sources.extend(files.into_iter().map(ImageSource::Path));
        } else {
            sources.push(ImageSource::parse(candidate));
        }
    }

    Ok(sources)
}

fn exit_code(result: &ComparisonResult, threshold: f64) -> ExitCode {
    if result.is_error() {
        ExitCode::FAILURE
    } else if result.passes(threshold) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_BELOW_THRESHOLD)
    }
}

fn print_verdict(result: &ComparisonResult, threshold: f64) {
    if result.is_error() {
        return;
    }
    println!();
    if result.passes(threshold) {
        println!("PASS (threshold {:.0}%)", threshold);
    } else {
        println!("FAIL (threshold {:.0}%)", threshold);
    }
}

/// Print ranking table.
fn print_ranking(report: &BatchReport, threshold: f64) {
    println!("Ranking against {}", report.target);
    println!("========================================");
    for (rank, entry) in report.ranked().iter().enumerate() {
        match entry.result.error {
            Some(ref error) => println!("  -. {}  error: {}", entry.source, error),
            None => println!(
                "  {}. {}  {:.2}%{}  ({} ms)",
                rank + 1,
                entry.source,
                entry.result.percentage,
                if entry.result.passes(threshold) { "  PASS" } else { "" },
                entry.duration_ms
            ),
        }
    }
    println!();
    println!(
        "{} of {} passed, {} failed, {} ms total",
        report.passed(threshold),
        report.entries.len(),
        report.failed(),
        report.total_time_ms
    );
}
