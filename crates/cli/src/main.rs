//! Cache hierarchy simulator CLI.
//!
//! This binary replays a memory trace through the caches of one core. It performs:
//! 1. **Configuration:** Builds the I$, D$ and L2$ from `sets:ways:linesize[:policy]`
//!    strings, a JSON layout file, or both (the strings override the file).
//! 2. **Replay:** Feeds every trace record to the hierarchy: fetches to the I$,
//!    loads and stores to the D$, cleans and invalidates to both.
//! 3. **Reporting:** Prints every cache's counters as text or JSON.

mod trace;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::filter::{FilterExt, LevelFilter, Targets, filter_fn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use cachesim_core::CacheHierarchy;
use cachesim_core::cache::MISS_LOG_TARGET;
use cachesim_core::common::ConfigError;
use cachesim_core::config::{CONFIG_USAGE, HierarchyConfig};

use crate::trace::TraceError;

#[derive(Parser, Debug)]
#[command(
    name = "cachesim",
    author,
    version,
    about = "Functional set-associative cache hierarchy simulator",
    long_about = "Replay a memory trace through an I$, D$ and shared L2$ and report hits, misses and write-backs.\n\nEach cache is given as sets:ways:linesize[:policy], with policy one of lfsr, lru, fifo, lip or bip.\n\nTrace records are '<op> <addr> [size]', one per line: op is I (fetch), R (read), W (write), C (clean), V (invalidate) or F (clean and invalidate); addr is hex; size is decimal and defaults to 8.\n\nExamples:\n  cachesim --ic 64:8:64:lru --dc 64:8:64:lru --l2 512:16:64 trace.txt\n  cachesim --config core.json --log trace.txt\n  cachesim --dc 256:4:32:bip --json - < trace.txt"
)]
struct Cli {
    /// Instruction cache, as sets:ways:linesize[:policy].
    #[arg(long = "ic", value_name = "CFG")]
    icache: Option<String>,

    /// Data cache, as sets:ways:linesize[:policy].
    #[arg(long = "dc", value_name = "CFG")]
    dcache: Option<String>,

    /// Unified L2 cache shared by the I$ and D$, as sets:ways:linesize[:policy].
    #[arg(long, value_name = "CFG")]
    l2: Option<String>,

    /// JSON hierarchy layout with optional "l1_i", "l1_d" and "l2" levels.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print every miss on stderr as "<cache> <read|write> miss 0x<addr>".
    #[arg(long)]
    log: bool,

    /// Print statistics as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Trace file, or "-" for standard input.
    trace: PathBuf,
}

/// Failures of a simulation run.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid hierarchy file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("cannot serialize statistics: {0}")]
    Json(#[source] serde_json::Error),
}

impl CliError {
    /// Returns `true` for errors in the cache configuration.
    const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ConfigFile { .. })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log);

    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_config() {
                eprintln!();
                eprintln!("{CONFIG_USAGE}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Installs the stderr subscribers.
///
/// Diagnostics follow `RUST_LOG`, defaulting to `warn`. Verbose miss lines are
/// printed bare, with no level or target prefix, and only when requested.
fn init_tracing(verbose: bool) {
    let env = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let diagnostics = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(filter_fn(|meta| meta.target() != MISS_LOG_TARGET).and(env));

    let miss_level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::OFF
    };
    let misses = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_level(false)
        .with_target(false)
        .without_time()
        .with_filter(Targets::new().with_target(MISS_LOG_TARGET, miss_level));

    tracing_subscriber::registry()
        .with(diagnostics)
        .with(misses)
        .init();
}

fn read_file(path: &Path) -> Result<String, CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    if path == Path::new("-") {
        let mut input = String::new();
        let _ = io::stdin().read_to_string(&mut input).map_err(io_error)?;
        Ok(input)
    } else {
        fs::read_to_string(path).map_err(io_error)
    }
}

/// Merges the JSON layout (if any) with the per-level overrides.
fn hierarchy_config(cli: &Cli) -> Result<HierarchyConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            serde_json::from_str(&read_file(path)?).map_err(|source| CliError::ConfigFile {
                path: path.clone(),
                source,
            })?
        }
        None => HierarchyConfig::default(),
    };

    if let Some(ic) = &cli.icache {
        config.l1_i = Some(ic.parse()?);
    }
    if let Some(dc) = &cli.dcache {
        config.l1_d = Some(dc.parse()?);
    }
    if let Some(l2) = &cli.l2 {
        config.l2 = Some(l2.parse()?);
    }
    Ok(config)
}

/// Builds the hierarchy, replays the trace and renders the report.
///
/// # Returns
///
/// The text (or JSON) to print on success.
fn run(cli: &Cli) -> Result<String, CliError> {
    let config = hierarchy_config(cli)?;
    let mut hierarchy = CacheHierarchy::from_config(&config)?;
    hierarchy.set_log(cli.log);
    if hierarchy.is_empty() {
        warn!("no caches configured; the trace is only checked");
    }

    let records = trace::parse(&read_file(&cli.trace)?)?;
    for record in &records {
        record.apply(&mut hierarchy);
    }
    info!(records = records.len(), levels = hierarchy.len(), "trace replayed");

    if cli.json {
        let stats = hierarchy.stats_json().map_err(CliError::Json)?;
        let mut text = serde_json::to_string_pretty(&stats).map_err(CliError::Json)?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(hierarchy.report())
    }
}
