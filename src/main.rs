use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use blockstat::analysis::{self, pipeline::comparison_input};
use blockstat::config_loader::{resolve_config, CliOverrides};

/// Compare throughput, goodput and block completion times across client logs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Client log files, one comparison column each
    logs: Vec<PathBuf>,

    /// Label for the next unlabeled run (repeatable, in run order)
    #[arg(short, long = "label")]
    labels: Vec<String>,

    /// YAML run list; its runs come before the positional logs
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Suffix appended to each log path for its block table
    #[arg(long)]
    table_suffix: Option<String>,

    /// Do not write block tables, normalize in memory
    #[arg(long)]
    no_table: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .wrap_err("Failed to configure thread pool")?;
    }

    let overrides = CliOverrides {
        logs: args.logs.clone(),
        labels: args.labels.clone(),
        table_suffix: args.table_suffix.clone(),
        no_table: args.no_table,
    };
    let config = resolve_config(args.config.as_deref(), &overrides)?;

    info!("Comparing {} runs", config.runs.len());
    let outcomes = analysis::analyze_runs(
        &config.paths(),
        &config.labels(),
        &config.pipeline_options(),
    );

    let table = analysis::compare(&comparison_input(&outcomes));
    match args.format {
        OutputFormat::Text => println!("{}", analysis::render_text(&table)),
        OutputFormat::Json => println!("{}", analysis::render_json(&outcomes, &table)?),
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.is_failed()).collect();
    if !failed.is_empty() {
        for outcome in &failed {
            if let Some(ref reason) = outcome.failure {
                log::error!("Run {} failed: {}", outcome.label, reason);
            }
        }
        return Err(eyre!("{} of {} runs failed to parse", failed.len(), outcomes.len()));
    }

    Ok(())
}
