//! `songplay-etl` command-line entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use songplay_etl::pipeline::{PipelineConfig, PipelineError, PipelineExecutor, PipelineStage};
use songplay_etl::transform::WeekStart;

/// Build the songplay star schema from raw song and log data
#[derive(Parser, Debug)]
#[command(name = "songplay-etl", version, about)]
struct CliArgs {
    /// Base location holding song_data/ and log_data/
    input: String,

    /// Base location the tables/ directory is written under
    output: String,

    /// TOML configuration file; command-line flags take precedence
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Shuffle partitions for dedup and the songplays join
    #[arg(long, short = 'p')]
    partitions: Option<usize>,

    /// Worker threads (0 = one per core)
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// First day of the week for weekday numbering (sunday, monday)
    #[arg(long)]
    week_start: Option<WeekStart>,

    /// Stage to run; repeat for several (songs, logs). Default: all
    #[arg(long = "stage", short = 's')]
    stages: Vec<PipelineStage>,

    /// Validate inputs without reading or writing data
    #[arg(long)]
    dry_run: bool,

    /// Show stage progress and a run summary
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl CliArgs {
    /// Merge flags over the configuration file, if any
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => PipelineConfig::new(),
        };

        let dry_run = self.dry_run || config.dry_run;
        let verbose = self.verbose || config.verbose;
        config = config
            .with_input(self.input)
            .with_output(self.output)
            .with_dry_run(dry_run)
            .with_verbose(verbose);

        if let Some(partitions) = self.partitions {
            config = config.with_partitions(partitions);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(week_start) = self.week_start {
            config = config.with_week_start(week_start);
        }
        if !self.stages.is_empty() {
            config = config.with_stages(self.stages);
        }

        Ok(config)
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config = args.into_config()?;
    let verbose = config.verbose;

    let mut executor = PipelineExecutor::new(config)?;
    if verbose {
        eprintln!("Starting pipeline run: {}", executor.run_id());
    }

    let report = executor.run()?;

    if verbose {
        report.print_summary();
    }
    if report.is_success() {
        if verbose {
            eprintln!();
            eprintln!("Pipeline completed successfully!");
        }
        Ok(())
    } else {
        anyhow::bail!("Pipeline finished with status {}", report.status)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PipelineError>() {
                Some(pipeline_err) => eprintln!("Error: {}", pipeline_err.user_message()),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
