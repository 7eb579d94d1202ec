use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

use sendr::batch;
use sendr::channel::panda::PandaChannel;
use sendr::channel::{DeliveryChannel, NullChannel};
use sendr::classify::PhraseClassifier;
use sendr::domain::{Batch, DeliveryStatus};
use sendr::runner::{Dispatcher, RunContext, RunOutcome, RunParams, RunSummary};
use sendr::store::StatusStore;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sendr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("sendr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Send {
            start,
            limit,
            reset,
            headless,
            dry_run,
        } => handle_send(config, *start, *limit, *reset, *headless, *dry_run).await,
        Commands::Status { detailed } => handle_status(config, *detailed),
    }
}

async fn handle_send(
    config: &Config,
    start: usize,
    limit: usize,
    reset: bool,
    headless: bool,
    dry_run: bool,
) -> Result<()> {
    let batch = batch::load_batch(&config.paths.recipients, &config.paths.message)
        .context("Failed to load batch inputs")?;
    info!("Loaded batch: {} recipients", batch.len());

    let params = RunParams {
        start,
        limit,
        reset,
        sequence_mode: config.sequence_mode,
    };

    let ctx = RunContext::new();
    let stop_handle = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("{}", "Stop requested, finishing current attempt...".yellow());
            stop_handle.request_stop();
        }
    });

    let summary = if dry_run {
        println!("{}", "Dry run: no messages will be sent".cyan());
        run_batch(NullChannel::default(), config, &batch, &params, &ctx).await?
    } else {
        let credentials = config.credentials.resolve()?;
        let channel = PandaChannel::new(
            config.channel.to_webdriver_config(headless),
            credentials,
        )
        .map_err(|e| eyre::eyre!("Failed to set up delivery channel: {e}"))?;
        run_batch(channel, config, &batch, &params, &ctx).await?
    };

    report_summary(&summary);
    Ok(())
}

async fn run_batch<C: DeliveryChannel>(
    channel: C,
    config: &Config,
    batch: &Batch,
    params: &RunParams,
    ctx: &RunContext,
) -> Result<RunSummary> {
    let store = StatusStore::new(&config.paths.status);
    let mut dispatcher = Dispatcher::new(channel, PhraseClassifier::default(), store)
        .with_pacing(config.pacing.to_pacing());

    let summary = dispatcher
        .run(batch, params, ctx)
        .await
        .context("Dispatch run failed")?;
    Ok(summary)
}

fn report_summary(summary: &RunSummary) {
    match summary.outcome {
        RunOutcome::Finished => println!(
            "{} success {} / fail {} ({} attempted)",
            "[done]".green(),
            summary.success,
            summary.fail,
            summary.attempted
        ),
        RunOutcome::Stopped => println!(
            "{} success {} / fail {} ({} attempted), remaining recipients left pending",
            "[stopped]".yellow(),
            summary.success,
            summary.fail,
            summary.attempted
        ),
    }
}

fn handle_status(config: &Config, detailed: bool) -> Result<()> {
    let store = StatusStore::new(&config.paths.status);

    let Some(snapshot) = store.load() else {
        // Absent or mid-rewrite; either way there is nothing to show yet
        println!("{}", "No status yet - start a send to create one".cyan());
        return Ok(());
    };

    let (pending, success, fail) = snapshot.counts();
    println!(
        "created {} | {} pending / {} success / {} fail of {}",
        snapshot.meta.created,
        pending,
        success.to_string().green(),
        fail.to_string().red(),
        snapshot.items.len()
    );

    if detailed {
        for record in &snapshot.items {
            let status = match record.status {
                DeliveryStatus::Pending => "pending".normal(),
                DeliveryStatus::Success => "success".green(),
                DeliveryStatus::Fail => "fail".red(),
            };
            println!(
                "{:>5}  {:<24} {:<8} {}",
                record.index, record.id, status, record.updated
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
