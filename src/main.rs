use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scaffoldr::artifact::extract_artifacts;
use scaffoldr::collab::{HttpCatalogue, HttpIntentChannel, LlmGenerator, LlmValidator};
use scaffoldr::domain::IntentRequest;
use scaffoldr::llm::{AnthropicClient, AnthropicConfig, LlmClient};
use scaffoldr::orchestrator::{IntentOrchestrator, IntentResponse};
use scaffoldr::persist::ScaffoldWriter;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scaffoldr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("scaffoldr.log");

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
        eprintln!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Compose {
            request,
            baseline,
            target,
            dry_run,
        } => handle_compose_command(request, baseline.as_deref(), target.as_deref(), *dry_run, config).await,
        Commands::Extract { raw, json } => handle_extract_command(raw, *json),
    }
}

async fn handle_compose_command(
    request_path: &Path,
    baseline: Option<&Path>,
    target: Option<&Path>,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let text = fs::read_to_string(request_path)
        .context(format!("Failed to read request {}", request_path.display()))?;
    let request: IntentRequest = serde_json::from_str(&text).context("Failed to parse intent request")?;

    let orchestrator = build_orchestrator(config, baseline, target, dry_run)?;
    let response = orchestrator.handle(request).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    match &response {
        IntentResponse::Completed(report) => {
            eprintln!(
                "{} {} files, {} dependencies, {} corrections",
                "Completed:".green(),
                report.files.len(),
                report.dependencies.len(),
                report.correction_attempts
            );
            Ok(())
        }
        IntentResponse::AwaitingInput { message, .. } => {
            eprintln!("{} {}", "Awaiting input:".yellow(), message);
            Ok(())
        }
        IntentResponse::Failed { error, .. } => {
            eprintln!("{} {}", "Failed:".red(), error.message);
            bail!("compose failed: {}", error.kind)
        }
    }
}

fn build_orchestrator(
    config: &Config,
    baseline: Option<&Path>,
    target: Option<&Path>,
    dry_run: bool,
) -> Result<IntentOrchestrator> {
    let timeout = Duration::from_millis(config.llm.timeout_ms);
    let client: Arc<dyn LlmClient> = Arc::new(
        AnthropicClient::new(AnthropicConfig {
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            timeout,
        })
        .context("Failed to create LLM client")?,
    );
    info!("Using model {}", client.model());

    let generator = LlmGenerator::new(client.clone())
        .with_max_tokens(config.llm.max_tokens)
        .with_timeout(timeout);
    let validator = LlmValidator::new(client).with_timeout(timeout);

    let mut orchestrator =
        IntentOrchestrator::new(Arc::new(generator), Arc::new(validator)).with_config(config.pipeline.clone());

    if let Some(base_url) = &config.catalogue.base_url {
        let catalogue = HttpCatalogue::new(base_url, Duration::from_millis(config.catalogue.timeout_ms))?;
        orchestrator = orchestrator.with_catalogue(Arc::new(catalogue));
    }
    if let Some(endpoint) = &config.intents.endpoint {
        let channel = HttpIntentChannel::new(endpoint, Duration::from_millis(config.intents.timeout_ms))?;
        orchestrator = orchestrator.with_intent_channel(Arc::new(channel));
    }

    if !dry_run {
        let target = target.map(Path::to_path_buf).unwrap_or_else(|| config.scaffold.target_dir.clone());
        let mut writer = ScaffoldWriter::new(target).with_manifest(&config.scaffold.protected_manifest);
        if let Some(baseline) = baseline.map(Path::to_path_buf).or_else(|| config.scaffold.baseline_dir.clone()) {
            writer = writer.with_baseline(baseline);
        }
        orchestrator = orchestrator.with_persistence(Arc::new(writer));
    }

    Ok(orchestrator)
}

fn handle_extract_command(raw_path: &Path, json: bool) -> Result<()> {
    let raw = fs::read_to_string(raw_path).context(format!("Failed to read {}", raw_path.display()))?;
    let extraction = extract_artifacts(&raw);

    if json {
        let value = serde_json::json!({
            "files": extraction.files,
            "dependencies": extraction.dependencies,
            "skipped": extraction.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} ({})", "Files".cyan(), extraction.files.len());
    for file in &extraction.files {
        println!("  {} {} lines", file.path, file.content.lines().count());
    }
    println!("{} ({})", "Dependencies".cyan(), extraction.dependencies.len());
    for dependency in &extraction.dependencies {
        println!("  {}", dependency);
    }
    if extraction.skipped > 0 {
        println!("{} {} malformed blocks", "Skipped:".yellow(), extraction.skipped);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
