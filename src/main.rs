use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use latbench::config::Config;
use latbench::http_client::HttpClient;
use latbench::orchestrator::{Catalog, MeasurementOrchestrator};
use latbench::prompt::{DefaultPrompts, DirPromptSource, PromptSource};
use latbench::provider;
use latbench::tui::{self, App, LogBuffer, TuiLogLayer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;

    let log_buffer = TuiLogLayer::buffer();
    init_tracing(&config, Arc::clone(&log_buffer))?;

    tracing::info!("latbench {} starting", env!("CARGO_PKG_VERSION"));

    let http = HttpClient::new(config.http_max_connections, config.http_connect_timeout)?;

    let providers = provider::init_providers(&config, &http).await;
    if providers.is_empty() {
        anyhow::bail!(
            "No provider available. Set at least one of OPENAI_API_KEY, GROQ_API_KEY or AWS_BEARER_TOKEN_BEDROCK"
        );
    }

    let catalog = Arc::new(Catalog::from_providers(&providers, &config.model_filter));
    if catalog.is_empty() {
        tracing::warn!(filter = %config.model_filter, "No models match the filter");
    }
    tracing::info!(
        providers = providers.len(),
        models = catalog.len(),
        "Model catalog ready"
    );

    let prompts: Arc<dyn PromptSource> = Arc::new(DirPromptSource::new(
        config.prompts_dir.clone(),
        DefaultPrompts::load(),
    ));

    let (tx, rx) = mpsc::unbounded_channel();
    let orchestrator = MeasurementOrchestrator::new(
        Arc::clone(&catalog),
        prompts,
        config.sample_size,
        tx,
    )
    .with_seed(config.sample_seed);

    let app = App::new(catalog.table(), orchestrator, log_buffer);
    tui::run(app, rx).await?;

    tracing::info!("latbench exiting");
    Ok(())
}

/// Registry with the log panel layer and an optional file layer.
/// stdout belongs to the TUI, so nothing is printed there.
fn init_tracing(config: &Config, log_buffer: LogBuffer) -> Result<()> {
    let log_level = config.log_level.to_lowercase();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_file(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(TuiLogLayer::new(log_buffer))
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
