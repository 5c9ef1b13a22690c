use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::config::{load_config, AppConfig};
use app::http::{metrics_router, primary_router, AppState};
use app::lifecycle::{shutdown_signal, Lifecycle};
use app::observability::{LogFormat, Logger, RequestMetrics};

#[derive(Parser)]
#[command(name = "app", version = app::VERSION)]
#[command(about = "Version, health and metrics service", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("app: {e}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let logger = Logger::stdout(LogFormat::for_environment(&config.environment), filter);
    if let Err(e) = logger.install_global() {
        eprintln!("app: could not install global logger: {e}");
    }

    match run(config, logger.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.in_scope(|| tracing::error!(error = %e, "Fatal error, exiting"));
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig, logger: Logger) -> Result<(), Box<dyn std::error::Error>> {
    logger.in_scope(|| {
        tracing::info!(
            app = app::APPLICATION,
            version = app::VERSION,
            environment = %config.environment,
            log_format = ?logger.format(),
            "application started"
        )
    });

    let metrics = RequestMetrics::new(&config.metrics.subsystem)?;
    let state = AppState::new(&config, logger.clone(), metrics.clone());

    let lifecycle = Lifecycle::start(
        &config,
        logger,
        primary_router(&state),
        metrics_router(metrics),
    )
    .await?;

    lifecycle.run_until(shutdown_signal()).await?;
    Ok(())
}
