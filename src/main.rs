use clap::Parser;
use hodl::adapters::{start_api_server, BrokerageClient};
use hodl::api::AppState;
use hodl::cli::{self, Cli, Commands};
use hodl::config::{AppConfig, LoggingConfig};
use hodl::error::{HodlError, Result};
use hodl::persistence::{FileStateStore, StateActor};
use hodl::strategy::tracker::DEFAULT_MAX_RECORDS;
use hodl::strategy::{ExecutionTracker, ExecutorSettings, StrategyExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    match &cli.command {
        Commands::Serve => {
            init_logging(&config.logging);
            run_service(config).await?;
        }
        _ => {
            init_logging_simple();
            cli::run_client_command(&cli, &config).await?;
        }
    }

    Ok(())
}

async fn run_service(config: AppConfig) -> Result<()> {
    if let Err(problems) = config.validate() {
        for problem in &problems {
            error!("config: {}", problem);
        }
        return Err(HodlError::Validation(problems.join("; ")));
    }

    let client = BrokerageClient::from_config(&config.brokerage)?;
    info!(
        base_url = %client.base_url(),
        preview = config.execution.preview,
        "brokerage client ready"
    );
    let gateway = Arc::new(client);

    let state = StateActor::spawn(FileStateStore::new(&config.state.path));
    let executor = StrategyExecutor::new(
        gateway.clone(),
        state,
        ExecutionTracker::with_limits(
            Duration::from_secs(config.execution.record_retention_secs),
            DEFAULT_MAX_RECORDS,
        ),
        ExecutorSettings {
            preview: config.execution.preview,
            fiat_currency: config.brokerage.fiat_currency.clone(),
        },
    );

    let app_state = AppState::new(
        gateway,
        executor,
        config.brokerage.fiat_currency.clone(),
        Duration::from_secs(config.execution.wait_timeout_secs),
    );

    start_api_server(app_state, &config.server.host, config.server.port, shutdown_signal()).await
}

fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // `rolling::daily` panics if it cannot create the first file, so check writability first
    let file_layer = config.dir.as_ref().and_then(|log_dir| {
        let test_path = log_dir.join(".hodl_write_test");
        let writable = std::fs::create_dir_all(log_dir).is_ok()
            && std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&test_path)
                .is_ok();
        if !writable {
            eprintln!(
                "Warning: Could not write to log directory {}, file logging disabled",
                log_dir.display()
            );
            return None;
        }
        let _ = std::fs::remove_file(&test_path);

        let file_appender = tracing_appender::rolling::daily(log_dir, "hodl.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Keep the guard alive for the life of the process
        Box::leak(Box::new(guard));

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });

    let (json_layer, console_layer) = if config.json {
        (Some(tracing_subscriber::fmt::layer().json().with_target(true)), None)
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn init_logging_simple() {
    // Minimal logging for CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
