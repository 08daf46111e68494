//! Process entry point: load configuration, build the shared [`AppContext`],
//! start the scheduler and progress-reconciler background loops, and block
//! until a shutdown signal arrives.

use submikan_config::AppConfig;
use submikan_telemetry::{LogFormat, LoggingConfig, init_logging};
use tracing::info;

use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::{reconciler, scheduler};

/// Bootstrap and run the submikan engine until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if configuration loading, logging initialization, or
/// dependency construction fails.
pub async fn run_app() -> AppResult<()> {
    let logging = LoggingConfig {
        level: submikan_telemetry::DEFAULT_LOG_LEVEL,
        format: LogFormat::infer(),
        build_sha: submikan_telemetry::build_sha(),
    };
    init_logging(&logging).map_err(AppError::Telemetry)?;

    info!("submikan bootstrap starting");

    let config = AppConfig::from_env()?;
    let database_url = std::env::var("DATABASE_URL").map_err(|_| AppError::MissingEnv {
        name: "DATABASE_URL",
    })?;

    let ctx = AppContext::build(config, &database_url).await?;

    let scheduler_handle = scheduler::start(ctx.clone());
    let reconciler_handle = reconciler::start(ctx.clone());

    info!("submikan background loops started");
    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping background loops");

    scheduler_handle.stop().await;
    reconciler_handle.stop().await;

    info!("submikan shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
