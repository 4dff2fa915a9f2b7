use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use finance_agent::api::{AppState, task_routes};
use finance_agent::config::AgentConfig;
use finance_agent::error::ConfigError;
use finance_agent::worker::spawn_eviction_task;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfig::from_env().context("invalid FINANCE_AGENT_* configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_tracing(&config)?;

    eprintln!("📈 Finance Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Task API: http://{}/execute", config.bind_addr());
    eprintln!("   Events WS: ws://{}/ws", config.bind_addr());
    eprintln!(
        "   Prices: {}",
        config.price_url.as_deref().unwrap_or("mock table")
    );

    let state = AppState::from_config(&config)?;
    let manager = state.manager.clone();

    // ── Retention ───────────────────────────────────────────────────────
    let _eviction_handle = match config.retention {
        Some(retention) => {
            eprintln!("   Retention: {}s", retention.as_secs());
            Some(spawn_eviction_task(manager.clone(), config.sweep_interval))
        }
        None => {
            eprintln!("   Retention: keep all tasks");
            None
        }
    };

    let app = task_routes(state).layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), name = %config.name, "Finance agent started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
            manager.stop_all().await;
        })
        .await?;

    Ok(())
}

fn init_tracing(config: &AgentConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "finance-agent.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            Ok(None)
        }
    }
}
