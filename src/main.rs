use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[cfg(not(feature = "redis-backend"))]
use divvy::backend::MemoryBackend;
use divvy::config::load_rule_table;
use divvy::hit::HitHandler;
use divvy::metrics::TracingMetrics;
use divvy::server::Listener;
use divvy::settings::{exit_code, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("divvy: {}", e);
            return ExitCode::from(exit_code::CONFIG_ERROR as u8);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(settings.log_filter.clone()))
        .init();

    let rules = match load_rule_table(&settings.config_path) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(error = %e, "failed to load rule table");
            return ExitCode::from(exit_code::CONFIG_ERROR as u8);
        }
    };
    tracing::info!(rules = rules.len(), path = %settings.config_path, "rule table loaded");

    let backend = match build_backend(&settings) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize backend");
            return ExitCode::from(exit_code::BACKEND_INIT_FAILURE as u8);
        }
    };

    let metrics = build_metrics();

    let hit_handler = Arc::new(HitHandler::new(
        Arc::new(rules),
        backend,
        metrics.clone(),
        settings.failure_policy,
    ));

    let listener = match Listener::bind(
        &settings.listen_addr,
        settings.max_line_bytes,
        settings.max_connections,
        settings.shutdown_grace,
        hit_handler,
        metrics,
    )
    .await
    {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %settings.listen_addr, "failed to bind listener");
            return ExitCode::from(exit_code::BIND_FAILURE as u8);
        }
    };

    tracing::info!(addr = %listener.local_addr().unwrap(), "divvy-server starting");

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    if let Err(e) = listener.serve(shutdown_rx).await {
        tracing::error!(error = %e, "server loop exited with an error");
        return ExitCode::from(exit_code::BIND_FAILURE as u8);
    }

    ExitCode::from(exit_code::OK as u8)
}

#[cfg(feature = "redis-backend")]
fn build_backend(settings: &Settings) -> Result<Arc<dyn divvy::backend::Backend>, divvy::backend::BackendError> {
    use divvy::backend::RedisBackend;
    Ok(Arc::new(RedisBackend::new(&settings.backend_addr)?))
}

#[cfg(not(feature = "redis-backend"))]
fn build_backend(_settings: &Settings) -> Result<Arc<dyn divvy::backend::Backend>, divvy::backend::BackendError> {
    let backend = MemoryBackend::new();
    tokio::spawn(backend.clone().run_eviction_sweep(std::time::Duration::from_secs(30)));
    Ok(Arc::new(backend))
}

#[cfg(feature = "dogstatsd")]
fn build_metrics() -> Arc<dyn divvy::metrics::MetricsSink> {
    Arc::new(divvy::metrics::DogStatsdMetrics::from_env())
}

#[cfg(not(feature = "dogstatsd"))]
fn build_metrics() -> Arc<dyn divvy::metrics::MetricsSink> {
    Arc::new(TracingMetrics::new())
}
