//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::state::{self, AppState};
use common::RequestContext;
use event_bus::{EventBus, InMemoryEventBus};
use saga::{OrphanAudit, SagaRecovery};
use saga_log::{InMemorySagaLog, PostgresSagaLog, SagaLog};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_saga_log(config: &Config) -> Result<Arc<dyn SagaLog>, BoxError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            let log = PostgresSagaLog::new(pool);
            log.run_migrations().await?;
            tracing::info!("saga log on PostgreSQL");
            Ok(Arc::new(log))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, saga log kept in memory");
            Ok(Arc::new(InMemorySagaLog::new()))
        }
    }
}

/// Periodically lists subscriptions that failed compensation left behind.
fn spawn_orphan_audit(state: &AppState, config: &Config) -> Result<JoinHandle<()>, BoxError> {
    let audit = OrphanAudit::new(
        state.subscriptions.clone(),
        state.payments.clone(),
        chrono::Duration::from_std(config.orphan_grace)?,
    );
    let interval = config.recovery_interval;

    Ok(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = audit.run(&RequestContext::generate()).await {
                tracing::error!(error = %e, "orphan audit failed");
            }
        }
    }))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Configuration and tracing
    let config = Config::from_env()?;
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Services, bus consumers and the saga log
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::with_history(0));
    let providers = Arc::new(state::provider_registry(&config)?);
    tracing::info!(providers = ?providers.names(), "payment providers configured");
    let saga_log = open_saga_log(&config).await?;
    let notifications = Arc::new(state::default_dispatcher());

    let app_state = Arc::new(AppState::new(
        &config,
        bus,
        providers,
        saga_log,
        notifications,
    ));
    app_state.subscribe_consumers().await?;

    // 4. Background recovery of interrupted registrations
    let recovery = Arc::new(SagaRecovery::new(
        app_state.registrations.clone(),
        chrono::Duration::from_std(config.saga_idle_after)?,
    ));
    let recovery_task = recovery.spawn(config.recovery_interval);
    let audit_task = spawn_orphan_audit(&app_state, &config)?;

    // 5. Build the application and serve
    let app = api::create_app(app_state, metrics_handle, config.is_production());

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    recovery_task.abort();
    audit_task.abort();
    tracing::info!("server shut down gracefully");
    Ok(())
}
