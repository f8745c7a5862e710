//! Server setup and lifecycle management

use crate::api::rest::router::build_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::session::SessionStore;
use crate::storage::{self, InMemoryStorage, PostgresStorage, Storage};
use mela_notify::{HttpSmsNotifier, NoopNotifier, Notifier, SmsProviderConfig};
use mela_payments::{HttpGateway, PaymentGateway, SandboxGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Mela daemon server
pub struct Server {
    config: DaemonConfig,
    state: AppState,
}

impl Server {
    /// Assemble storage, sessions, gateway, and notifier from configuration
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let storage: Arc<dyn Storage> = match &config.storage {
            StorageConfig::Memory { seed_demo_data } => {
                let memory = InMemoryStorage::new();
                if *seed_demo_data {
                    storage::seed::install(&memory).await?;
                    tracing::info!("installed demo catalog");
                }
                Arc::new(memory)
            }
            StorageConfig::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => {
                let pg = PostgresStorage::connect(
                    url,
                    *max_connections,
                    Duration::from_secs(*connect_timeout_secs),
                )
                .await?;
                tracing::info!("connected to postgres");
                Arc::new(pg)
            }
        };

        let sessions = Arc::new(SessionStore::new(Duration::from_secs(
            config.sessions.ttl_hours * 3600,
        )));

        let gateway: Arc<dyn PaymentGateway> =
            if config.payments.sandbox || config.payments.key_id.is_empty() {
                tracing::info!("payment gateway: sandbox");
                Arc::new(SandboxGateway)
            } else {
                Arc::new(
                    HttpGateway::new(
                        &config.payments.api_url,
                        &config.payments.key_id,
                        &config.payments.key_secret,
                        Duration::from_secs(config.payments.timeout_secs),
                    )
                    .map_err(|e| DaemonError::Config(e.to_string()))?,
                )
            };

        let notifier: Arc<dyn Notifier> = if config.sms.enabled {
            Arc::new(
                HttpSmsNotifier::new(SmsProviderConfig {
                    base_url: config.sms.base_url.clone(),
                    account_sid: config.sms.account_sid.clone(),
                    api_key: config.sms.api_key.clone(),
                    api_secret: config.sms.api_secret.clone(),
                    from_number: config.sms.from_number.clone(),
                    timeout: Duration::from_secs(config.sms.timeout_secs),
                })
                .map_err(|e| DaemonError::Config(e.to_string()))?,
            )
        } else {
            tracing::info!("sms disabled, messages go to the log");
            Arc::new(NoopNotifier)
        };

        let state = AppState {
            storage,
            sessions,
            gateway,
            notifier,
            payments: config.payments.clone(),
        };

        Ok(Self { config, state })
    }

    /// Serve until interrupted
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = build_router(self.state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("mela daemon listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("mela daemon shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
