//! Application state wiring the session core to its concrete backends.
//!
//! The coordinator is generic over the durable store; AppState pins it to
//! the SQLite implementation.

use std::sync::Arc;
use std::time::Instant;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use relay_core::engine::{CompletionEngine, EngineSettings};
use relay_core::session::{SessionCoordinator, SessionSettings};
use relay_core::store::FallbackSessionStore;
use relay_core::tool::builtin::BuiltinTools;
use relay_core::tool::executor::BoxToolExecutor;
use relay_infra::llm::OpenAiCompatibleProvider;
use relay_infra::llm::openai_compat::config::OpenAiCompatConfig;
use relay_infra::sqlite::{DatabasePool, SqliteSessionStore};
use relay_types::config::RelayConfig;

pub type ConcreteCoordinator = SessionCoordinator<SqliteSessionStore>;

/// Shared application state.
///
/// Used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ConcreteCoordinator>,
    pub config: Arc<RelayConfig>,
    /// Cancelled once on shutdown; every session holds a child token.
    pub shutdown: CancellationToken,
    /// Live session tasks, awaited during shutdown.
    pub sessions: TaskTracker,
    pub api_key_configured: bool,
    pub started_at: Instant,
}

impl AppState {
    /// Open the durable store (if configured), build the backend, wire the coordinator.
    ///
    /// A database that cannot be opened is not fatal: the relay runs on the
    /// in-memory store and says so.
    pub async fn init(config: RelayConfig, api_key: Option<SecretString>) -> anyhow::Result<Self> {
        let store = match config.storage.database_url.as_deref() {
            Some(url) => match DatabasePool::new(url, config.storage.pool_size).await {
                Ok(pool) => {
                    info!("durable session store opened");
                    FallbackSessionStore::new(SqliteSessionStore::new(pool))
                }
                Err(e) => {
                    warn!(error = %e, "failed to open database, using in-memory store");
                    FallbackSessionStore::in_memory()
                }
            },
            None => {
                info!("no database configured, using in-memory store");
                FallbackSessionStore::in_memory()
            }
        };

        let api_key_configured = api_key.is_some();
        if !api_key_configured {
            warn!("no API key configured (OPENAI_API_KEY); completions will fail");
        }

        let provider =
            OpenAiCompatibleProvider::new(OpenAiCompatConfig::from_llm_config(&config.llm, api_key))?;
        let engine = CompletionEngine::new(
            Arc::new(provider),
            BoxToolExecutor::new(BuiltinTools),
            EngineSettings::from(&config.llm),
        );
        let coordinator =
            SessionCoordinator::new(store, engine, SessionSettings::from(&config.session));

        Ok(Self {
            coordinator: Arc::new(coordinator),
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
            sessions: TaskTracker::new(),
            api_key_configured,
            started_at: Instant::now(),
        })
    }

    /// `connected`, `in-memory`, or `unreachable`.
    pub async fn database_status(&self) -> &'static str {
        let store = self.coordinator.store();
        if !store.has_durable() {
            "in-memory"
        } else if store.health_check().await {
            "connected"
        } else {
            "unreachable"
        }
    }
}
