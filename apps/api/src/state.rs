use std::sync::Arc;

use sqlx::SqlitePool;

use crate::budget::BudgetConfig;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::workgen::AdminNotifier;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub llm: LlmClient,
    pub config: Config,
    /// Page-budget knobs; defaults are the calibrated production values.
    pub budget: BudgetConfig,
    /// Out-of-band channel for degradations and failures. Default: the log.
    pub notifier: Arc<dyn AdminNotifier>,
}
