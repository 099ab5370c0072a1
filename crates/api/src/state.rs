use std::sync::Arc;

use habita_notify::NotificationEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The notification engine (templates, selector, stores, analytics).
    pub engine: Arc<NotificationEngine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool for health checks. `None` when the engine runs over
    /// the in-memory stores (integration tests, local scratch mode).
    pub pool: Option<habita_db::DbPool>,
}
