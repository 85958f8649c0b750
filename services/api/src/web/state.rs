//! services/api/src/web/state.rs
//!
//! Defines the application state shared across all handlers.

use crate::config::Config;
use evaluation_core::ports::SessionStore;
use evaluation_core::session::SessionManager;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
}

impl AppState {
    /// Wires the session manager over `store` using the configured policy.
    pub fn new(store: Arc<dyn SessionStore>, config: &Config) -> Self {
        let sessions = SessionManager::with_policy(store, config.session_policy());
        Self { sessions }
    }
}
