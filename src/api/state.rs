//! Shared application state for API handlers

use crate::config::Config;
use crate::runner::JobRunner;
use std::sync::Arc;

/// Application state shared across all API handlers
///
/// Cheap to clone: both fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// The job runner that owns the registry and the extraction engine
    pub runner: Arc<JobRunner>,
    /// The service configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(runner: Arc<JobRunner>, config: Arc<Config>) -> Self {
        Self { runner, config }
    }
}
