use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ExtractionPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ExtractionPipeline>,
    pub config: Arc<Config>,
}
