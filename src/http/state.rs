use crate::service::InterviewService;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InterviewService>,
}

impl AppState {
    pub fn new(service: Arc<InterviewService>) -> Self {
        Self { service }
    }
}
