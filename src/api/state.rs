use std::sync::Arc;

use crate::db::HistoryStore;
use crate::services::{GenerationProvider, IdentityVerifier, RecommendationService};

/// Shared application state
///
/// Every collaborator is built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub identity: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        history: Arc<dyn HistoryStore>,
        identity: Option<Arc<dyn IdentityVerifier>>,
    ) -> Self {
        Self {
            recommendations: Arc::new(RecommendationService::new(provider, history)),
            identity,
        }
    }
}
