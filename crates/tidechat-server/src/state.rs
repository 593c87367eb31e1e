//! Shared application state

use std::sync::Arc;

use tidechat_core::ai::client::CompletionBackend;
use tidechat_core::storage::SharedDatabase;
use tidechat_core::{CompletionGateway, TitleService};

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CompletionGateway>,
    pub titles: Arc<TitleService>,
    pub db: SharedDatabase,
}

impl AppState {
    /// Build state around a completion backend and an open database
    ///
    /// The backend is injectable so tests can run the full router against
    /// mock providers.
    pub fn new(backend: Arc<dyn CompletionBackend>, db: SharedDatabase) -> Self {
        Self {
            gateway: Arc::new(CompletionGateway::new(backend.clone())),
            titles: Arc::new(TitleService::new(backend)),
            db,
        }
    }
}
