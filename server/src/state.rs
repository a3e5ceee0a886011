use std::sync::Arc;

use crate::config::Config;
use crate::store::PasteStore;

/// Handles shared by every request. Holds no mutable state of its own; the
/// store is the only synchronization point.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PasteStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn PasteStore>) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
