use std::sync::Arc;

use supportline_core::{AssignmentPolicy, ChatStore, SupportlineConfig};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn ChatStore>,
    pub config: SupportlineConfig,
    pub policy: AssignmentPolicy,
}

impl AppContext {
    pub fn new(store: Arc<dyn ChatStore>, config: SupportlineConfig) -> Self {
        let policy = AssignmentPolicy::from(&config.assignment);
        Self {
            store,
            config,
            policy,
        }
    }
}
