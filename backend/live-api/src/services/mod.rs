use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::CallerAuthorizer;
use crate::services::broadcast::BroadcastHub;
use crate::services::registry::SessionRegistry;
use crate::services::store::AnswerStore;

pub struct AppState {
    pub config: Config,
    pub registry: Arc<SessionRegistry>,
    pub hub: Arc<BroadcastHub>,
    pub authorizer: Arc<dyn CallerAuthorizer>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn AnswerStore>,
        authorizer: Arc<dyn CallerAuthorizer>,
    ) -> Self {
        let hub = Arc::new(BroadcastHub::new());
        let registry = SessionRegistry::new(Arc::clone(&hub), store, config.timings());
        Self {
            config,
            registry,
            hub,
            authorizer,
        }
    }
}

pub mod auth;
pub mod broadcast;
pub mod registry;
pub mod roster;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod store;
