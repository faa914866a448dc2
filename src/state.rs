use crate::config::Config;
use crate::engine::FaultInjector;
use crate::store::memory::{MemoryRouteStore, MemoryUserDirectory};
use crate::store::{RouteStore, UserDirectory};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<dyn RouteStore>,
    pub users: Arc<dyn UserDirectory>,
    pub faults: Arc<FaultInjector>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(routes: Arc<dyn RouteStore>, users: Arc<dyn UserDirectory>, config: Config) -> Self {
        Self {
            routes,
            users,
            faults: Arc::new(FaultInjector::new(config.fault_seed)),
            config: Arc::new(config),
        }
    }

    /// State over fresh in-memory stores
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            Arc::new(MemoryRouteStore::new()),
            Arc::new(MemoryUserDirectory::new()),
            config,
        )
    }
}
