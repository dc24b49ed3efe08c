use std::sync::Arc;

use dispatch_core::lifecycle::CoordinatorBuilder;
use dispatch_core::{DispatchResult, LifecycleCoordinator};

use crate::connections::ConnectionRegistry;

/// Shared by every handler and socket task.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<LifecycleCoordinator>,
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Build the coordinator with the connection registry as its
    /// notification sink.
    pub fn new(builder: CoordinatorBuilder) -> DispatchResult<Self> {
        let connections = Arc::new(ConnectionRegistry::new());
        let coordinator = builder.sink(connections.clone()).build()?;
        Ok(Self {
            coordinator: Arc::new(coordinator),
            connections,
        })
    }
}
