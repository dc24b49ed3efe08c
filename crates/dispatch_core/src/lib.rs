pub mod account;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod lifecycle;
pub mod matching;
pub mod presence;
pub mod pricing;
pub mod ride;
pub mod stats;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{DispatchError, DispatchResult};
pub use lifecycle::LifecycleCoordinator;
