//! # Composable Fetch Runtime
//!
//! Runs the reducers of `composable-fetch-core` on tokio.
//!
//! - [`Store`]: owns the state, reduces actions one at a time and runs
//!   the returned effects, feeding their output back in.
//! - [`FetchController`]: the handle a host view drives (activate,
//!   trigger, refetch, teardown) over a store running the controller
//!   reducer.
//! - [`ControllerSettings`]: environment-driven policy defaults.
//! - [`metrics`]: metric descriptions and a Prometheus exporter.

/// Host-facing controller handle
pub mod controller;

/// Metric descriptions and the Prometheus exporter
pub mod metrics;

/// Environment-driven controller settings
pub mod settings;

mod store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The store was closed and no longer accepts actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Effects were still running when the shutdown timeout elapsed
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Effects did not finish in time
        #[error("Timed out waiting for effects")]
        Timeout,

        /// Every sender of a watched channel was dropped
        #[error("Store channel closed")]
        ChannelClosed,
    }
}

pub use controller::{FetchController, FetchWatch, TriggerOptions};
pub use error::StoreError;
pub use settings::{ControllerSettings, SettingsError};
pub use store::{EffectHandle, Store};

/// Store construction options
///
/// ```
/// use composable_fetch_runtime::StoreConfig;
///
/// let config = StoreConfig::default().with_broadcast_capacity(64);
/// assert_eq!(config.broadcast_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Capacity of the effect output broadcast; slower receivers lag
    pub broadcast_capacity: usize,
}

impl StoreConfig {
    /// Set the broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
        }
    }
}
