//! The host-facing fetch controller.
//!
//! A [`FetchController`] owns a [`Store`] running the
//! [`ControllerReducer`]. The host calls [`activate`](FetchController::activate)
//! on mount and on every re-render, reads the state through
//! [`state`](FetchController::state) or a [`FetchWatch`], and calls
//! [`teardown`](FetchController::teardown) on unmount.

use crate::settings::ControllerSettings;
use crate::{EffectHandle, Store, StoreError};
use composable_fetch_core::{
    ControllerAction, ControllerReducer, ControllerState, DependencySnapshot, FetchAction,
    FetchConfig, FetchEnvironment, FetchState, Notifier, Operation,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Options of a single trigger
pub use composable_fetch_core::TriggerRequest as TriggerOptions;

type ControllerStore<T> = Store<ControllerReducer<T>>;

/// Fetch lifecycle controller for one host view
///
/// Cloning yields another handle to the same controller.
///
/// # Example
///
/// ```no_run
/// use composable_fetch_core::{FetchConfig, OperationError, Response, SilentNotifier, deps};
/// use composable_fetch_runtime::FetchController;
/// use serde_json::{Value, json};
///
/// # async fn example() -> Result<(), composable_fetch_runtime::StoreError> {
/// let operation = |params: Vec<Value>| async move {
///     Ok::<_, OperationError>(Response::ok(json!({ "value": params.len() })))
/// };
/// let controller = FetchController::<u64>::new(
///     FetchConfig::new().run_on_activation(true).show_loader_on_activation(true),
///     operation,
///     SilentNotifier,
/// );
///
/// let mut watch = controller.subscribe();
/// controller.activate(deps![]).await?;
/// let settled = watch.wait_until(|state| !state.loading).await?;
/// assert_eq!(settled.data, Some(0));
///
/// controller.teardown().await?;
/// # Ok(())
/// # }
/// ```
pub struct FetchController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    store: ControllerStore<T>,
}

impl<T> FetchController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a controller with default settings
    #[must_use]
    pub fn new(
        config: FetchConfig<T>,
        operation: impl Operation + 'static,
        notifier: impl Notifier + 'static,
    ) -> Self {
        Self::from_parts(
            config,
            Arc::new(operation),
            Arc::new(notifier),
            &crate::StoreConfig::default(),
        )
    }

    /// Create a controller whose policies come from `settings`
    #[must_use]
    pub fn with_settings(
        config: FetchConfig<T>,
        operation: impl Operation + 'static,
        notifier: impl Notifier + 'static,
        settings: &ControllerSettings,
    ) -> Self {
        Self::from_parts(
            settings.configure(config),
            Arc::new(operation),
            Arc::new(notifier),
            &settings.store_config(),
        )
    }

    /// Create a controller from shared collaborators
    #[must_use]
    pub fn from_parts(
        config: FetchConfig<T>,
        operation: Arc<dyn Operation>,
        notifier: Arc<dyn Notifier>,
        store_config: &crate::StoreConfig,
    ) -> Self {
        let initial_state = config.initial_state();
        let environment = FetchEnvironment::new(operation, notifier, Arc::new(config));
        let store = Store::with_config(
            initial_state,
            ControllerReducer::new(),
            environment,
            store_config,
        );

        Self { store }
    }

    /// One host activation cycle
    ///
    /// Runs the operation on the first activation when configured to, and
    /// reloads when `dependencies` differ from the previous cycle's.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`teardown`](Self::teardown).
    #[tracing::instrument(skip(self, dependencies), name = "fetch_activate")]
    pub async fn activate(
        &self,
        dependencies: DependencySnapshot,
    ) -> Result<EffectHandle, StoreError> {
        self.store
            .send(ControllerAction::Activate { dependencies })
            .await
    }

    /// Invoke the operation
    ///
    /// Returns as soon as the call is in flight; await the handle to wait
    /// for the response to be applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`teardown`](Self::teardown).
    #[tracing::instrument(skip(self, options), name = "fetch_trigger")]
    pub async fn trigger(&self, options: TriggerOptions<T>) -> Result<EffectHandle, StoreError> {
        self.store.send(ControllerAction::Trigger(options)).await
    }

    /// Reload in the background, keeping the current data visible
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`teardown`](Self::teardown).
    #[tracing::instrument(skip(self), name = "fetch_refetch")]
    pub async fn refetch(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(ControllerAction::Refetch).await
    }

    /// Replace the data without a network call
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`teardown`](Self::teardown).
    pub async fn set_data(&self, data: T) -> Result<(), StoreError> {
        self.store
            .send(ControllerAction::Machine(FetchAction::SetData(data)))
            .await
            .map(|_| ())
    }

    /// Record an error without a network call
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`teardown`](Self::teardown).
    pub async fn set_error(&self, message: impl Into<String>) -> Result<(), StoreError> {
        self.store
            .send(ControllerAction::Machine(FetchAction::SetError(message.into())))
            .await
            .map(|_| ())
    }

    /// Snapshot of the fetch state
    pub async fn state(&self) -> FetchState<T> {
        self.store.state(|state| state.fetch.clone()).await
    }

    /// Snapshot of the full controller state (request ids, dependency snapshot)
    pub async fn controller_state(&self) -> ControllerState<T> {
        self.store.state(Clone::clone).await
    }

    /// Watch the fetch state
    #[must_use]
    pub fn subscribe(&self) -> FetchWatch<T> {
        FetchWatch {
            inner: self.store.subscribe_state(),
        }
    }

    /// Subscribe to actions produced by effects (request completions)
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<ControllerAction<T>> {
        self.store.subscribe_actions()
    }

    /// True once the controller has been torn down
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.store.is_closed()
    }

    /// End this controller instance
    ///
    /// Responses still in flight are discarded and every later operation
    /// fails with [`StoreError::ShutdownInProgress`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if already torn down.
    #[tracing::instrument(skip(self), name = "fetch_teardown")]
    pub async fn teardown(&self) -> Result<(), StoreError> {
        self.store.send(ControllerAction::Teardown).await?;
        self.store.close();
        Ok(())
    }
}

impl<T> Clone for FetchController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<T> std::fmt::Debug for FetchController<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchController")
            .field("torn_down", &self.is_torn_down())
            .field("pending_effects", &self.store.pending_effects())
            .finish_non_exhaustive()
    }
}

/// Watch channel of fetch state snapshots
///
/// For re-render scheduling: await [`changed`](Self::changed), then read
/// [`current`](Self::current).
#[derive(Debug, Clone)]
pub struct FetchWatch<T> {
    inner: watch::Receiver<ControllerState<T>>,
}

impl<T: Clone> FetchWatch<T> {
    /// The latest fetch state, marking it as seen
    pub fn current(&mut self) -> FetchState<T> {
        self.inner.borrow_and_update().fetch.clone()
    }

    /// Wait for the next state change
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] once every controller handle is dropped.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.inner
            .changed()
            .await
            .map_err(|_| StoreError::ChannelClosed)
    }

    /// Wait until the fetch state satisfies `predicate` and return it
    ///
    /// Checks the current state first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] once every controller handle is dropped.
    pub async fn wait_until<F>(&mut self, mut predicate: F) -> Result<FetchState<T>, StoreError>
    where
        F: FnMut(&FetchState<T>) -> bool,
    {
        self.inner
            .wait_for(|state| predicate(&state.fetch))
            .await
            .map(|state| state.fetch.clone())
            .map_err(|_| StoreError::ChannelClosed)
    }
}
