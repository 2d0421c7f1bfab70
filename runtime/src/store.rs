//! The store: state, reducer and the effect feedback loop.

use crate::{StoreConfig, StoreError};
use composable_fetch_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast, watch};

/// Count of running effects that can be awaited down to zero
#[derive(Clone)]
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn new() -> Self {
        Self(Arc::new(watch::Sender::new(0)))
    }

    /// Register one running effect until the guard drops
    fn enter(&self) -> InFlightGuard {
        self.0.send_modify(|count| *count += 1);
        InFlightGuard(self.clone())
    }

    fn current(&self) -> usize {
        *self.0.borrow()
    }
}

/// Decrements on drop, so a panicking effect still counts as finished
struct InFlightGuard(InFlight);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}

async fn drained(mut count: watch::Receiver<usize>) {
    // The sender lives as long as the guards that would decrement it.
    let _ = count.wait_for(|running| *running == 0).await;
}

/// Completion handle for the effects started by one [`Store::send`]
///
/// An effect whose output is fed back counts as finished once that
/// output has been reduced. Effects started by the fed-back action are
/// not included.
#[derive(Clone)]
pub struct EffectHandle {
    running: watch::Receiver<usize>,
}

impl EffectHandle {
    fn tracking(in_flight: &InFlight) -> Self {
        Self {
            running: in_flight.0.subscribe(),
        }
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        Self::tracking(&InFlight::new())
    }

    /// Effects of this send still running
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.running.borrow()
    }

    /// Wait until every effect of this send has finished
    pub async fn wait(&mut self) {
        drained(self.running.clone()).await;
    }

    /// [`wait`](Self::wait) bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when
    /// the timeout elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

struct Shared<R: Reducer> {
    state: RwLock<R::State>,
    reducer: R,
    environment: R::Environment,
    closed: AtomicBool,
    in_flight: InFlight,
    outputs: broadcast::Sender<R::Action>,
    snapshots: watch::Sender<R::State>,
}

/// Runtime for one reducer
///
/// Actions are reduced one at a time under a write lock; the resulting
/// effects run as tokio tasks and their outputs are sent back through
/// [`send`](Self::send). Every reduction publishes a state snapshot to
/// [`subscribe_state`](Self::subscribe_state) receivers.
///
/// Cloning yields another handle to the same store.
///
/// ```
/// use composable_fetch_core::effect::Effect;
/// use composable_fetch_core::reducer::Reducer;
/// use composable_fetch_core::{SmallVec, smallvec};
/// use composable_fetch_runtime::Store;
///
/// #[derive(Clone)]
/// struct Counter;
///
/// impl Reducer for Counter {
///     type State = u32;
///     type Action = u32;
///     type Environment = ();
///
///     fn reduce(&self, total: &mut u32, n: u32, _: &()) -> SmallVec<[Effect<u32>; 4]> {
///         *total += n;
///         smallvec![]
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let store = Store::new(0, Counter, ());
/// store.send(5).await?;
/// assert_eq!(store.state(|total| *total).await, 5);
/// # Ok::<(), composable_fetch_runtime::StoreError>(())
/// # }).unwrap();
/// ```
pub struct Store<R: Reducer> {
    shared: Arc<Shared<R>>,
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Clone + Send + Sync + 'static,
    R::Action: Clone + Send + 'static,
    R::Environment: Send + Sync + 'static,
{
    /// Create a store with the default configuration
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self::with_config(initial_state, reducer, environment, &StoreConfig::default())
    }

    /// Create a store
    ///
    /// A broadcast capacity of zero is raised to one.
    #[must_use]
    pub fn with_config(
        initial_state: R::State,
        reducer: R,
        environment: R::Environment,
        config: &StoreConfig,
    ) -> Self {
        let (outputs, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            shared: Arc::new(Shared {
                snapshots: watch::Sender::new(initial_state.clone()),
                state: RwLock::new(initial_state),
                reducer,
                environment,
                closed: AtomicBool::new(false),
                in_flight: InFlight::new(),
                outputs,
            }),
        }
    }

    /// Reduce `action` and start its effects
    ///
    /// Returns once the effects are started, not finished.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once the store is closed.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: R::Action) -> Result<EffectHandle, StoreError> {
        if self.is_closed() {
            tracing::debug!("Store closed; action rejected");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }
        metrics::counter!("store.actions.total").increment(1);

        let effects = {
            let mut state = self.shared.state.write().await;
            let started = Instant::now();
            let effects = self
                .shared
                .reducer
                .reduce(&mut state, action, &self.shared.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(started.elapsed().as_secs_f64());

            self.shared.snapshots.send_replace((*state).clone());
            effects
        };

        let tracker = InFlight::new();
        let handle = EffectHandle::tracking(&tracker);
        for effect in effects {
            self.spawn_effect(effect, &tracker);
        }
        Ok(handle)
    }

    fn spawn_effect(&self, effect: Effect<R::Action>, tracker: &InFlight) {
        let Some(future) = effect.into_future() else {
            metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            return;
        };
        metrics::counter!("store.effects.executed", "type" => "future").increment(1);

        let send_guard = tracker.enter();
        let store_guard = self.shared.in_flight.enter();
        let store = self.clone();

        tokio::spawn(async move {
            let _guards = (send_guard, store_guard);

            let Some(action) = future.await else {
                tracing::trace!("Effect finished without output");
                return;
            };
            if store.is_closed() {
                tracing::debug!("Store closed; effect output discarded");
                return;
            }

            // No receivers is the common case.
            let _ = store.shared.outputs.send(action.clone());
            if let Err(error) = store.send(action).await {
                tracing::debug!(%error, "Effect output not applied");
            }
        });
    }

    /// Read the state through `f`
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        f(&*self.shared.state.read().await)
    }

    /// Receive every action produced by an effect, before it is reduced
    ///
    /// Actions passed to [`send`](Self::send) directly are not included.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<R::Action> {
        self.shared.outputs.subscribe()
    }

    /// Receive a state snapshot after every reduction
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<R::State> {
        self.shared.snapshots.subscribe()
    }

    /// Effects running across all sends
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.shared.in_flight.current()
    }

    /// True once [`close`](Self::close) or [`shutdown`](Self::shutdown) ran
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Reject further actions, including outputs of running effects
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(pending_effects = self.pending_effects(), "Store closed");
            metrics::counter!("store.shutdown.initiated").increment(1);
        }
    }

    /// Close the store and wait up to `timeout` for running effects
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of effects
    /// still running when the timeout elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.close();

        let running = self.shared.in_flight.0.subscribe();
        if tokio::time::timeout(timeout, drained(running)).await.is_ok() {
            tracing::info!("Store drained");
            metrics::counter!("store.shutdown.completed").increment(1);
            Ok(())
        } else {
            let pending = self.pending_effects();
            tracing::error!(pending_effects = pending, "Shutdown timed out");
            metrics::counter!("store.shutdown.timeout").increment(1);
            Err(StoreError::ShutdownTimeout(pending))
        }
    }
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
