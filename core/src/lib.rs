//! # Composable Fetch Core
//!
//! Core traits and types for the Composable Fetch architecture.
//!
//! This crate provides the pieces of a reusable data-fetching state
//! controller: a pure fetch state machine, the response classification
//! policy, dependency-change detection and the controller reducer that
//! ties them together with an external async operation.
//!
//! ## Core Concepts
//!
//! - **State**: [`FetchState`] - `data`, `loading`, `error`, `refetching`
//! - **Action**: [`FetchAction`] - the six events the state machine accepts
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (the operation call is one)
//! - **Environment**: The [`Operation`](environment::Operation) and
//!   [`Notifier`](environment::Notifier) collaborators, injected via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (the network call is described, not performed, by the reducer)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```
//! use composable_fetch_core::{FetchAction, FetchMachine, FetchState};
//! use composable_fetch_core::reducer::Reducer;
//!
//! let machine = FetchMachine::<i64>::new();
//! let mut state = FetchState::default();
//!
//! machine.reduce(&mut state, FetchAction::Begin, &());
//! assert!(state.loading);
//!
//! machine.reduce(&mut state, FetchAction::Success(Some(42)), &());
//! assert_eq!(state.data, Some(42));
//! assert!(!state.loading);
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use serde_json::Value;
pub use smallvec::{SmallVec, smallvec};

/// Action enum for the fetch state machine and its wire form
pub mod action;

/// Controller reducer: triggers, activations and response handling
pub mod controller;

/// Dependency snapshots for change detection
pub mod dependencies;

/// Declarative macros for effects and dependency lists
pub mod effect_macros;

/// Error types
pub mod error;

/// The fetch state machine
pub mod machine;

/// Response shape and classification policy
pub mod response;

/// Fetch lifecycle state
pub mod state;

pub use action::{FetchAction, TaggedAction};
pub use controller::{
    ControllerAction, ControllerReducer, ControllerState, FetchConfig, FetchEnvironment,
    StaleResponsePolicy, Transform, TriggerRequest,
};
pub use dependencies::DependencySnapshot;
pub use environment::{NoticeDuration, Notifier, Operation, OperationFuture, SilentNotifier};
pub use error::{FALLBACK_MESSAGE, FetchError, OperationError};
pub use machine::FetchMachine;
pub use response::{Outcome, Response, UnknownStatusPolicy};
pub use state::FetchState;

/// The state transition trait
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// Synchronous state transition
    ///
    /// `reduce` mutates the state in place and describes any follow-up
    /// work as [`Effect`]s. It must not block or perform I/O; everything
    /// asynchronous goes through the returned effects. Collaborators come
    /// in through `Environment` so that tests can substitute them.
    ///
    /// ```
    /// use composable_fetch_core::effect::Effect;
    /// use composable_fetch_core::reducer::Reducer;
    /// use composable_fetch_core::{SmallVec, smallvec};
    ///
    /// struct Toggle;
    ///
    /// impl Reducer for Toggle {
    ///     type State = bool;
    ///     type Action = ();
    ///     type Environment = ();
    ///
    ///     fn reduce(&self, state: &mut bool, _: (), _: &()) -> SmallVec<[Effect<()>; 4]> {
    ///         *state = !*state;
    ///         smallvec![]
    ///     }
    /// }
    ///
    /// let mut on = false;
    /// Toggle.reduce(&mut on, (), &());
    /// assert!(on);
    /// ```
    pub trait Reducer {
        /// State owned by the runtime and mutated by `reduce`
        type State;

        /// Events this reducer accepts
        type Action;

        /// Injected collaborators
        type Environment;

        /// Apply `action` to `state` and return the effects to run
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Side effect descriptions returned by reducers
///
/// A reducer never performs I/O. It returns effects, and the runtime
/// runs them and feeds their output back in as actions.
pub mod effect {
    use futures::future::BoxFuture;

    /// Future carried by [`Effect::Future`]
    pub type EffectFuture<Action> = BoxFuture<'static, Option<Action>>;

    /// A side effect to be executed by the runtime
    ///
    /// Several independent effects are expressed by returning several
    /// values from `reduce`; the runtime starts them concurrently.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Async computation; a `Some` output is fed back as the next action
        Future(EffectFuture<Action>),
    }

    impl<Action> Effect<Action> {
        /// True for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }

        /// The future to run, if any
        #[must_use]
        pub fn into_future(self) -> Option<EffectFuture<Action>> {
            match self {
                Self::None => None,
                Self::Future(future) => Some(future),
            }
        }
    }

    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => f.write_str("Effect::None"),
                Self::Future(_) => f.write_str("Effect::Future(..)"),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external collaborators of the fetch controller are abstracted
/// behind traits and injected via the Environment parameter:
///
/// - [`Operation`](environment::Operation): the async data-retrieval call
/// - [`Notifier`](environment::Notifier): the transient "notify user" side channel
pub mod environment {
    use crate::error::OperationError;
    use crate::response::Response;
    use futures::future::BoxFuture;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use std::future::Future;

    /// Future returned by an [`Operation`]
    pub type OperationFuture = BoxFuture<'static, Result<Response, OperationError>>;

    /// The external data-retrieval call
    ///
    /// Receives the effective parameter list and resolves to a
    /// [`Response`], or fails with an [`OperationError`] when the call
    /// itself could not complete (network failure, serialization, ...).
    ///
    /// Any `Fn(Vec<Value>) -> impl Future<Output = Result<Response, OperationError>>`
    /// closure is an `Operation`:
    ///
    /// ```
    /// use composable_fetch_core::environment::Operation;
    /// use composable_fetch_core::{OperationError, Response};
    /// use serde_json::{Value, json};
    ///
    /// let op = |params: Vec<Value>| async move {
    ///     Ok::<_, OperationError>(Response::ok(json!({ "value": params.len() })))
    /// };
    /// let _future = op.call(vec![json!(1)]);
    /// ```
    pub trait Operation: Send + Sync {
        /// Invoke the operation with the given parameters
        fn call(&self, params: Vec<Value>) -> OperationFuture;
    }

    impl<F, Fut> Operation for F
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Response, OperationError>> + Send + 'static,
    {
        fn call(&self, params: Vec<Value>) -> OperationFuture {
            Box::pin(self(params))
        }
    }

    /// How long a transient notice should stay visible
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum NoticeDuration {
        /// Brief notice
        Short,
        /// Extended notice
        #[default]
        Long,
    }

    impl std::fmt::Display for NoticeDuration {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Short => write!(f, "short"),
                Self::Long => write!(f, "long"),
            }
        }
    }

    impl std::str::FromStr for NoticeDuration {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "short" => Ok(Self::Short),
                "long" => Ok(Self::Long),
                other => Err(format!("unknown notice duration `{other}` (expected short|long)")),
            }
        }
    }

    /// User notification side channel
    ///
    /// Fire-and-forget; nothing is returned to the controller.
    pub trait Notifier: Send + Sync {
        /// Show a transient message to the user
        fn notify(&self, message: &str, duration: NoticeDuration);

        /// Signal that the backend reported an expired session (status 401)
        ///
        /// The controller only records the error; acting on the session is
        /// left to the host.
        fn session_expired(&self) {}
    }

    /// Notifier that drops every notice
    ///
    /// For hosts without a notification surface.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SilentNotifier;

    impl Notifier for SilentNotifier {
        fn notify(&self, message: &str, duration: NoticeDuration) {
            tracing::trace!(message, ?duration, "Notice dropped by SilentNotifier");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[tokio::test]
    async fn effect_future_yields_action() {
        assert!(Effect::<u8>::None.is_none());
        assert!(Effect::<u8>::None.into_future().is_none());

        let effect: Effect<u8> = Effect::Future(Box::pin(async { Some(3) }));
        assert!(!effect.is_none());
        assert_eq!(format!("{effect:?}"), "Effect::Future(..)");

        let output = match effect.into_future() {
            Some(future) => future.await,
            None => None,
        };
        assert_eq!(output, Some(3));
    }

    #[test]
    fn notice_duration_parses() {
        use super::environment::NoticeDuration;

        assert_eq!("SHORT".parse::<NoticeDuration>(), Ok(NoticeDuration::Short));
        assert_eq!(NoticeDuration::default().to_string(), "long");
        assert!("forever".parse::<NoticeDuration>().is_err());
    }
}
