//! Controller reducer: triggers, activations and response handling.
//!
//! [`ControllerReducer`] wraps the fetch state machine with everything
//! that involves the outside world. A trigger stamps a request id, may
//! apply `Begin`, and returns an effect that calls the
//! [`Operation`](crate::environment::Operation), classifies the response
//! and feeds a [`ControllerAction::Completed`] back into the store. An
//! activation compares the host's dependency list with the retained
//! snapshot and triggers a reload when it changed.

use crate::action::FetchAction;
use crate::async_effect;
use crate::dependencies::DependencySnapshot;
use crate::effect::Effect;
use crate::environment::{NoticeDuration, Notifier, Operation};
use crate::error::{FetchError, OperationError};
use crate::reducer::Reducer;
use crate::response::{self, Outcome, Response, UnknownStatusPolicy};
use crate::state::FetchState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Shapes the raw response body into the state's data type
pub type Transform<T> = Arc<dyn Fn(Option<Value>) -> Result<T, FetchError> + Send + Sync>;

/// How terminal events of overlapping requests are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaleResponsePolicy {
    /// Only the latest issued request may settle the state
    #[default]
    DropStale,
    /// Every response is applied; the last one to settle wins
    LastSettledWins,
}

impl fmt::Display for StaleResponsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropStale => write!(f, "drop-stale"),
            Self::LastSettledWins => write!(f, "last-settled-wins"),
        }
    }
}

impl FromStr for StaleResponsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop-stale" => Ok(Self::DropStale),
            "last-settled-wins" => Ok(Self::LastSettledWins),
            other => Err(format!(
                "unknown stale response policy `{other}` (expected drop-stale|last-settled-wins)"
            )),
        }
    }
}

/// Per-controller configuration
///
/// ```
/// use composable_fetch_core::{FetchConfig, deps};
/// use serde_json::json;
///
/// let config = FetchConfig::<u64>::new()
///     .default_params(vec![json!("user-1")])
///     .run_on_activation(true)
///     .initial_loading(true)
///     .dependencies(deps!["user-1"]);
///
/// let state = config.initial_state();
/// assert!(state.fetch.loading);
/// ```
pub struct FetchConfig<T> {
    default_params: Vec<Value>,
    transform: Option<Transform<T>>,
    run_on_activation: bool,
    show_loader_on_activation: bool,
    initial_loading: bool,
    initial_data: Option<T>,
    dependencies: DependencySnapshot,
    unknown_status: UnknownStatusPolicy,
    stale_responses: StaleResponsePolicy,
    notice_duration: NoticeDuration,
}

impl<T> FetchConfig<T> {
    /// Configuration with no parameters, no transform and no automatic run
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_params: Vec::new(),
            transform: None,
            run_on_activation: false,
            show_loader_on_activation: false,
            initial_loading: false,
            initial_data: None,
            dependencies: DependencySnapshot::empty(),
            unknown_status: UnknownStatusPolicy::default(),
            stale_responses: StaleResponsePolicy::default(),
            notice_duration: NoticeDuration::default(),
        }
    }

    /// Parameters used when a trigger supplies none
    #[must_use]
    pub fn default_params(mut self, params: Vec<Value>) -> Self {
        self.default_params = params;
        self
    }

    /// Shape successful response bodies with `transform`
    #[must_use]
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Option<Value>) -> Result<T, FetchError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Invoke the operation on the first activation
    #[must_use]
    pub const fn run_on_activation(mut self, run: bool) -> Self {
        self.run_on_activation = run;
        self
    }

    /// Apply `Begin` for the run on first activation
    #[must_use]
    pub const fn show_loader_on_activation(mut self, show: bool) -> Self {
        self.show_loader_on_activation = show;
        self
    }

    /// Seed value of `loading`
    #[must_use]
    pub const fn initial_loading(mut self, loading: bool) -> Self {
        self.initial_loading = loading;
        self
    }

    /// Seed value of `data`
    #[must_use]
    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Dependency list the retained snapshot starts from
    #[must_use]
    pub fn dependencies(mut self, dependencies: DependencySnapshot) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Handling of statuses outside the classification table
    #[must_use]
    pub const fn unknown_status(mut self, policy: UnknownStatusPolicy) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Reconciliation of overlapping requests
    #[must_use]
    pub const fn stale_responses(mut self, policy: StaleResponsePolicy) -> Self {
        self.stale_responses = policy;
        self
    }

    /// How long error notices stay visible
    #[must_use]
    pub const fn notice_duration(mut self, duration: NoticeDuration) -> Self {
        self.notice_duration = duration;
        self
    }

    /// Configured default parameters
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.default_params
    }

    /// Configured transform, if any
    #[must_use]
    pub const fn configured_transform(&self) -> Option<&Transform<T>> {
        self.transform.as_ref()
    }

    /// Configured unknown status policy
    #[must_use]
    pub const fn unknown_status_policy(&self) -> UnknownStatusPolicy {
        self.unknown_status
    }

    /// Configured stale response policy
    #[must_use]
    pub const fn stale_response_policy(&self) -> StaleResponsePolicy {
        self.stale_responses
    }

    /// Configured notice duration
    #[must_use]
    pub const fn configured_notice_duration(&self) -> NoticeDuration {
        self.notice_duration
    }

    /// State a controller built from this configuration starts in
    #[must_use]
    pub fn initial_state(&self) -> ControllerState<T>
    where
        T: Clone,
    {
        ControllerState {
            fetch: FetchState::new(self.initial_data.clone(), self.initial_loading),
            dependencies: self.dependencies.clone(),
            latest_request: None,
            activated: false,
            torn_down: false,
        }
    }
}

impl<T> Default for FetchConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for FetchConfig<T> {
    fn clone(&self) -> Self {
        Self {
            default_params: self.default_params.clone(),
            transform: self.transform.clone(),
            run_on_activation: self.run_on_activation,
            show_loader_on_activation: self.show_loader_on_activation,
            initial_loading: self.initial_loading,
            initial_data: self.initial_data.clone(),
            dependencies: self.dependencies.clone(),
            unknown_status: self.unknown_status,
            stale_responses: self.stale_responses,
            notice_duration: self.notice_duration,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FetchConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("default_params", &self.default_params)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("run_on_activation", &self.run_on_activation)
            .field("show_loader_on_activation", &self.show_loader_on_activation)
            .field("initial_loading", &self.initial_loading)
            .field("initial_data", &self.initial_data)
            .field("dependencies", &self.dependencies)
            .field("unknown_status", &self.unknown_status)
            .field("stale_responses", &self.stale_responses)
            .field("notice_duration", &self.notice_duration)
            .finish()
    }
}

/// State owned by one controller instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState<T> {
    /// What the rendering layer reads
    pub fetch: FetchState<T>,
    /// Dependency list captured at the end of the last activation
    pub dependencies: DependencySnapshot,
    /// Id of the most recently issued request
    pub latest_request: Option<u64>,
    /// The host has activated the controller at least once
    pub activated: bool,
    /// The host tore the controller down; nothing is applied any more
    pub torn_down: bool,
}

impl<T> ControllerState<T> {
    /// Stamp a new request and mark it as the latest
    fn issue_request(&mut self) -> u64 {
        let id = self.latest_request.map_or(0, |latest| latest.wrapping_add(1));
        self.latest_request = Some(id);
        id
    }

    /// True when `request_id` is the most recently issued request
    #[must_use]
    pub fn is_latest(&self, request_id: u64) -> bool {
        self.latest_request == Some(request_id)
    }
}

impl<T: Clone> From<&FetchConfig<T>> for ControllerState<T> {
    fn from(config: &FetchConfig<T>) -> Self {
        config.initial_state()
    }
}

/// Options of a single trigger
pub struct TriggerRequest<T> {
    /// Apply `Begin` before the call
    pub show_loader: bool,
    /// Parameters overriding the configured defaults
    pub params: Option<Vec<Value>>,
    /// Transform overriding the configured one
    pub transform: Option<Transform<T>>,
}

impl<T> TriggerRequest<T> {
    /// A trigger that applies `Begin` and uses the configured parameters
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            show_loader: true,
            params: None,
            transform: None,
        }
    }

    /// A trigger that leaves the loading flags alone
    ///
    /// This is also the [`Default`].
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            show_loader: false,
            params: None,
            transform: None,
        }
    }

    /// Set whether `Begin` is applied
    #[must_use]
    pub const fn show_loader(mut self, show: bool) -> Self {
        self.show_loader = show;
        self
    }

    /// Override the parameters
    #[must_use]
    pub fn params(mut self, params: Vec<Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Override the transform
    #[must_use]
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Option<Value>) -> Result<T, FetchError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }
}

impl<T> Default for TriggerRequest<T> {
    fn default() -> Self {
        Self::silent()
    }
}

impl<T> Clone for TriggerRequest<T> {
    fn clone(&self) -> Self {
        Self {
            show_loader: self.show_loader,
            params: self.params.clone(),
            transform: self.transform.clone(),
        }
    }
}

impl<T> fmt::Debug for TriggerRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRequest")
            .field("show_loader", &self.show_loader)
            .field("params", &self.params)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Actions accepted by [`ControllerReducer`]
#[derive(Debug, Clone)]
pub enum ControllerAction<T> {
    /// One host activation cycle with the current dependency values
    Activate {
        /// Dependency values of this cycle
        dependencies: DependencySnapshot,
    },
    /// Invoke the operation
    Trigger(TriggerRequest<T>),
    /// Apply `BeginRefetch` and invoke the operation without the loader
    Refetch,
    /// A request settled (produced by the trigger effect)
    Completed {
        /// Id stamped when the request was issued
        request_id: u64,
        /// Terminal event derived from the response
        action: FetchAction<T>,
    },
    /// Apply a state machine event directly (manual overrides)
    Machine(FetchAction<T>),
    /// The host is done with the controller
    Teardown,
}

impl<T> ControllerAction<T> {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Activate { .. } => "activate",
            Self::Trigger(_) => "trigger",
            Self::Refetch => "refetch",
            Self::Completed { .. } => "completed",
            Self::Machine(_) => "machine",
            Self::Teardown => "teardown",
        }
    }
}

/// Collaborators of the controller reducer
pub struct FetchEnvironment<T> {
    /// The external call
    pub operation: Arc<dyn Operation>,
    /// The notice side channel
    pub notifier: Arc<dyn Notifier>,
    /// Controller configuration
    pub config: Arc<FetchConfig<T>>,
}

impl<T> FetchEnvironment<T> {
    /// Bundle the collaborators
    #[must_use]
    pub fn new(
        operation: Arc<dyn Operation>,
        notifier: Arc<dyn Notifier>,
        config: Arc<FetchConfig<T>>,
    ) -> Self {
        Self {
            operation,
            notifier,
            config,
        }
    }
}

impl<T> Clone for FetchEnvironment<T> {
    fn clone(&self) -> Self {
        Self {
            operation: Arc::clone(&self.operation),
            notifier: Arc::clone(&self.notifier),
            config: Arc::clone(&self.config),
        }
    }
}

/// Reducer driving one fetch controller
#[derive(Debug)]
pub struct ControllerReducer<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> ControllerReducer<T> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Clone for ControllerReducer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ControllerReducer<T> {}

impl<T> Default for ControllerReducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ControllerReducer<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn trigger(
        state: &mut ControllerState<T>,
        request: TriggerRequest<T>,
        env: &FetchEnvironment<T>,
    ) -> Effect<ControllerAction<T>> {
        let request_id = state.issue_request();
        if request.show_loader {
            state.fetch.apply(FetchAction::Begin);
        }

        let config = &env.config;
        let params = request
            .params
            .unwrap_or_else(|| config.default_params.clone());
        let transform = request.transform.or_else(|| config.transform.clone());
        let unknown_status = config.unknown_status;
        let notice_duration = config.notice_duration;
        let operation = Arc::clone(&env.operation);
        let notifier = Arc::clone(&env.notifier);

        tracing::debug!(
            request_id,
            show_loader = request.show_loader,
            param_count = params.len(),
            "Issuing request"
        );
        metrics::counter!("fetch.trigger.total").increment(1);

        async_effect! {
            let started = Instant::now();
            let result = operation.call(params).await;
            metrics::histogram!("fetch.operation.duration_seconds")
                .record(started.elapsed().as_secs_f64());

            settle(
                result,
                transform.as_ref(),
                unknown_status,
                notice_duration,
                notifier.as_ref(),
            )
            .map(|action| ControllerAction::Completed { request_id, action })
        }
    }
}

impl<T> Reducer for ControllerReducer<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type State = ControllerState<T>;
    type Action = ControllerAction<T>;
    type Environment = FetchEnvironment<T>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if state.torn_down {
            tracing::debug!(action = action.name(), "Controller torn down; action discarded");
            return SmallVec::new();
        }

        match action {
            ControllerAction::Activate { dependencies } => {
                let mut effects = SmallVec::new();

                if !state.activated {
                    state.activated = true;
                    if env.config.run_on_activation {
                        let request = TriggerRequest::silent()
                            .show_loader(env.config.show_loader_on_activation);
                        effects.push(Self::trigger(state, request, env));
                    }
                }

                if state.dependencies.changed(&dependencies) {
                    tracing::debug!(
                        previous = ?state.dependencies,
                        current = ?dependencies,
                        "Dependencies changed"
                    );
                    state.fetch.apply(FetchAction::Begin);
                    effects.push(Self::trigger(state, TriggerRequest::silent(), env));
                }

                state.dependencies = dependencies;
                effects
            },

            ControllerAction::Trigger(request) => smallvec![Self::trigger(state, request, env)],

            ControllerAction::Refetch => {
                state.fetch.apply(FetchAction::BeginRefetch);
                smallvec![Self::trigger(state, TriggerRequest::silent(), env)]
            },

            ControllerAction::Completed { request_id, action } => {
                if env.config.stale_responses == StaleResponsePolicy::DropStale
                    && !state.is_latest(request_id)
                {
                    tracing::warn!(
                        request_id,
                        latest = ?state.latest_request,
                        "Dropping stale response"
                    );
                    metrics::counter!("fetch.response.stale").increment(1);
                    return SmallVec::new();
                }

                tracing::debug!(
                    request_id,
                    action = action.action_type(),
                    "Applying response"
                );
                state.fetch.apply(action);
                SmallVec::new()
            },

            ControllerAction::Machine(action) => {
                tracing::debug!(action = action.action_type(), "Applying manual transition");
                state.fetch.apply(action);
                SmallVec::new()
            },

            ControllerAction::Teardown => {
                tracing::debug!(latest = ?state.latest_request, "Tearing down controller");
                state.torn_down = true;
                SmallVec::new()
            },
        }
    }
}

/// Turn the result of an operation call into the terminal event to apply
///
/// Notices and the session-expired signal are fired here, once per
/// response. Returns `None` when the response is ignored.
pub fn settle<T: DeserializeOwned>(
    result: Result<Response, OperationError>,
    transform: Option<&Transform<T>>,
    unknown_status: UnknownStatusPolicy,
    notice_duration: NoticeDuration,
    notifier: &dyn Notifier,
) -> Option<FetchAction<T>> {
    let response = match result {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(error = %error, "Operation failed");
            metrics::counter!("fetch.response.total", "outcome" => "operation_error").increment(1);
            return Some(FetchAction::Error(error.user_message().to_string()));
        },
    };

    let status_code = response.status_code;
    let outcome = response::classify(response, unknown_status);
    metrics::counter!("fetch.response.total", "outcome" => outcome.label()).increment(1);

    match outcome {
        Outcome::Success(data) => {
            // An absent or null value is still a success, with no payload.
            let payload = match transform {
                Some(transform) => transform(data).map(Some),
                None => response::value_field(data)
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(FetchError::from),
            };
            match payload {
                Ok(payload) => Some(FetchAction::Success(payload)),
                Err(error) => {
                    tracing::warn!(error = %error, "Success payload could not be shaped");
                    Some(FetchAction::Error(error.to_string()))
                },
            }
        },
        Outcome::Failure {
            message,
            notices,
            session_expired,
        } => {
            tracing::warn!(?status_code, %message, "Request failed");
            for notice in &notices {
                notifier.notify(notice, notice_duration);
            }
            if session_expired {
                notifier.session_expired();
            }
            Some(FetchAction::Error(message))
        },
        Outcome::Ignored { status_code } => {
            tracing::warn!(?status_code, "Ignoring response with unrecognized status");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps;
    use crate::environment::SilentNotifier;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Notices {
        shown: Mutex<Vec<(String, NoticeDuration)>>,
        expired: Mutex<usize>,
    }

    impl Notifier for Notices {
        fn notify(&self, message: &str, duration: NoticeDuration) {
            if let Ok(mut shown) = self.shown.lock() {
                shown.push((message.to_string(), duration));
            }
        }

        fn session_expired(&self) {
            if let Ok(mut expired) = self.expired.lock() {
                *expired += 1;
            }
        }
    }

    fn env(config: FetchConfig<i64>) -> FetchEnvironment<i64> {
        let operation =
            |_params: Vec<Value>| async { Ok::<_, OperationError>(Response::ok(json!({ "value": 1 }))) };
        FetchEnvironment::new(Arc::new(operation), Arc::new(SilentNotifier), Arc::new(config))
    }

    #[test]
    fn settle_success_reads_value_field() {
        let action = settle::<i64>(
            Ok(Response::ok(json!({ "value": 42 }))),
            None,
            UnknownStatusPolicy::Fail,
            NoticeDuration::Long,
            &SilentNotifier,
        );
        assert_eq!(action, Some(FetchAction::Success(Some(42))));
    }

    #[test]
    fn settle_success_without_value_has_no_payload() {
        for body in [json!({}), json!({ "other": 1 }), json!({ "value": null })] {
            let action = settle::<i64>(
                Ok(Response::ok(body)),
                None,
                UnknownStatusPolicy::Fail,
                NoticeDuration::Long,
                &SilentNotifier,
            );
            assert_eq!(action, Some(FetchAction::Success(None)));
        }
    }

    #[test]
    fn settle_success_prefers_transform() {
        let transform: Transform<i64> = Arc::new(|data: Option<Value>| {
            let count = data
                .as_ref()
                .and_then(|data| data.get("items"))
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            Ok(i64::try_from(count).unwrap_or(i64::MAX))
        });
        let action = settle(
            Ok(Response::with_status(201).data(json!({ "items": [1, 2, 3] }))),
            Some(&transform),
            UnknownStatusPolicy::Fail,
            NoticeDuration::Long,
            &SilentNotifier,
        );
        assert_eq!(action, Some(FetchAction::Success(Some(3))));
    }

    #[test]
    fn settle_decode_failure_becomes_error() {
        let action = settle::<i64>(
            Ok(Response::ok(json!({ "value": "not a number" }))),
            None,
            UnknownStatusPolicy::Fail,
            NoticeDuration::Long,
            &SilentNotifier,
        );
        assert!(matches!(action, Some(FetchAction::Error(ref message)) if message.starts_with("Failed to decode")));
    }

    #[test]
    fn settle_fires_notices_and_session_signal() {
        let notices = Notices::default();

        let action = settle::<i64>(
            Ok(Response::with_status(404).data(json!({ "msg": "x", "description": "y" }))),
            None,
            UnknownStatusPolicy::Fail,
            NoticeDuration::Short,
            &notices,
        );
        assert_eq!(action, Some(FetchAction::Error("x".to_string())));

        let action = settle::<i64>(
            Ok(Response::with_status(401).message("expired")),
            None,
            UnknownStatusPolicy::Fail,
            NoticeDuration::Short,
            &notices,
        );
        assert_eq!(action, Some(FetchAction::Error("expired".to_string())));

        let shown = notices.shown.lock().map(|shown| shown.clone()).unwrap_or_default();
        assert_eq!(
            shown,
            vec![
                ("x".to_string(), NoticeDuration::Short),
                ("y".to_string(), NoticeDuration::Short),
            ]
        );
        assert_eq!(notices.expired.lock().map(|count| *count).unwrap_or_default(), 1);
    }

    #[test]
    fn settle_operation_error_uses_fallback() {
        let action = settle::<i64>(
            Err(OperationError::without_message()),
            None,
            UnknownStatusPolicy::Fail,
            NoticeDuration::Long,
            &SilentNotifier,
        );
        assert_eq!(action, Some(FetchAction::Error(crate::FALLBACK_MESSAGE.to_string())));
    }

    #[test]
    fn settle_unknown_status_ignored() {
        let action = settle::<i64>(
            Ok(Response::with_status(204)),
            None,
            UnknownStatusPolicy::Ignore,
            NoticeDuration::Long,
            &SilentNotifier,
        );
        assert_eq!(action, None);
    }

    #[test]
    fn trigger_with_loader_applies_begin_and_returns_future() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new());
        let mut state = env.config.initial_state();

        let effects = reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::loading()), &env);

        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Future(_)));
        assert!(state.fetch.loading);
        assert_eq!(state.latest_request, Some(0));
    }

    #[test]
    fn default_trigger_is_silent() {
        let request = TriggerRequest::<i64>::default();
        assert!(!request.show_loader);
        assert!(request.params.is_none());
        assert!(TriggerRequest::<i64>::loading().show_loader);
    }

    #[test]
    fn silent_trigger_leaves_flags() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new());
        let mut state = env.config.initial_state();

        reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::silent()), &env);

        assert!(!state.fetch.loading);
        assert!(!state.fetch.refetching);
    }

    #[test]
    fn activation_with_unchanged_dependencies_does_not_fetch() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new().dependencies(deps![1]));
        let mut state = env.config.initial_state();

        let effects = reducer.reduce(
            &mut state,
            ControllerAction::Activate { dependencies: deps![1] },
            &env,
        );

        assert!(effects.is_empty());
        assert!(state.activated);
        assert_eq!(state.dependencies, deps![1]);
    }

    #[test]
    fn activation_with_changed_dependencies_begins_once() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new().dependencies(deps![1]));
        let mut state = env.config.initial_state();

        let effects = reducer.reduce(
            &mut state,
            ControllerAction::Activate { dependencies: deps![2] },
            &env,
        );

        assert_eq!(effects.len(), 1);
        assert!(state.fetch.loading);
        assert_eq!(state.dependencies, deps![2]);
        assert_eq!(state.latest_request, Some(0));
    }

    #[test]
    fn run_on_activation_only_fires_on_first_activation() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new().run_on_activation(true));
        let mut state = env.config.initial_state();

        let first = reducer.reduce(&mut state, ControllerAction::Activate { dependencies: deps![] }, &env);
        let second = reducer.reduce(&mut state, ControllerAction::Activate { dependencies: deps![] }, &env);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert!(!state.fetch.loading);
    }

    #[test]
    fn run_on_activation_can_show_loader() {
        let reducer = ControllerReducer::new();
        let env = env(
            FetchConfig::new()
                .run_on_activation(true)
                .show_loader_on_activation(true),
        );
        let mut state = env.config.initial_state();

        reducer.reduce(&mut state, ControllerAction::Activate { dependencies: deps![] }, &env);

        assert!(state.fetch.loading);
    }

    #[test]
    fn refetch_keeps_data_visible() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new().initial_data(5));
        let mut state = env.config.initial_state();

        let effects = reducer.reduce(&mut state, ControllerAction::Refetch, &env);

        assert_eq!(effects.len(), 1);
        assert!(state.fetch.refetching);
        assert!(!state.fetch.loading);
        assert_eq!(state.fetch.data, Some(5));
    }

    #[test]
    fn stale_completion_is_dropped() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new());
        let mut state = env.config.initial_state();
        reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::loading()), &env);
        reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::loading()), &env);

        reducer.reduce(
            &mut state,
            ControllerAction::Completed { request_id: 1, action: FetchAction::Success(Some(2)) },
            &env,
        );
        reducer.reduce(
            &mut state,
            ControllerAction::Completed { request_id: 0, action: FetchAction::Success(Some(1)) },
            &env,
        );

        assert_eq!(state.fetch.data, Some(2));
    }

    #[test]
    fn last_settled_wins_applies_every_completion() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new().stale_responses(StaleResponsePolicy::LastSettledWins));
        let mut state = env.config.initial_state();
        reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::loading()), &env);
        reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::loading()), &env);

        reducer.reduce(
            &mut state,
            ControllerAction::Completed { request_id: 1, action: FetchAction::Success(Some(2)) },
            &env,
        );
        reducer.reduce(
            &mut state,
            ControllerAction::Completed { request_id: 0, action: FetchAction::Success(Some(1)) },
            &env,
        );

        assert_eq!(state.fetch.data, Some(1));
    }

    #[test]
    fn teardown_discards_later_actions() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new());
        let mut state = env.config.initial_state();
        reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::loading()), &env);

        reducer.reduce(&mut state, ControllerAction::Teardown, &env);
        let effects = reducer.reduce(
            &mut state,
            ControllerAction::Completed { request_id: 0, action: FetchAction::Success(Some(9)) },
            &env,
        );

        assert!(effects.is_empty());
        assert!(state.fetch.loading);
        assert_eq!(state.fetch.data, None);
    }

    #[test]
    fn stale_policy_parses() {
        assert_eq!(
            "last-settled-wins".parse::<StaleResponsePolicy>(),
            Ok(StaleResponsePolicy::LastSettledWins)
        );
        assert!("newest".parse::<StaleResponsePolicy>().is_err());
        assert_eq!(StaleResponsePolicy::DropStale.to_string(), "drop-stale");
    }

    #[tokio::test]
    async fn trigger_effect_resolves_to_completion() {
        let reducer = ControllerReducer::new();
        let env = env(FetchConfig::new());
        let mut state = env.config.initial_state();

        let mut effects =
            reducer.reduce(&mut state, ControllerAction::Trigger(TriggerRequest::loading()), &env);
        let Some(Effect::Future(future)) = effects.pop() else {
            unreachable!("a trigger always produces one future");
        };

        let completion = future.await;
        assert!(matches!(
            completion,
            Some(ControllerAction::Completed { request_id: 0, action: FetchAction::Success(Some(1)) })
        ));
    }
}
