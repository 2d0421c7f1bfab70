//! # Composable Fetch Testing
//!
//! Testing utilities and helpers for Composable Fetch.
//!
//! This crate provides:
//! - Mock implementations of the environment traits ([`ScriptedOperation`],
//!   [`ManualOperation`], [`RecordingNotifier`])
//! - [`ReducerTest`], a Given-When-Then builder for reducers
//! - Effect assertions and an effect resolver
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use composable_fetch_core::{FetchAction, FetchMachine, FetchState};
//! use composable_fetch_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(FetchMachine::<u32>::new())
//!     .with_env(())
//!     .given_state(FetchState::default())
//!     .when_action(FetchAction::Begin)
//!     .then_state(|state| assert!(state.loading))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```


pub use mocks::{ManualOperation, RecordingNotifier, ScriptedOperation};
pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of the environment traits
pub mod mocks {
    use composable_fetch_core::{
        NoticeDuration, Notifier, Operation, OperationError, OperationFuture, Response, Value,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tokio::sync::{Notify, oneshot};

    type Settlement = Result<Response, OperationError>;

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Operation that answers from a queue of prepared results
    ///
    /// Every call pops the next result; once the queue is empty, calls fail
    /// with an [`OperationError`]. Parameters of every call are recorded.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_fetch_core::{Operation, Response};
    /// use composable_fetch_testing::ScriptedOperation;
    /// use serde_json::json;
    ///
    /// # tokio_test::block_on(async {
    /// let operation = ScriptedOperation::new().respond(Response::ok(json!({ "value": 1 })));
    /// let response = operation.call(vec![json!("a")]).await;
    /// assert_eq!(response.map(|r| r.status_code), Ok(Some(200)));
    /// assert_eq!(operation.calls(), vec![vec![json!("a")]]);
    /// # });
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedOperation {
        script: Arc<Mutex<VecDeque<Settlement>>>,
        calls: Arc<Mutex<Vec<Vec<Value>>>>,
    }

    impl ScriptedOperation {
        /// An operation with an empty script
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response
        #[must_use]
        pub fn respond(self, response: Response) -> Self {
            self.push(Ok(response));
            self
        }

        /// Queue a failure of the call itself
        #[must_use]
        pub fn fail(self, error: OperationError) -> Self {
            self.push(Err(error));
            self
        }

        /// Queue a result on a shared handle
        pub fn push(&self, result: Settlement) {
            lock(&self.script).push_back(result);
        }

        /// Parameters of every call so far, in call order
        #[must_use]
        pub fn calls(&self) -> Vec<Vec<Value>> {
            lock(&self.calls).clone()
        }

        /// Number of calls so far
        #[must_use]
        pub fn call_count(&self) -> usize {
            lock(&self.calls).len()
        }
    }

    impl Operation for ScriptedOperation {
        fn call(&self, params: Vec<Value>) -> OperationFuture {
            lock(&self.calls).push(params);
            let next = lock(&self.script).pop_front();
            Box::pin(async move {
                next.unwrap_or_else(|| Err(OperationError::new("no scripted response left")))
            })
        }
    }

    #[derive(Debug)]
    struct ManualCall {
        params: Vec<Value>,
        settle: Option<oneshot::Sender<Settlement>>,
    }

    /// Operation whose calls stay pending until the test settles them
    ///
    /// Used to settle overlapping requests in any order.
    #[derive(Debug, Clone, Default)]
    pub struct ManualOperation {
        calls: Arc<Mutex<Vec<ManualCall>>>,
        issued: Arc<Notify>,
    }

    impl ManualOperation {
        /// An operation with no calls yet
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of calls issued so far
        #[must_use]
        pub fn call_count(&self) -> usize {
            lock(&self.calls).len()
        }

        /// Parameters of every call so far, in call order
        #[must_use]
        pub fn calls(&self) -> Vec<Vec<Value>> {
            lock(&self.calls).iter().map(|call| call.params.clone()).collect()
        }

        /// Wait until at least `count` calls were issued
        pub async fn wait_for_calls(&self, count: usize) {
            loop {
                let issued = self.issued.notified();
                if self.call_count() >= count {
                    return;
                }
                issued.await;
            }
        }

        /// Settle call `index` (in call order) with `result`
        ///
        /// Returns `false` if there is no such call, it was already settled,
        /// or its caller is gone.
        pub fn settle(&self, index: usize, result: Settlement) -> bool {
            let sender = lock(&self.calls)
                .get_mut(index)
                .and_then(|call| call.settle.take());
            sender.is_some_and(|sender| sender.send(result).is_ok())
        }

        /// Settle call `index` with a response
        pub fn respond(&self, index: usize, response: Response) -> bool {
            self.settle(index, Ok(response))
        }
    }

    impl Operation for ManualOperation {
        fn call(&self, params: Vec<Value>) -> OperationFuture {
            let (tx, rx) = oneshot::channel();
            lock(&self.calls).push(ManualCall {
                params,
                settle: Some(tx),
            });
            self.issued.notify_waiters();

            Box::pin(async move {
                rx.await
                    .unwrap_or_else(|_| Err(OperationError::new("manual call was never settled")))
            })
        }
    }

    /// Notifier that records every notice and session-expired signal
    #[derive(Debug, Clone, Default)]
    pub struct RecordingNotifier {
        notices: Arc<Mutex<Vec<(String, NoticeDuration)>>>,
        expired: Arc<AtomicUsize>,
    }

    impl RecordingNotifier {
        /// A notifier with nothing recorded
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every notice with its duration, in order
        #[must_use]
        pub fn notices(&self) -> Vec<(String, NoticeDuration)> {
            lock(&self.notices).clone()
        }

        /// Notice texts, in order
        #[must_use]
        pub fn messages(&self) -> Vec<String> {
            lock(&self.notices)
                .iter()
                .map(|(message, _)| message.clone())
                .collect()
        }

        /// Number of session-expired signals
        #[must_use]
        pub fn session_expired_count(&self) -> usize {
            self.expired.load(Ordering::SeqCst)
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, duration: NoticeDuration) {
            lock(&self.notices).push((message.to_string(), duration));
        }

        fn session_expired(&self) {
            self.expired.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber (idempotent)
    ///
    /// Honors `RUST_LOG`; defaults to `warn`.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing strategies using proptest
pub mod properties {
    use composable_fetch_core::{FetchAction, FetchState, Response, Value};
    use proptest::prelude::*;

    /// Any of the six fetch actions, with payloads drawn from `data`
    pub fn fetch_action<T, S>(data: S) -> impl Strategy<Value = FetchAction<T>>
    where
        T: std::fmt::Debug + Clone,
        S: Strategy<Value = T> + Clone,
    {
        prop_oneof![
            Just(FetchAction::Begin),
            Just(FetchAction::BeginRefetch),
            prop::option::of(data.clone()).prop_map(FetchAction::Success),
            message().prop_map(FetchAction::Error),
            data.prop_map(FetchAction::SetData),
            message().prop_map(FetchAction::SetError),
        ]
    }

    /// Sequences of fetch actions over `i64` payloads
    pub fn action_sequence(max_len: usize) -> impl Strategy<Value = Vec<FetchAction<i64>>> {
        prop::collection::vec(fetch_action(any::<i64>()), 0..=max_len)
    }

    /// Any reachable-looking fetch state over `i64` payloads
    pub fn fetch_state() -> impl Strategy<Value = FetchState<i64>> {
        (
            proptest::option::of(any::<i64>()),
            any::<bool>(),
            proptest::option::of(message()),
        )
            .prop_map(|(data, loading, error)| FetchState {
                data,
                loading,
                error,
                refetching: false,
            })
    }

    /// Short user-facing messages
    pub fn message() -> impl Strategy<Value = String> {
        "[a-zA-Z ]{0,16}"
    }

    /// Any status code, including none
    pub fn status_code() -> impl Strategy<Value = Option<u16>> {
        proptest::option::of(prop_oneof![
            Just(200_u16),
            Just(201),
            Just(401),
            400_u16..600,
            100_u16..400,
        ])
    }

    /// Small JSON values
    pub fn json_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            message().prop_map(Value::String),
        ]
    }

    /// Responses with arbitrary status, body and message
    pub fn response() -> impl Strategy<Value = Response> {
        (
            status_code(),
            proptest::option::of((proptest::option::of(json_value()), proptest::option::of(json_value()))),
            proptest::option::of(message()),
        )
            .prop_map(|(status_code, body, message)| Response {
                status_code,
                data: body.map(|(msg, description)| {
                    let mut fields = serde_json::Map::new();
                    if let Some(msg) = msg {
                        fields.insert("msg".to_string(), msg);
                    }
                    if let Some(description) = description {
                        fields.insert("description".to_string(), description);
                    }
                    Value::Object(fields)
                }),
                message,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composable_fetch_core::{NoticeDuration, Notifier, Operation, OperationError, Response};
    use serde_json::json;

    #[tokio::test]
    async fn scripted_operation_replays_in_order() {
        let operation = ScriptedOperation::new()
            .respond(Response::with_status(201))
            .fail(OperationError::new("down"));

        let first = operation.call(vec![json!(1)]).await;
        let second = operation.call(vec![json!(2)]).await;
        let third = operation.call(vec![]).await;

        assert_eq!(first.map(|r| r.status_code), Ok(Some(201)));
        assert_eq!(second, Err(OperationError::new("down")));
        assert!(third.is_err());
        assert_eq!(operation.call_count(), 3);
    }

    #[tokio::test]
    async fn manual_operation_settles_out_of_order() {
        let operation = ManualOperation::new();

        let first = operation.call(vec![json!("a")]);
        let second = operation.call(vec![json!("b")]);
        operation.wait_for_calls(2).await;

        assert!(operation.respond(1, Response::with_status(200)));
        assert!(operation.settle(0, Err(OperationError::without_message())));
        assert!(!operation.respond(0, Response::with_status(200)));

        assert!(second.await.is_ok());
        assert!(first.await.is_err());
        assert_eq!(operation.calls(), vec![vec![json!("a")], vec![json!("b")]]);
    }

    #[test]
    fn recording_notifier_records() {
        let notifier = RecordingNotifier::new();
        notifier.notify("x", NoticeDuration::Short);
        notifier.session_expired();

        assert_eq!(notifier.messages(), vec!["x".to_string()]);
        assert_eq!(notifier.notices()[0].1, NoticeDuration::Short);
        assert_eq!(notifier.session_expired_count(), 1);
    }
}
