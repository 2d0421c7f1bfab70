//! Fetch lifecycle state
//!
//! [`FetchState`] is the value the rendering layer reads. It is created
//! once per controller with caller-supplied seed values and is only ever
//! changed through [`FetchState::apply`].

use crate::action::FetchAction;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a fetch
///
/// The lifecycle is an implicit combination of the four fields rather
/// than an enum:
///
/// | data | loading | error | refetching | meaning |
/// |---|---|---|---|---|
/// | `None` | `false` | `None` | `false` | not started |
/// | any | `true` | `None` | `false` | loading |
/// | any | `false` | `None` | `true` | refetching with data visible |
/// | `Some` | `false` | `None` | `false` | success |
/// | any | `false` | `Some` | `false` | error |
///
/// `loading` and `refetching` are never both true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchState<T> {
    /// Last successful (or manually injected) payload
    pub data: Option<T>,
    /// A foreground load is in progress
    pub loading: bool,
    /// User-facing error message of the last failed attempt
    pub error: Option<String>,
    /// A background reload is in progress
    pub refetching: bool,
}

impl<T> FetchState<T> {
    /// Create a state seeded with the controller's initial values
    #[must_use]
    pub const fn new(initial_data: Option<T>, initial_loading: bool) -> Self {
        Self {
            data: initial_data,
            loading: initial_loading,
            error: None,
            refetching: false,
        }
    }

    /// Apply one transition
    ///
    /// | Action | Effect |
    /// |---|---|
    /// | `Begin` | `loading`, clears `refetching` and `error` |
    /// | `BeginRefetch` | `refetching`, clears `loading` and `error` |
    /// | `Success` | replaces `data` (clearing it for an empty payload), clears `error` and both flags |
    /// | `Error` | sets `error`, clears both flags |
    /// | `SetData` | replaces `data`, clears both flags |
    /// | `SetError` | sets `error`, clears both flags |
    pub fn apply(&mut self, action: FetchAction<T>) {
        match action {
            FetchAction::Begin => {
                self.loading = true;
                self.refetching = false;
                self.error = None;
            },
            FetchAction::BeginRefetch => {
                self.refetching = true;
                self.loading = false;
                self.error = None;
            },
            FetchAction::Success(payload) => {
                self.settle();
                self.data = payload;
                self.error = None;
            },
            FetchAction::Error(message) | FetchAction::SetError(message) => {
                self.settle();
                self.error = Some(message);
            },
            FetchAction::SetData(payload) => {
                self.settle();
                self.data = Some(payload);
            },
        }
    }

    /// Consume the state and return it with one transition applied
    #[must_use]
    pub fn applied(mut self, action: FetchAction<T>) -> Self {
        self.apply(action);
        self
    }

    /// True while any attempt (foreground or background) is in flight
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.loading || self.refetching
    }

    /// True when nothing has been loaded, attempted or injected yet
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.data.is_none() && self.error.is_none() && !self.is_busy()
    }

    /// True when the latest attempt ended in an error
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Checks the `loading`/`refetching` exclusivity invariant
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !(self.loading && self.refetching)
    }

    const fn settle(&mut self) {
        self.loading = false;
        self.refetching = false;
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::new(None, false)
    }
}
