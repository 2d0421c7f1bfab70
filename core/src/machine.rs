//! The fetch state machine as a reducer.

use crate::action::{FetchAction, TaggedAction};
use crate::effect::Effect;
use crate::error::FetchError;
use crate::reducer::Reducer;
use crate::state::FetchState;
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use std::marker::PhantomData;

/// Reducer over [`FetchState`]
///
/// A pure state machine: every action is applied through
/// [`FetchState::apply`] and no effects are produced.
#[derive(Debug)]
pub struct FetchMachine<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> FetchMachine<T> {
    /// Create a new fetch machine
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }

    /// Decode a tagged action and apply it
    ///
    /// The state is left untouched when decoding fails.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnhandledAction`] for unknown action types and
    /// [`FetchError::InvalidPayload`] for payloads that do not fit the action.
    pub fn apply_tagged(
        &self,
        state: &mut FetchState<T>,
        tagged: TaggedAction,
    ) -> Result<(), FetchError>
    where
        T: DeserializeOwned,
    {
        let action = tagged.decode::<T>().inspect_err(|error| {
            tracing::error!(error = %error, "Rejected tagged action");
        })?;
        state.apply(action);
        Ok(())
    }
}

impl<T> Clone for FetchMachine<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FetchMachine<T> {}

impl<T> Default for FetchMachine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Reducer for FetchMachine<T> {
    type State = FetchState<T>;
    type Action = FetchAction<T>;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        tracing::debug!(action = action.action_type(), "Applying fetch transition");
        state.apply(action);
        SmallVec::new()
    }
}
