//! Actions accepted by the fetch state machine.
//!
//! [`FetchAction`] is the closed set of events. Hosts that hand actions
//! over as data (a UI bridge, a replay log) use [`TaggedAction`], whose
//! `type` tag is checked on the way in: an unknown tag is a programmer
//! error and is rejected with [`FetchError::UnhandledAction`] instead of
//! being ignored.

use crate::error::{FALLBACK_MESSAGE, FetchError};
use composable_fetch_macros::Action;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events of the fetch lifecycle
///
/// `Begin`/`BeginRefetch` start an attempt, `Success`/`Error` conclude
/// one (terminal events), and `SetData`/`SetError` are manual overrides
/// applied by the host without a network call.
#[derive(Action, Clone, Debug, PartialEq, Eq)]
pub enum FetchAction<T> {
    /// A foreground load starts
    #[begin]
    Begin,

    /// A background reload starts; current data stays visible
    #[begin]
    BeginRefetch,

    /// The operation succeeded; `None` when the response carried no payload
    #[terminal]
    Success(Option<T>),

    /// The operation failed with this user-facing message
    #[terminal]
    Error(String),

    /// The host injects data directly
    #[manual]
    SetData(T),

    /// The host injects an error directly
    #[manual]
    SetError(String),
}

/// Wire form of a [`FetchAction`]
///
/// ```
/// use composable_fetch_core::{FetchAction, FetchError, TaggedAction};
/// use serde_json::json;
///
/// let tagged: TaggedAction = serde_json::from_value(json!({
///     "type": "success",
///     "payload": 42
/// })).unwrap();
/// assert_eq!(tagged.decode::<i64>(), Ok(FetchAction::Success(Some(42))));
///
/// let unknown = TaggedAction::new("load_more", None);
/// assert_eq!(
///     unknown.decode::<i64>(),
///     Err(FetchError::UnhandledAction("load_more".to_string()))
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaggedAction {
    /// Wire name of the action
    #[serde(rename = "type")]
    pub action_type: String,
    /// Optional payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl TaggedAction {
    /// Create a tagged action
    #[must_use]
    pub fn new(action_type: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
        }
    }

    /// Decode into a [`FetchAction`]
    ///
    /// # Errors
    ///
    /// - [`FetchError::UnhandledAction`] when the tag is not one of the six known names
    /// - [`FetchError::InvalidPayload`] when a data-carrying action has a payload
    ///   that does not decode into `T`, or an error-carrying action has a
    ///   non-string payload
    pub fn decode<T: DeserializeOwned>(self) -> Result<FetchAction<T>, FetchError> {
        match self.action_type.as_str() {
            "begin" => Ok(FetchAction::Begin),
            "begin_refetch" => Ok(FetchAction::BeginRefetch),
            "success" => decode_optional("success", self.payload).map(FetchAction::Success),
            "set_data" => decode_data("set_data", self.payload).map(FetchAction::SetData),
            "error" => decode_message("error", self.payload).map(FetchAction::Error),
            "set_error" => decode_message("set_error", self.payload).map(FetchAction::SetError),
            _ => Err(FetchError::UnhandledAction(self.action_type)),
        }
    }
}

impl<T> TryFrom<TaggedAction> for FetchAction<T>
where
    T: DeserializeOwned,
{
    type Error = FetchError;

    fn try_from(tagged: TaggedAction) -> Result<Self, FetchError> {
        tagged.decode()
    }
}

impl<T: Serialize> FetchAction<T> {
    /// Encode into the wire form
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] if the payload cannot be serialized.
    pub fn to_tagged(&self) -> Result<TaggedAction, FetchError> {
        let payload = match self {
            Self::Begin | Self::BeginRefetch => None,
            Self::Success(None) => None,
            Self::Success(Some(data)) | Self::SetData(data) => Some(serde_json::to_value(data)?),
            Self::Error(message) | Self::SetError(message) => {
                Some(Value::String(message.clone()))
            },
        };
        Ok(TaggedAction::new(self.action_type(), payload))
    }
}

fn decode_data<T: DeserializeOwned>(
    action_type: &'static str,
    payload: Option<Value>,
) -> Result<T, FetchError> {
    serde_json::from_value(payload.unwrap_or(Value::Null)).map_err(|error| {
        FetchError::InvalidPayload {
            action_type,
            reason: error.to_string(),
        }
    })
}

fn decode_optional<T: DeserializeOwned>(
    action_type: &'static str,
    payload: Option<Value>,
) -> Result<Option<T>, FetchError> {
    match payload {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode_data(action_type, Some(value)).map(Some),
    }
}

fn decode_message(action_type: &'static str, payload: Option<Value>) -> Result<String, FetchError> {
    match payload {
        None | Some(Value::Null) => Ok(FALLBACK_MESSAGE.to_string()),
        Some(Value::String(message)) => Ok(message),
        Some(other) => Err(FetchError::InvalidPayload {
            action_type,
            reason: format!("expected a string message, found {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_helpers() {
        assert!(FetchAction::<u8>::Begin.is_begin());
        assert!(FetchAction::<u8>::BeginRefetch.is_begin());
        assert!(FetchAction::Success(Some(1_u8)).is_terminal());
        assert!(FetchAction::<u8>::Error(String::new()).is_terminal());
        assert!(FetchAction::SetData(1_u8).is_manual());
        assert!(FetchAction::<u8>::SetError(String::new()).is_manual());
    }

    #[test]
    fn decode_known_types() {
        let cases = [
            (TaggedAction::new("begin", None), FetchAction::Begin),
            (TaggedAction::new("begin_refetch", None), FetchAction::BeginRefetch),
            (TaggedAction::new("success", Some(json!(5))), FetchAction::Success(Some(5))),
            (TaggedAction::new("success", None), FetchAction::Success(None)),
            (TaggedAction::new("set_data", Some(json!(6))), FetchAction::SetData(6)),
            (
                TaggedAction::new("error", Some(json!("bad"))),
                FetchAction::Error("bad".to_string()),
            ),
            (
                TaggedAction::new("set_error", Some(json!("manual"))),
                FetchAction::SetError("manual".to_string()),
            ),
        ];

        for (tagged, expected) in cases {
            assert_eq!(tagged.decode::<i32>(), Ok(expected));
        }
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let result = TaggedAction::new("ALTER_DATA", Some(json!(1))).decode::<i32>();
        assert_eq!(result, Err(FetchError::UnhandledAction("ALTER_DATA".to_string())));
    }

    #[test]
    fn decode_rejects_mismatched_payload() {
        let result = TaggedAction::new("success", Some(json!("text"))).decode::<i32>();
        assert!(matches!(
            result,
            Err(FetchError::InvalidPayload {
                action_type: "success",
                ..
            })
        ));

        let result = TaggedAction::new("error", Some(json!({ "code": 1 }))).decode::<i32>();
        assert!(matches!(result, Err(FetchError::InvalidPayload { .. })));
    }

    #[test]
    fn error_without_payload_uses_fallback() {
        let result = TaggedAction::new("error", None).decode::<i32>();
        assert_eq!(result, Ok(FetchAction::Error(FALLBACK_MESSAGE.to_string())));
    }

    #[test]
    fn tagged_round_trip_through_json() {
        let action = FetchAction::SetData(vec!["a".to_string()]);
        let Ok(tagged) = action.to_tagged() else {
            unreachable!("strings always serialize");
        };
        let text = serde_json::to_string(&tagged).unwrap_or_default();
        assert_eq!(text, r#"{"type":"set_data","payload":["a"]}"#);
    }
}
