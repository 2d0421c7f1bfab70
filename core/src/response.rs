//! Response shape and the classification policy.
//!
//! A settled [`Response`] is turned into an [`Outcome`] before any state
//! changes: status 200/201 succeed, 401 fails and flags session expiry,
//! other statuses from 400 up fail with notices taken from `data.msg` and
//! `data.description`, and everything else is governed by
//! [`UnknownStatusPolicy`].

use crate::error::FALLBACK_MESSAGE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::num::FpCategory;
use std::str::FromStr;

/// Response produced by an operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Status code reported by the backend, if any
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Response body
    #[serde(default)]
    pub data: Option<Value>,
    /// Top-level message
    #[serde(default)]
    pub message: Option<String>,
}

impl Response {
    /// A response with the given status and nothing else
    #[must_use]
    pub const fn with_status(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            data: None,
            message: None,
        }
    }

    /// A 200 response carrying `data`
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self {
            status_code: Some(200),
            data: Some(data),
            message: None,
        }
    }

    /// Attach a body
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a top-level message
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// What to do with a status the policy does not recognize
/// (1xx, 3xx, 2xx other than 200/201, or no status at all)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownStatusPolicy {
    /// Record an error (`message`, or the fallback)
    #[default]
    Fail,
    /// Leave the state untouched
    Ignore,
}

impl fmt::Display for UnknownStatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for UnknownStatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("unknown status policy `{other}` (expected fail|ignore)")),
        }
    }
}

/// Classified response
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 200 or 201; carries the raw body
    Success(Option<Value>),
    /// A failure to record in the state
    Failure {
        /// User-facing message
        message: String,
        /// Transient notices to show, in order
        notices: Vec<String>,
        /// The backend reported an expired session (401)
        session_expired: bool,
    },
    /// Unknown status under [`UnknownStatusPolicy::Ignore`]
    Ignored {
        /// The status that was ignored
        status_code: Option<u16>,
    },
}

impl Outcome {
    /// Short label for logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure {
                session_expired: true,
                ..
            } => "session_expired",
            Self::Failure { .. } => "failure",
            Self::Ignored { .. } => "ignored",
        }
    }
}

/// Classify a settled response
///
/// ```
/// use composable_fetch_core::response::{classify, Outcome, Response, UnknownStatusPolicy};
/// use serde_json::json;
///
/// let outcome = classify(
///     Response::with_status(404).data(json!({ "msg": "x", "description": "y" })),
///     UnknownStatusPolicy::Fail,
/// );
/// assert_eq!(
///     outcome,
///     Outcome::Failure {
///         message: "x".to_string(),
///         notices: vec!["x".to_string(), "y".to_string()],
///         session_expired: false,
///     }
/// );
/// ```
#[must_use]
pub fn classify(response: Response, unknown: UnknownStatusPolicy) -> Outcome {
    match response.status_code {
        Some(200 | 201) => Outcome::Success(response.data),
        Some(401) => Outcome::Failure {
            message: non_empty(response.message),
            notices: Vec::new(),
            session_expired: true,
        },
        Some(status) if status >= 400 => {
            let body = response.data.as_ref();
            let msg = body.and_then(|data| text_field(data, "msg"));
            let description = body.and_then(|data| text_field(data, "description"));
            let notices = msg.iter().chain(description.iter()).cloned().collect();
            Outcome::Failure {
                message: msg.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
                notices,
                session_expired: false,
            }
        },
        status_code => match unknown {
            UnknownStatusPolicy::Fail => Outcome::Failure {
                message: non_empty(response.message),
                notices: Vec::new(),
                session_expired: false,
            },
            UnknownStatusPolicy::Ignore => Outcome::Ignored { status_code },
        },
    }
}

/// Extract `data.value`, the conventional location of the success payload
///
/// Returns `None` when the body is not an object or the field is absent or null.
#[must_use]
pub fn value_field(data: Option<Value>) -> Option<Value> {
    match data {
        Some(Value::Object(mut fields)) => fields.remove("value").filter(|value| !value.is_null()),
        _ => None,
    }
}

fn non_empty(message: Option<String>) -> String {
    message
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

/// Read a field as display text; absent, null, false, zero and empty values count as missing
fn text_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(number) if number.as_f64().is_some_and(|n| n.classify() == FpCategory::Zero) => {
            None
        },
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
