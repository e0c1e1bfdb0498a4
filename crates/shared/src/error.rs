use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

impl ApiErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Non-string values are rendered as compact JSON so they still reach the user.
    pub fn from_response(value: &Value) -> Option<Self> {
        match value.get("error")? {
            Value::Null => None,
            Value::String(message) => Some(Self::new(message.clone())),
            other => Some(Self::new(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown test kind '{0}', expected 'aptitude' or 'personality'")]
pub struct UnknownTestKind(pub String);
