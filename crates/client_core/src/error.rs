use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("{0}")]
    Application(String),
    #[error("{0}")]
    Precondition(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowErrorKind {
    Transport,
    Decode,
    Application,
    Precondition,
}

impl FlowError {
    pub fn kind(&self) -> FlowErrorKind {
        match self {
            FlowError::Transport(_) => FlowErrorKind::Transport,
            FlowError::Decode(_) => FlowErrorKind::Decode,
            FlowError::Application(_) => FlowErrorKind::Application,
            FlowError::Precondition(_) => FlowErrorKind::Precondition,
        }
    }

    /// Text for the user. Transport and decode details stay in the logs.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FlowError::Transport(_) | FlowError::Decode(_) => fallback.to_string(),
            FlowError::Application(message) | FlowError::Precondition(message) => {
                if message.trim().is_empty() {
                    fallback.to_string()
                } else {
                    message.clone()
                }
            }
        }
    }
}

impl From<reqwest::Error> for FlowError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FlowError::Decode(err.to_string())
        } else {
            FlowError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Decode(err.to_string())
    }
}
