use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::ApiErrorBody;
use url::Url;

use crate::error::FlowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(String);

impl ApiBase {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        let url =
            Url::parse(raw).map_err(|err| anyhow::anyhow!("invalid api base '{raw}': {err}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api base must start with http:// or https://, got '{raw}'");
        }
        if url.query().is_some() || url.fragment().is_some() {
            anyhow::bail!("api base must not carry a query or fragment: '{raw}'");
        }
        Ok(Self(url.as_str().trim_end_matches('/').to_string()))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reads a response body as JSON and applies the error-field rule before typed decoding.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, FlowError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    let value = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(FlowError::Transport(format!(
                "request failed with status {status}"
            )))
        }
        Err(err) => return Err(err.into()),
    };
    decode_value(status, value)
}

pub(crate) fn decode_value<T: DeserializeOwned>(
    status: StatusCode,
    value: Value,
) -> Result<T, FlowError> {
    if let Some(body) = ApiErrorBody::from_response(&value) {
        return Err(FlowError::Application(body.error));
    }
    if !value.is_object() {
        return Err(FlowError::Decode(format!(
            "expected a JSON object, got {}",
            json_type_name(&value)
        )));
    }
    if !status.is_success() {
        return Err(FlowError::Application(format!(
            "request failed with status {status}"
        )));
    }
    Ok(serde_json::from_value(value)?)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
