//! Response envelope dialects.
//!
//! A deployment speaks exactly one dialect, chosen by [`DialectKind`] in the
//! runtime config. Both unwrap a JSON body into an [`Envelope`] or reject it
//! as a business error.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ApiError;

/// Payload of a successful envelope plus every other top-level field
/// (pagination counters and the like).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    pub data: Option<Value>,
    pub meta: Map<String, Value>,
}

impl Envelope {
    /// Deserializes `data`; a missing payload is read as JSON `null`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let data = self.data.unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| {
            log::warn!("response data did not match the expected shape: {}", e);
            ApiError::malformed_response()
        })
    }

    pub fn meta_u64(&self, key: &str) -> Option<u64> {
        self.meta.get(key).and_then(Value::as_u64)
    }
}

pub trait EnvelopeDialect {
    fn name(&self) -> &'static str;

    fn unwrap(&self, body: Value) -> Result<Envelope, ApiError>;

    /// Message a server put into an error body, if any.
    fn error_message(&self, body: &Value) -> Option<String>;
}

/// `{ success, data?, errCode?, errMessage? }`
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessFlagDialect;

/// `{ code, message, data }` where `code == 200` means success.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCodeDialect;

fn into_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::malformed_response()),
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl EnvelopeDialect for SuccessFlagDialect {
    fn name(&self) -> &'static str {
        "success_flag"
    }

    fn unwrap(&self, body: Value) -> Result<Envelope, ApiError> {
        let mut map = into_object(body)?;
        let success = map
            .remove("success")
            .and_then(|v| v.as_bool())
            .ok_or_else(ApiError::malformed_response)?;
        let err_code = string_field(&map, "errCode");
        let err_message = string_field(&map, "errMessage");
        if !success {
            return Err(ApiError::business(err_code, err_message));
        }
        map.remove("errCode");
        map.remove("errMessage");
        let data = map.remove("data").filter(|v| !v.is_null());
        Ok(Envelope { data, meta: map })
    }

    fn error_message(&self, body: &Value) -> Option<String> {
        let map = body.as_object()?;
        string_field(map, "errMessage").or_else(|| string_field(map, "message"))
    }
}

impl EnvelopeDialect for StatusCodeDialect {
    fn name(&self) -> &'static str {
        "status_code"
    }

    fn unwrap(&self, body: Value) -> Result<Envelope, ApiError> {
        let mut map = into_object(body)?;
        let code = map
            .remove("code")
            .and_then(|v| v.as_i64())
            .ok_or_else(ApiError::malformed_response)?;
        let message = string_field(&map, "message");
        if code != 200 {
            return Err(ApiError::business(Some(code.to_string()), message));
        }
        map.remove("message");
        let data = map.remove("data").filter(|v| !v.is_null());
        Ok(Envelope { data, meta: map })
    }

    fn error_message(&self, body: &Value) -> Option<String> {
        string_field(body.as_object()?, "message")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    SuccessFlag,
    StatusCode,
}

impl DialectKind {
    pub fn strategy(self) -> &'static dyn EnvelopeDialect {
        match self {
            DialectKind::SuccessFlag => &SuccessFlagDialect,
            DialectKind::StatusCode => &StatusCodeDialect,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success_flag" | "success-flag" | "flag" => Some(DialectKind::SuccessFlag),
            "status_code" | "status-code" | "code" => Some(DialectKind::StatusCode),
            _ => None,
        }
    }
}
