use leptos::{IntoView, View};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "status", rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request left the client but no response came back.
    Network,
    Timeout,
    /// The server answered with a non-2xx status.
    HttpStatus(u16),
    /// HTTP 200 whose envelope reports failure.
    Business,
    /// An action ran without the state it needs; no request was sent.
    LocalPrecondition,
    /// A newer action made this response stale; it was discarded.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

const AUTH_FAILURE_PATTERNS: &[&str] = &[
    "unauthorized",
    "unauthorised",
    "token expired",
    "expired token",
    "invalid token",
    "token invalid",
    "token has expired",
    "session expired",
    "未授权",
    "登录已过期",
    "令牌无效",
];

pub fn default_status_message(status: u16) -> String {
    match status {
        401 => "Unauthorized".to_string(),
        403 => "Access denied".to_string(),
        404 => "The requested resource does not exist".to_string(),
        500 => "Internal server error".to_string(),
        502 => "Bad gateway".to_string(),
        503 => "Service unavailable".to_string(),
        504 => "Gateway timeout".to_string(),
        other => format!("Request failed ({})", other),
    }
}

impl ApiError {
    pub fn network() -> Self {
        Self {
            kind: ErrorKind::Network,
            message: "Network connection failed, please check your network".to_string(),
            code: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: "Request timed out".to_string(),
            code: None,
        }
    }

    pub fn http_status(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_status_message(status));
        Self {
            kind: ErrorKind::HttpStatus(status),
            message,
            code: Some(status.to_string()),
        }
    }

    pub fn business(code: Option<String>, message: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Business,
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Request failed".to_string()),
            code,
        }
    }

    pub fn malformed_response() -> Self {
        Self::business(
            Some("MALFORMED_RESPONSE".to_string()),
            Some("Malformed response from server".to_string()),
        )
    }

    pub fn local(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::LocalPrecondition,
            message: msg.into(),
            code: None,
        }
    }

    pub fn superseded(action: &str) -> Self {
        Self {
            kind: ErrorKind::Superseded,
            message: format!("{} response discarded: superseded by a newer action", action),
            code: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::HttpStatus(status) => Some(status),
            _ => None,
        }
    }

    /// HTTP 401, an envelope code of 401, or a message naming an expired or
    /// invalid credential.
    pub fn is_auth_failure(&self) -> bool {
        if self.status() == Some(401) {
            return true;
        }
        if self.kind == ErrorKind::Business && self.code.as_deref() == Some("401") {
            return true;
        }
        let message = self.message.to_lowercase();
        AUTH_FAILURE_PATTERNS
            .iter()
            .any(|pattern| message.contains(pattern))
    }
}

impl From<ApiError> for String {
    fn from(error: ApiError) -> Self {
        error.message
    }
}

impl IntoView for ApiError {
    fn into_view(self) -> View {
        self.message.into_view()
    }
}
