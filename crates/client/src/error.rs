// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors surfaced by the API client.
///
/// Authorization failures are resolved transparently when a refresh succeeds;
/// everything else reaches the original caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, reset).
    Network(String),
    /// The request was still rejected with 401 after its single retry.
    Unauthorized,
    /// The refresh token exchange failed. The session has been cleared.
    RefreshFailed(String),
    /// A queued request was cancelled because the session was logged out.
    SessionCleared,
    /// Any other non-success response.
    Status { status: u16, message: String },
    /// A success body did not match the expected shape.
    Decode(String),
    /// Caller input rejected before any request was made.
    Validation(String),
}

impl ApiError {
    /// Stable machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Network(_) => ErrorCode::Network,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::RefreshFailed(_) => ErrorCode::RefreshFailed,
            Self::SessionCleared => ErrorCode::SessionCleared,
            Self::Status { .. } => ErrorCode::Status,
            Self::Decode(_) => ErrorCode::Decode,
            Self::Validation(_) => ErrorCode::Validation,
        }
    }

    /// HTTP status associated with this error, if the server produced one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error ended the session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::RefreshFailed(_) | Self::SessionCleared)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::RefreshFailed(msg) => write!(f, "session refresh failed: {msg}"),
            Self::SessionCleared => f.write_str("session was logged out"),
            Self::Status { status, message } => write!(f, "request failed ({status}): {message}"),
            Self::Decode(msg) => write!(f, "unexpected response body: {msg}"),
            Self::Validation(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Machine-readable error codes, mirrored in CLI JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Network,
    Unauthorized,
    RefreshFailed,
    SessionCleared,
    Status,
    Decode,
    Validation,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RefreshFailed => "REFRESH_FAILED",
            Self::SessionCleared => "SESSION_CLEARED",
            Self::Status => "STATUS",
            Self::Decode => "DECODE",
            Self::Validation => "VALIDATION",
        }
    }

    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error envelope printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(e: &ApiError) -> Self {
        Self { error: e.code().to_error_body(e.to_string()) }
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Looks at `message`, then `detail`, then `error`; falls back to the raw text.
pub fn extract_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "detail", "error"] {
            if let Some(serde_json::Value::String(s)) = map.get(key) {
                return s.clone();
            }
        }
    }
    body.trim().to_owned()
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
