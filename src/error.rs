// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types shared by every networked component.

use serde::Deserialize;

/// Error returned by API calls and the state containers built on them.
///
/// Payloads are plain strings so the same refresh failure can be handed to
/// every request that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

/// Error body returned by the platform API on failure.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success status and its raw body.
    ///
    /// The server's own message is surfaced verbatim when the body carries one.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.to_string()
                }
            });

        if status == 401 {
            ApiError::Unauthorized(message)
        } else {
            ApiError::Api { status, message }
        }
    }

    /// True for a 401 from the server.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// True when the session could not be recovered and the user was logged out.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }

    /// Message suitable for an inline banner or alert.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Network error. Please check your connection.".to_string(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::SessionExpired(_) => {
                "Your session has expired. Please log in again.".to_string()
            }
            ApiError::Api { message, .. } => message.clone(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Decode(_) | ApiError::Storage(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();

        // Struct-level (schema) errors are reported under "__all__".
        messages.sort();
        if messages.is_empty() {
            messages.push(errors.to_string());
        }

        ApiError::Validation(messages.join("; "))
    }
}

/// Result type alias for API calls.
pub type Result<T> = std::result::Result<T, ApiError>;
