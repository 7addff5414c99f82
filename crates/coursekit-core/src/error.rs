//! Backend error types.
//!
//! Every collaborator trait returns [`ApiError`], so the state machines can
//! tell a conflict from a validation failure without string matching.

use thiserror::Error;

/// Message shown when the backend could not be reached at all.
pub const GENERIC_ERROR_MESSAGE: &str = "Erro de conexão com o servidor. Tente novamente.";

/// Errors returned by the REST backend or the transport underneath it.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The bearer token is missing, expired or rejected (401/403).
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The resource does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The server rejected the payload (400/422). The message is the server's.
    #[error("{0}")]
    Validation(String),

    /// The request conflicts with server state (409).
    #[error("{message}")]
    Conflict {
        message: String,
        body: serde_json::Value,
    },

    /// Any other error status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify an error response by status code and raw body.
    ///
    /// JSON bodies carrying `message`, `mensagem` or `error` contribute that
    /// text; anything else is used verbatim.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: serde_json::Value =
            serde_json::from_str(body).unwrap_or(serde_json::Value::Null);
        let message = extract_message(&parsed).unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                body.trim().to_string()
            }
        });

        match status {
            400 | 422 => ApiError::Validation(message),
            401 | 403 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict {
                message,
                body: parsed,
            },
            _ => ApiError::Api { status, message },
        }
    }

    /// HTTP status behind this error, if there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::Validation(_) => Some(400),
            ApiError::Conflict { .. } => Some(409),
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    /// Read a numeric field from a conflict body (e.g. `respostasCount`).
    pub fn conflict_count(&self, field: &str) -> Option<u64> {
        let ApiError::Conflict { body, .. } = self else {
            return None;
        };
        match body.get(field)? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text suitable for an inline error block.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) | ApiError::Decode(_) => GENERIC_ERROR_MESSAGE.to_string(),
            ApiError::Unauthorized(m)
            | ApiError::NotFound(m)
            | ApiError::Validation(m)
            | ApiError::Conflict { message: m, .. }
            | ApiError::Api { message: m, .. } => m.clone(),
        }
    }
}

fn extract_message(body: &serde_json::Value) -> Option<String> {
    ["message", "mensagem", "error", "erro"]
        .iter()
        .find_map(|key| body.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            ApiError::from_status(400, r#"{"message":"campo obrigatório"}"#),
            ApiError::Validation(m) if m == "campo obrigatório"
        ));
        assert!(ApiError::from_status(409, "{}").is_conflict());
        assert!(ApiError::from_status(404, "").is_not_found());
        assert!(matches!(
            ApiError::from_status(503, "down"),
            ApiError::Api { status: 503, message } if message == "down"
        ));
    }

    #[test]
    fn conflict_count_reads_numbers_and_strings() {
        let err = ApiError::from_status(409, r#"{"message":"x","respostasCount":4}"#);
        assert_eq!(err.conflict_count("respostasCount"), Some(4));

        let err = ApiError::from_status(409, r#"{"respostasCount":"7"}"#);
        assert_eq!(err.conflict_count("respostasCount"), Some(7));

        let err = ApiError::Validation("nope".into());
        assert_eq!(err.conflict_count("respostasCount"), None);
    }

    #[test]
    fn network_errors_get_generic_message() {
        let err = ApiError::Network("connection refused".into());
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn empty_body_falls_back_to_status() {
        let err = ApiError::from_status(500, "  ");
        assert_eq!(err.user_message(), "HTTP 500");
    }
}
