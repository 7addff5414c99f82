//! Bearer-token context and the current user id.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::UserId;

/// Claims checked, in order, for the user id.
const USER_ID_CLAIMS: [&str; 4] = ["id", "idUsuario", "userId", "sub"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("not logged in: no token configured")]
    MissingToken,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token carries no user id")]
    MissingUserId,
}

/// The session's bearer token. Never printed in full.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = self.token.as_ref().map(|_| "***");
        f.debug_struct("AuthContext").field("token", &token).finish()
    }
}

impl AuthContext {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token.trim();
        Self {
            token: (!token.is_empty()).then(|| token.to_string()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Decoded JWT payload. The signature is not verified; the server does that.
    pub fn claims(&self) -> Result<Map<String, Value>, AuthError> {
        let token = self.token.as_deref().ok_or(AuthError::MissingToken)?;
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::MalformedToken("expected three segments".into()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AuthError::MalformedToken("payload is not an object".into())),
            Err(e) => Err(AuthError::MalformedToken(e.to_string())),
        }
    }

    /// The logged-in user's id, from the first numeric id claim.
    pub fn current_user_id(&self) -> Result<UserId, AuthError> {
        let claims = self.claims()?;
        USER_ID_CLAIMS
            .iter()
            .filter_map(|key| claims.get(*key))
            .find_map(|value| match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .ok_or(AuthError::MissingUserId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";

    fn jwt(payload: &str) -> AuthContext {
        AuthContext::new(format!("{HEADER}.{payload}.c2lnbmF0dXJl"))
    }

    #[test]
    fn reads_numeric_id() {
        assert_eq!(jwt("eyJpZCI6NDJ9").current_user_id(), Ok(42));
    }

    #[test]
    fn reads_string_id_under_alternate_claim() {
        let ctx = jwt("eyJpZFVzdWFyaW8iOiI3Iiwibm9tZSI6IkFuYSJ9");
        assert_eq!(ctx.current_user_id(), Ok(7));
        assert_eq!(ctx.claims().unwrap()["nome"], "Ana");
    }

    #[test]
    fn padded_payload_and_non_numeric_sub() {
        assert_eq!(
            jwt("eyJzdWIiOiJhYmMifQ==").current_user_id(),
            Err(AuthError::MissingUserId)
        );
        assert_eq!(
            jwt("eyJub21lIjoiQW5hIn0=").current_user_id(),
            Err(AuthError::MissingUserId)
        );
    }

    #[test]
    fn missing_and_malformed() {
        assert_eq!(
            AuthContext::anonymous().current_user_id(),
            Err(AuthError::MissingToken)
        );
        assert_eq!(AuthContext::new("   "), AuthContext::anonymous());
        assert!(matches!(
            AuthContext::new("not-a-jwt").claims(),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn debug_masks_token() {
        let printed = format!("{:?}", jwt("eyJpZCI6NDJ9"));
        assert!(!printed.contains(HEADER));
        assert!(printed.contains("***"));
    }
}
