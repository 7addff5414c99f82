//! Delivering a completed answer set and classifying what went wrong.
//!
//! The server scores every attempt; this module never decides pass or fail.
//! There is no retry: a failed submit is reported and the user resubmits.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::ApiError;
use crate::model::{AlternativeId, ExamId, QuestionId, SubmissionResult, UserId};
use crate::traits::TakingApi;
use crate::wire::SubmitRequest;

/// Shown when an exam is submitted with unanswered questions.
pub const INCOMPLETE_MESSAGE: &str = "Responda todas as questões antes de enviar.";
/// Shown for transport and unexpected server failures.
pub const SUBMIT_FAILED_MESSAGE: &str = "Erro ao enviar respostas. Tente novamente.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Blocked locally; nothing was sent.
    #[error("Responda todas as questões antes de enviar. ({answered}/{total})")]
    Incomplete { answered: usize, total: usize },

    /// A submit is already in flight.
    #[error("Envio em andamento.")]
    InProgress,

    /// The server rejected the answers (400/422); its message is kept.
    #[error("{0}")]
    Rejected(String),

    /// The server refused because of existing state (409).
    #[error("{0}")]
    Conflict(String),

    /// Transport failure or unexpected status. The detail is for logs only.
    #[error("submit failed: {0}")]
    Failed(String),
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Incomplete { .. } => INCOMPLETE_MESSAGE.to_string(),
            SubmitError::InProgress => self.to_string(),
            SubmitError::Rejected(m) | SubmitError::Conflict(m) => m.clone(),
            SubmitError::Failed(_) => SUBMIT_FAILED_MESSAGE.to_string(),
        }
    }

    /// Whether the request ever reached the network.
    pub fn is_local(&self) -> bool {
        matches!(self, SubmitError::Incomplete { .. } | SubmitError::InProgress)
    }
}

impl From<ApiError> for SubmitError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Validation(message) => SubmitError::Rejected(message),
            ApiError::Conflict { message, .. } => SubmitError::Conflict(message),
            other => SubmitError::Failed(other.to_string()),
        }
    }
}

pub fn build_request(
    user_id: UserId,
    answers: &BTreeMap<QuestionId, AlternativeId>,
) -> SubmitRequest {
    SubmitRequest {
        user_id,
        answers: answers.clone(),
    }
}

/// Send a full answer set and return the server's verdict.
pub async fn submit_answers(
    api: &dyn TakingApi,
    exam_id: ExamId,
    user_id: UserId,
    answers: &BTreeMap<QuestionId, AlternativeId>,
) -> Result<SubmissionResult, SubmitError> {
    let request = build_request(user_id, answers);
    tracing::info!(exam_id, user_id, answers = answers.len(), "submitting exam answers");

    api.submit_answers(exam_id, &request).await.map_err(|e| {
        tracing::warn!(exam_id, user_id, error = %e, "exam submission failed");
        SubmitError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_taxonomy() {
        assert_eq!(
            SubmitError::from(ApiError::Validation("respostas inválidas".into())),
            SubmitError::Rejected("respostas inválidas".into())
        );
        assert!(matches!(
            SubmitError::from(ApiError::from_status(409, r#"{"message":"já enviada"}"#)),
            SubmitError::Conflict(m) if m == "já enviada"
        ));
        let failed = SubmitError::from(ApiError::Network("reset".into()));
        assert_eq!(failed.user_message(), SUBMIT_FAILED_MESSAGE);
        assert!(!failed.is_local());
    }

    #[test]
    fn incomplete_message() {
        let err = SubmitError::Incomplete {
            answered: 1,
            total: 2,
        };
        assert_eq!(err.user_message(), INCOMPLETE_MESSAGE);
        assert!(err.to_string().contains("1/2"));
        assert!(err.is_local());
    }
}
