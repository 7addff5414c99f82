//! Exam deletion with a forced second step when responses exist.

use crate::error::ApiError;
use crate::events::{EventBus, PortalEvent};
use crate::model::ExamId;
use crate::traits::ExamApi;

/// Field of the 409 body carrying the number of existing responses.
pub const RESPONSES_COUNT_FIELD: &str = "respostasCount";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The exam has responses; deleting needs an explicit forced confirmation.
    NeedsForce { responses: u64 },
}

/// Text of the force-confirm dialog.
pub fn force_prompt(responses: u64) -> String {
    format!(
        "Esta avaliação possui {responses} resposta(s). Excluir mesmo assim apagará todas as respostas."
    )
}

/// First, non-forced delete attempt.
pub async fn delete_exam(
    api: &dyn ExamApi,
    exam_id: ExamId,
    events: Option<&EventBus>,
) -> Result<DeleteOutcome, ApiError> {
    match api.delete_exam(exam_id, false).await {
        Ok(()) => {
            if let Some(events) = events {
                events.publish(PortalEvent::ExamDeleted {
                    exam_id,
                    forced: false,
                });
            }
            Ok(DeleteOutcome::Deleted)
        }
        Err(e) if e.is_conflict() => {
            let responses = e.conflict_count(RESPONSES_COUNT_FIELD).unwrap_or(0);
            tracing::info!(exam_id, responses, "exam has responses, force required");
            Ok(DeleteOutcome::NeedsForce { responses })
        }
        Err(e) => Err(e),
    }
}

/// Confirmed delete that cascades to the exam's responses.
pub async fn force_delete_exam(
    api: &dyn ExamApi,
    exam_id: ExamId,
    events: Option<&EventBus>,
) -> Result<(), ApiError> {
    api.delete_exam(exam_id, true).await?;
    if let Some(events) = events {
        events.publish(PortalEvent::ExamDeleted {
            exam_id,
            forced: true,
        });
    }
    Ok(())
}
