//! Answer-sheet reconciliation.
//!
//! An attempt record does not embed the exam's content, so reviewing one
//! takes three steps: find the attempt, read its exam id, then fetch the
//! answer sheet for `(exam, user)` and merge questions, the user's choices
//! and the correct answers into one [`ReconciledSheet`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;
use crate::model::{display_score, AnswerSheet, Attempt, AttemptId, ExamId, Score, UserId};
use crate::traits::AttemptApi;
use crate::wire::coerce_to_string;

#[derive(Debug, Clone, Error)]
pub enum SheetError {
    #[error("Tentativa {0} não encontrada.")]
    AttemptNotFound(AttemptId),

    #[error("ID da avaliação não disponível para esta tentativa.")]
    ExamIdUnavailable,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SheetError {
    pub fn user_message(&self) -> String {
        match self {
            SheetError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// How one question went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    /// The user has no recorded answer.
    Unanswered,
    /// No correct answer is known for this question.
    Ungraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetOption {
    pub id: String,
    pub text: String,
    pub chosen: bool,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetItem {
    /// 1-based display position.
    pub position: usize,
    pub question_id: String,
    pub text: String,
    pub options: Vec<SheetOption>,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub outcome: Outcome,
}

/// A read-only review of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledSheet {
    pub attempt: Attempt,
    pub exam_id: ExamId,
    pub items: Vec<SheetItem>,
    /// Recomputed from the answer maps, for display only.
    pub accuracy: Score,
}

impl ReconciledSheet {
    /// The score the server recorded for the attempt.
    pub fn recorded_display(&self) -> String {
        display_score(self.attempt.score())
    }

    pub fn accuracy_display(&self) -> String {
        display_score(Some(self.accuracy))
    }
}

/// Compare user answers to correct answers question by question.
///
/// Only questions present in both maps count; a question missing from
/// either side is left out instead of being scored as wrong.
pub fn compute_accuracy(
    correct_answers: &BTreeMap<String, Value>,
    user_answers: &BTreeMap<String, Value>,
) -> Score {
    let mut score = Score::new(0, 0);
    for (question_id, correct) in correct_answers {
        let Some(correct) = coerce_to_string(correct) else {
            continue;
        };
        let Some(chosen) = user_answers.get(question_id).and_then(coerce_to_string) else {
            continue;
        };
        score.total += 1;
        if chosen == correct {
            score.correct += 1;
        }
    }
    score
}

/// Merge an attempt and its answer sheet into display rows.
pub fn merge(attempt: Attempt, exam_id: ExamId, sheet: AnswerSheet) -> ReconciledSheet {
    let accuracy = compute_accuracy(&sheet.correct_answers, &sheet.user_answers);

    let mut questions = sheet.questions;
    // Stable: questions without a number keep their server order.
    questions.sort_by_key(|q| q.number.unwrap_or(u32::MAX));

    let items = questions
        .into_iter()
        .enumerate()
        .map(|(index, question)| {
            let user_answer = sheet
                .user_answers
                .get(&question.id)
                .and_then(coerce_to_string);
            let correct_answer = sheet
                .correct_answers
                .get(&question.id)
                .and_then(coerce_to_string);

            let outcome = match (&user_answer, &correct_answer) {
                (_, None) => Outcome::Ungraded,
                (None, Some(_)) => Outcome::Unanswered,
                (Some(u), Some(c)) if u == c => Outcome::Correct,
                (Some(_), Some(_)) => Outcome::Incorrect,
            };

            let options = question
                .alternatives
                .into_iter()
                .map(|alt| SheetOption {
                    chosen: user_answer.as_deref() == Some(alt.id.as_str()),
                    correct: correct_answer.as_deref() == Some(alt.id.as_str()),
                    id: alt.id,
                    text: alt.text,
                })
                .collect();

            SheetItem {
                position: index + 1,
                question_id: question.id,
                text: question.text,
                options,
                user_answer,
                correct_answer,
                outcome,
            }
        })
        .collect();

    ReconciledSheet {
        attempt,
        exam_id,
        items,
        accuracy,
    }
}

/// Find an attempt in a user's history by linear scan.
pub async fn find_attempt(
    api: &dyn AttemptApi,
    user_id: UserId,
    attempt_id: AttemptId,
) -> Result<Attempt, SheetError> {
    api.attempts_for_user(user_id)
        .await?
        .into_iter()
        .find(|a| a.id == attempt_id)
        .ok_or(SheetError::AttemptNotFound(attempt_id))
}

/// Rebuild the review of `attempt_id` for `user_id`.
pub async fn reconcile(
    api: &dyn AttemptApi,
    user_id: UserId,
    attempt_id: AttemptId,
) -> Result<ReconciledSheet, SheetError> {
    let attempt = find_attempt(api, user_id, attempt_id).await?;
    let exam_id = attempt.exam_id.ok_or(SheetError::ExamIdUnavailable)?;

    tracing::debug!(user_id, attempt_id, exam_id, "fetching answer sheet");
    let sheet = api.answer_sheet(exam_id, user_id).await?;
    Ok(merge(attempt, exam_id, sheet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SheetAlternative, SheetQuestion};
    use serde_json::json;

    fn answers(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    fn attempt(exam_id: Option<ExamId>, correct: Option<u32>, total: Option<u32>) -> Attempt {
        Attempt {
            id: 1,
            exam_id,
            user_id: 42,
            timestamp: None,
            correct_count: correct,
            total_count: total,
        }
    }

    #[test]
    fn accuracy_counts_matches_only() {
        let correct = answers(json!({"1": "3", "2": "3"}));
        let user = answers(json!({"1": "2", "2": "3"}));
        assert_eq!(compute_accuracy(&correct, &user), Score::new(1, 2));
    }

    #[test]
    fn accuracy_coerces_numbers_and_strings() {
        let correct = answers(json!({"1": 3, "2": "4"}));
        let user = answers(json!({"1": "3", "2": 4}));
        assert_eq!(compute_accuracy(&correct, &user), Score::new(2, 2));
    }

    #[test]
    fn accuracy_skips_missing_keys() {
        let correct = answers(json!({"1": "3", "2": "3", "3": null}));
        let user = answers(json!({"1": "3", "3": "1", "4": "2"}));
        assert_eq!(compute_accuracy(&correct, &user), Score::new(1, 1));
    }

    #[test]
    fn merge_marks_options_and_outcomes() {
        let sheet = AnswerSheet {
            questions: vec![
                SheetQuestion {
                    id: "2".into(),
                    number: Some(2),
                    text: "Segunda".into(),
                    alternatives: vec![
                        SheetAlternative { id: "20".into(), text: "a".into() },
                        SheetAlternative { id: "21".into(), text: "b".into() },
                    ],
                },
                SheetQuestion {
                    id: "1".into(),
                    number: Some(1),
                    text: "Primeira".into(),
                    alternatives: vec![
                        SheetAlternative { id: "10".into(), text: "a".into() },
                        SheetAlternative { id: "11".into(), text: "b".into() },
                    ],
                },
                SheetQuestion {
                    id: "3".into(),
                    number: Some(3),
                    text: "Terceira".into(),
                    alternatives: vec![],
                },
            ],
            user_answers: answers(json!({"1": 10, "2": "20"})),
            correct_answers: answers(json!({"1": "10", "2": 21, "3": "30"})),
        };

        let merged = merge(attempt(Some(4), Some(1), Some(3)), 4, sheet);
        assert_eq!(merged.items[0].text, "Primeira");
        assert_eq!(merged.items[0].outcome, Outcome::Correct);
        assert!(merged.items[0].options[0].chosen && merged.items[0].options[0].correct);
        assert_eq!(merged.items[1].outcome, Outcome::Incorrect);
        assert!(merged.items[1].options[0].chosen);
        assert!(merged.items[1].options[1].correct);
        assert_eq!(merged.items[2].outcome, Outcome::Unanswered);
        assert_eq!(merged.items[2].position, 3);
        assert_eq!(merged.accuracy, Score::new(1, 2));
        assert_eq!(merged.recorded_display(), "1/3");
        assert_eq!(merged.accuracy_display(), "1/2");
    }

    #[test]
    fn empty_attempt_displays_no_answers() {
        let merged = merge(attempt(Some(4), Some(0), Some(0)), 4, AnswerSheet::default());
        assert_eq!(merged.recorded_display(), "Sem respostas");
        assert_eq!(merged.accuracy_display(), "Sem respostas");

        let merged = merge(attempt(Some(4), Some(0), Some(3)), 4, AnswerSheet::default());
        assert_eq!(merged.recorded_display(), "0/3");
    }
}
