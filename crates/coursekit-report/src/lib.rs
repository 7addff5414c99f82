//! coursekit-report — answer sheet and attempt rendering.
//!
//! Renders a reconciled answer sheet as plain text, Markdown or a
//! self-contained HTML page.

pub mod html;
pub mod markdown;
pub mod text;

pub use html::{generate_html, write_html_report};
pub use markdown::{attempts_markdown, to_markdown};
pub use text::to_text;

use coursekit_core::answersheet::Outcome;

/// Short Portuguese label for a question outcome.
pub fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Correct => "Correta",
        Outcome::Incorrect => "Incorreta",
        Outcome::Unanswered => "Sem resposta",
        Outcome::Ungraded => "Sem gabarito",
    }
}

/// Timestamp column text for an attempt.
pub(crate) fn format_timestamp(attempt: &coursekit_core::model::Attempt) -> String {
    match attempt.submitted_at() {
        Some(dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
        None => attempt.timestamp.clone().unwrap_or_else(|| "-".to_string()),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use coursekit_core::answersheet::merge;
    use coursekit_core::answersheet::ReconciledSheet;
    use coursekit_core::model::{AnswerSheet, Attempt, SheetAlternative, SheetQuestion};
    use serde_json::json;

    pub fn attempt() -> Attempt {
        Attempt {
            id: 11,
            exam_id: Some(4),
            user_id: 42,
            timestamp: Some("2024-03-01T10:30:00Z".into()),
            correct_count: Some(1),
            total_count: Some(2),
        }
    }

    /// Two questions: the first answered right, the second wrong.
    pub fn sheet() -> ReconciledSheet {
        let sheet = AnswerSheet {
            questions: vec![
                SheetQuestion {
                    id: "1".into(),
                    number: Some(1),
                    text: "Qual EPI protege contra <ruído>?".into(),
                    alternatives: vec![
                        SheetAlternative { id: "2".into(), text: "Luva".into() },
                        SheetAlternative { id: "3".into(), text: "Protetor auricular".into() },
                    ],
                },
                SheetQuestion {
                    id: "2".into(),
                    number: Some(2),
                    text: "Cor do extintor de CO2?".into(),
                    alternatives: vec![
                        SheetAlternative { id: "3".into(), text: "Preto".into() },
                        SheetAlternative { id: "4".into(), text: "Azul".into() },
                    ],
                },
            ],
            user_answers: serde_json::from_value(json!({"1": "3", "2": 4})).unwrap(),
            correct_answers: serde_json::from_value(json!({"1": 3, "2": "3"})).unwrap(),
        };
        merge(attempt(), 4, sheet)
    }
}
