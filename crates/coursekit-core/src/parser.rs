//! TOML exam files.
//!
//! Exams can be authored offline and published from the CLI:
//!
//! ```toml
//! [exam]
//! course_id = 3
//! id = 12          # optional; present means update
//! min_score = 6.0
//!
//! [[questions]]
//! text = "Qual EPI protege contra ruído?"
//! alternatives = ["Luva", "Protetor auricular", "Capacete"]
//! correct = 1      # 0-based
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::ExamBuilder;
use crate::model::{CourseId, Exam, ExamId};

#[derive(Debug, Serialize, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlExamHeader {
    course_id: CourseId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ExamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlQuestion {
    text: String,
    alternatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correct: Option<usize>,
}

/// Load an exam draft from a TOML file.
pub fn parse_exam_file(path: &Path) -> Result<ExamBuilder> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an exam draft.
///
/// Structural problems (too many questions or alternatives, a `correct`
/// index past the end) fail here. Content problems such as empty texts or
/// an out-of-range score are left for [`ExamBuilder::validate`].
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamBuilder> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut builder = ExamBuilder::new(parsed.exam.course_id);
    if let Some(id) = parsed.exam.id {
        builder = builder.with_exam_id(id);
    }
    if let Some(min_score) = parsed.exam.min_score {
        // Kept even when out of range; validate() reports it.
        let _ = builder.set_min_score(min_score);
    }

    for (index, question) in parsed.questions.into_iter().enumerate() {
        builder
            .add_question_with(question.text, question.alternatives, question.correct)
            .with_context(|| {
                format!(
                    "{}: invalid question {}",
                    source_path.display(),
                    index + 1
                )
            })?;
    }

    Ok(builder)
}

/// Render an exam as an exam file, for editing and republishing.
pub fn exam_to_toml(exam: &Exam) -> Result<String> {
    let mut questions: Vec<_> = exam.questions.iter().collect();
    questions.sort_by_key(|q| q.number);

    let file = TomlExamFile {
        exam: TomlExamHeader {
            course_id: exam.course_id,
            id: Some(exam.id),
            min_score: Some(exam.min_score),
        },
        questions: questions
            .into_iter()
            .map(|q| TomlQuestion {
                text: q.text.clone(),
                alternatives: q
                    .ordered_alternatives()
                    .into_iter()
                    .map(|a| a.text.clone())
                    .collect(),
                correct: q.correct_index,
            })
            .collect(),
    };

    toml::to_string_pretty(&file).context("failed to serialize exam")
}
