//! Core data model types for coursekit.
//!
//! Read-side types deserialize straight from the backend's JSON, keeping its
//! Portuguese field names through `serde` renames. Write-side payloads live
//! in [`crate::wire`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wire::{
    lenient_f64, lenient_opt_u32, lenient_opt_u64, lenient_opt_usize, lenient_string, lenient_u32,
};

pub type CourseId = u64;
pub type ExamId = u64;
pub type QuestionId = u64;
pub type AlternativeId = u64;
pub type UserId = u64;
pub type AttemptId = u64;
pub type MaterialId = u64;

/// Maximum number of questions an exam may hold.
pub const MAX_QUESTIONS: usize = 20;
/// Maximum number of alternatives per question.
pub const MAX_ALTERNATIVES: usize = 8;
/// Minimum number of alternatives per question.
pub const MIN_ALTERNATIVES: usize = 2;
/// Alternatives created with a fresh question.
pub const DEFAULT_ALTERNATIVES: usize = 3;
/// Lowest accepted minimum passing score.
pub const MIN_SCORE_FLOOR: f64 = 0.0;
/// Highest accepted minimum passing score.
pub const MIN_SCORE_CEILING: f64 = 10.0;

/// Label for a score that was recorded as zero out of zero.
pub const NO_ANSWERS_LABEL: &str = "Sem respostas";
/// Label for a score that is not available.
pub const UNKNOWN_SCORE_LABEL: &str = "—";

/// An exam as stored by the backend (`GET /avaliacoes/curso/{idCurso}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    #[serde(rename = "idAvaliacao", alias = "id")]
    pub id: ExamId,
    #[serde(rename = "fkCurso", alias = "idCurso", default)]
    pub course_id: CourseId,
    #[serde(
        rename = "notaMinima",
        alias = "acertosMinimos",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub min_score: f64,
    #[serde(rename = "questoes", default)]
    pub questions: Vec<Question>,
}

/// A stored question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "idQuestao", alias = "id", default)]
    pub id: QuestionId,
    /// 1-based display number.
    #[serde(rename = "numeroQuestao", default, deserialize_with = "lenient_u32")]
    pub number: u32,
    #[serde(rename = "enunciado")]
    pub text: String,
    #[serde(rename = "alternativas", default)]
    pub alternatives: Vec<Alternative>,
    /// 0-based order of the correct alternative.
    #[serde(
        rename = "fkAlternativaCorreta",
        default,
        deserialize_with = "lenient_opt_usize"
    )]
    pub correct_index: Option<usize>,
}

impl Question {
    /// Alternatives sorted by their `order` field.
    pub fn ordered_alternatives(&self) -> Vec<&Alternative> {
        let mut alternatives: Vec<&Alternative> = self.alternatives.iter().collect();
        alternatives.sort_by_key(|a| a.order);
        alternatives
    }

    pub fn correct_alternative(&self) -> Option<&Alternative> {
        let index = self.correct_index?;
        self.ordered_alternatives().get(index).copied()
    }
}

/// A stored alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(rename = "idAlternativa", alias = "id", default)]
    pub id: AlternativeId,
    #[serde(rename = "texto")]
    pub text: String,
    /// 0-based position within the question.
    #[serde(rename = "ordemAlternativa", default, deserialize_with = "lenient_u32")]
    pub order: u32,
}

/// Correct answers over total questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

impl Score {
    pub fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    /// A `0/0` score carries no information about the attempt.
    pub fn is_empty(&self) -> bool {
        self.correct == 0 && self.total == 0
    }

    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// Render a score for display.
///
/// Every screen that shows a score goes through here: a missing score is
/// `—`, an explicit `0/0` is "Sem respostas", anything else is `c/t`.
pub fn display_score(score: Option<Score>) -> String {
    match score {
        None => UNKNOWN_SCORE_LABEL.to_string(),
        Some(s) if s.is_empty() => NO_ANSWERS_LABEL.to_string(),
        Some(s) => s.to_string(),
    }
}

/// One user's submission of an exam (`GET /tentativas/usuario/{userId}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(rename = "idTentativa", alias = "id")]
    pub id: AttemptId,
    #[serde(rename = "fkAvaliacao", default, deserialize_with = "lenient_opt_u64")]
    pub exam_id: Option<ExamId>,
    #[serde(rename = "fkUsuario", default)]
    pub user_id: UserId,
    #[serde(rename = "dtTentativa", default)]
    pub timestamp: Option<String>,
    #[serde(rename = "qtdAcertos", default, deserialize_with = "lenient_opt_u32")]
    pub correct_count: Option<u32>,
    #[serde(rename = "qtdQuestoes", default, deserialize_with = "lenient_opt_u32")]
    pub total_count: Option<u32>,
}

impl Attempt {
    /// The server-recorded score, when both counts are present.
    pub fn score(&self) -> Option<Score> {
        Some(Score::new(self.correct_count?, self.total_count?))
    }

    /// Parse the submission timestamp. Accepts RFC 3339 and the naive
    /// `YYYY-MM-DD HH:MM:SS` form, the latter taken as UTC.
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

/// An exam as served for taking (`GET /exam/{examId}`), without answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeableExam {
    #[serde(alias = "idAvaliacao")]
    pub id: ExamId,
    #[serde(alias = "questoes", default)]
    pub questions: Vec<TakeableQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeableQuestion {
    #[serde(alias = "idQuestao")]
    pub id: QuestionId,
    #[serde(alias = "enunciado")]
    pub text: String,
    #[serde(alias = "alternativas", default)]
    pub alternatives: Vec<TakeableAlternative>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakeableAlternative {
    #[serde(alias = "idAlternativa")]
    pub id: AlternativeId,
    #[serde(alias = "texto")]
    pub text: String,
}

/// Result object returned by `POST /exam/{examId}/submit`.
///
/// The verdict is the server's; the client only displays it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    #[serde(
        default,
        alias = "acertos",
        alias = "correctCount",
        deserialize_with = "lenient_opt_u32"
    )]
    pub correct: Option<u32>,
    #[serde(
        default,
        alias = "totalQuestoes",
        alias = "totalCount",
        deserialize_with = "lenient_opt_u32"
    )]
    pub total: Option<u32>,
    #[serde(default, alias = "nota")]
    pub score: Option<f64>,
    #[serde(default, alias = "aprovado")]
    pub passed: Option<bool>,
    #[serde(default, alias = "mensagem")]
    pub message: Option<String>,
}

impl SubmissionResult {
    pub fn score_counts(&self) -> Option<Score> {
        Some(Score::new(self.correct?, self.total?))
    }
}

/// Payload of `GET /exams/{examId}/answersheet/{userId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSheet {
    #[serde(default, alias = "questoes")]
    pub questions: Vec<SheetQuestion>,
    /// Question id → chosen alternative, numbers or strings.
    #[serde(default)]
    pub user_answers: BTreeMap<String, serde_json::Value>,
    /// Question id → correct alternative, numbers or strings.
    #[serde(default)]
    pub correct_answers: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetQuestion {
    #[serde(alias = "idQuestao", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, alias = "numeroQuestao", deserialize_with = "lenient_opt_u32")]
    pub number: Option<u32>,
    #[serde(alias = "enunciado", default)]
    pub text: String,
    #[serde(alias = "alternativas", default)]
    pub alternatives: Vec<SheetAlternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetAlternative {
    #[serde(alias = "idAlternativa", deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(alias = "texto", default)]
    pub text: String,
}

/// Kind of course material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Video,
    Pdf,
}

impl MaterialKind {
    /// REST collection serving this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            MaterialKind::Video => "videos",
            MaterialKind::Pdf => "apostilas",
        }
    }

    pub fn all() -> [MaterialKind; 2] {
        [MaterialKind::Video, MaterialKind::Pdf]
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialKind::Video => write!(f, "video"),
            MaterialKind::Pdf => write!(f, "pdf"),
        }
    }
}

impl FromStr for MaterialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" | "videos" => Ok(MaterialKind::Video),
            "pdf" | "apostila" | "apostilas" => Ok(MaterialKind::Pdf),
            other => Err(format!("unknown material kind: {other}")),
        }
    }
}

/// Identifies a material across both collections; video and PDF ids overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialKey {
    pub kind: MaterialKind,
    pub id: MaterialId,
}

impl fmt::Display for MaterialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

impl FromStr for MaterialKey {
    type Err = String;

    /// Parses `video#3` (or `video:3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('#')
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| format!("expected <kind>#<id>, got: {s}"))?;
        Ok(MaterialKey {
            kind: kind.trim().parse()?,
            id: id
                .trim()
                .parse()
                .map_err(|_| format!("invalid material id: {id}"))?,
        })
    }
}

/// A video or PDF belonging to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub course_id: CourseId,
    pub kind: MaterialKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    /// 1-based position in the course's material list.
    pub order: u32,
    #[serde(default)]
    pub hidden: bool,
}

impl Material {
    pub fn key(&self) -> MaterialKey {
        MaterialKey {
            kind: self.kind,
            id: self.id,
        }
    }
}

/// Metadata for a material being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMaterial {
    pub course_id: CourseId,
    pub kind: MaterialKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub hidden: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_parses_backend_payload() {
        let json = serde_json::json!({
            "idAvaliacao": 3,
            "fkCurso": 7,
            "notaMinima": "6.50",
            "questoes": [{
                "idQuestao": 11,
                "numeroQuestao": 1,
                "enunciado": "Quanto é 2+2?",
                "fkAlternativaCorreta": 1,
                "alternativas": [
                    {"idAlternativa": 21, "texto": "3", "ordemAlternativa": 0},
                    {"idAlternativa": 22, "texto": "4", "ordemAlternativa": 1}
                ]
            }]
        });
        let exam: Exam = serde_json::from_value(json).unwrap();
        assert_eq!(exam.id, 3);
        assert_eq!(exam.course_id, 7);
        assert_eq!(exam.min_score, 6.5);
        assert_eq!(exam.questions[0].correct_alternative().unwrap().text, "4");
    }

    #[test]
    fn exam_accepts_acertos_minimos() {
        let json = serde_json::json!({"idAvaliacao": 1, "acertosMinimos": 4});
        let exam: Exam = serde_json::from_value(json).unwrap();
        assert_eq!(exam.min_score, 4.0);
        assert!(exam.questions.is_empty());
    }

    #[test]
    fn exam_tolerates_missing_min_score_and_string_numbers() {
        let json = serde_json::json!({
            "idAvaliacao": 2,
            "questoes": [{
                "idQuestao": 5,
                "numeroQuestao": "2",
                "enunciado": "Segunda",
                "alternativas": [
                    {"idAlternativa": 8, "texto": "b", "ordemAlternativa": "1"},
                    {"idAlternativa": 7, "texto": "a", "ordemAlternativa": null}
                ]
            }]
        });
        let exam: Exam = serde_json::from_value(json).unwrap();
        assert_eq!(exam.min_score, 0.0);
        assert_eq!(exam.questions[0].number, 2);
        let texts: Vec<&str> = exam.questions[0]
            .ordered_alternatives()
            .iter()
            .map(|a| a.text.as_str())
            .collect();
        assert_eq!(texts, vec!["a", "b"]);

        let exam: Exam =
            serde_json::from_value(serde_json::json!({"idAvaliacao": 2, "notaMinima": null}))
                .unwrap();
        assert_eq!(exam.min_score, 0.0);
    }

    #[test]
    fn display_score_distinguishes_empty_from_zero() {
        assert_eq!(display_score(Some(Score::new(0, 0))), NO_ANSWERS_LABEL);
        assert_eq!(display_score(Some(Score::new(0, 5))), "0/5");
        assert_eq!(display_score(None), UNKNOWN_SCORE_LABEL);
    }

    #[test]
    fn attempt_score_requires_both_counts() {
        let attempt: Attempt = serde_json::from_value(serde_json::json!({
            "idTentativa": 9,
            "fkAvaliacao": 3,
            "fkUsuario": 42,
            "qtdAcertos": 2
        }))
        .unwrap();
        assert_eq!(attempt.score(), None);
        assert_eq!(attempt.exam_id, Some(3));
    }

    #[test]
    fn attempt_timestamp_formats() {
        let mut attempt: Attempt =
            serde_json::from_value(serde_json::json!({"idTentativa": 1})).unwrap();
        attempt.timestamp = Some("2024-05-01T10:30:00Z".into());
        assert!(attempt.submitted_at().is_some());
        attempt.timestamp = Some("2024-05-01 10:30:00".into());
        assert!(attempt.submitted_at().is_some());
        attempt.timestamp = Some("ontem".into());
        assert!(attempt.submitted_at().is_none());
    }

    #[test]
    fn material_key_parse() {
        let key: MaterialKey = "pdf#7".parse().unwrap();
        assert_eq!(key, MaterialKey { kind: MaterialKind::Pdf, id: 7 });
        assert_eq!("video:3".parse::<MaterialKey>().unwrap().to_string(), "video#3");
        assert!("video".parse::<MaterialKey>().is_err());
        assert!("audio#1".parse::<MaterialKey>().is_err());
    }

    #[test]
    fn material_kind_display_and_parse() {
        assert_eq!(MaterialKind::Video.to_string(), "video");
        assert_eq!("apostila".parse::<MaterialKind>().unwrap(), MaterialKind::Pdf);
        assert_eq!("VIDEOS".parse::<MaterialKind>().unwrap(), MaterialKind::Video);
        assert!("audio".parse::<MaterialKind>().is_err());
        assert_eq!(MaterialKind::Pdf.collection(), "apostilas");
    }

    #[test]
    fn sheet_question_ids_coerce_to_strings() {
        let sheet: AnswerSheet = serde_json::from_value(serde_json::json!({
            "questions": [{"idQuestao": 1, "enunciado": "x", "alternativas": [{"idAlternativa": 5, "texto": "a"}]}],
            "userAnswers": {"1": 5},
            "correctAnswers": {"1": "5"}
        }))
        .unwrap();
        assert_eq!(sheet.questions[0].id, "1");
        assert_eq!(sheet.questions[0].alternatives[0].id, "5");
    }
}
