//! Request payloads and lenient field decoders for the REST backend.
//!
//! The backend is loose about JSON types: decimals arrive as strings,
//! booleans as `0`/`1`, ids as either numbers or strings. The `lenient_*`
//! helpers accept all of those.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::{
    AlternativeId, CourseId, Material, MaterialId, MaterialKey, MaterialKind, NewMaterial, QuestionId,
    UserId,
};

/// Exam create/update body (`POST /avaliacoes`, `PUT /avaliacoes/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamPayload {
    #[serde(rename = "fkCurso")]
    pub course_id: CourseId,
    #[serde(rename = "notaMinima")]
    pub min_score: f64,
    #[serde(rename = "questoes")]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    /// 1-based.
    #[serde(rename = "numeroQuestao")]
    pub number: u32,
    #[serde(rename = "enunciado")]
    pub text: String,
    #[serde(rename = "alternativas")]
    pub alternatives: Vec<AlternativePayload>,
    /// 0-based index into `alternatives`.
    #[serde(rename = "fkAlternativaCorreta")]
    pub correct_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativePayload {
    #[serde(rename = "texto")]
    pub text: String,
    /// 0-based.
    #[serde(rename = "ordemAlternativa")]
    pub order: usize,
}

/// Response to an exam create/update. Bodies vary, so everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedExam {
    #[serde(default, alias = "idAvaliacao", deserialize_with = "lenient_opt_u64")]
    pub id: Option<u64>,
    #[serde(default, alias = "mensagem")]
    pub message: Option<String>,
}

/// Body of `POST /exam/{examId}/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub answers: BTreeMap<QuestionId, AlternativeId>,
}

/// A material as returned by `/videos` or `/apostilas`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MaterialRecord {
    #[serde(alias = "idVideo", alias = "idApostila")]
    pub id: MaterialId,
    #[serde(rename = "fkCurso", default)]
    pub course_id: CourseId,
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "ordem", default, deserialize_with = "lenient_opt_u32")]
    pub order: Option<u32>,
    #[serde(rename = "isHidden", default, deserialize_with = "lenient_bool")]
    pub hidden: bool,
}

impl MaterialRecord {
    pub fn into_material(self, kind: MaterialKind) -> Material {
        Material {
            id: self.id,
            course_id: self.course_id,
            kind,
            title: self.title,
            description: self.description,
            url: self.url,
            order: self.order.unwrap_or(0),
            hidden: self.hidden,
        }
    }
}

/// Body of `PUT /{videos|apostilas}/update-dados/{id}` and the create calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialPayload {
    #[serde(rename = "fkCurso")]
    pub course_id: CourseId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "descricao")]
    pub description: String,
    pub url: String,
    #[serde(rename = "ordem", skip_serializing_if = "Option::is_none", default)]
    pub order: Option<u32>,
    #[serde(rename = "isHidden")]
    pub hidden: bool,
}

impl From<&Material> for MaterialPayload {
    fn from(m: &Material) -> Self {
        Self {
            course_id: m.course_id,
            title: m.title.clone(),
            description: m.description.clone(),
            url: m.url.clone(),
            order: Some(m.order),
            hidden: m.hidden,
        }
    }
}

impl From<&NewMaterial> for MaterialPayload {
    fn from(m: &NewMaterial) -> Self {
        Self {
            course_id: m.course_id,
            title: m.title.clone(),
            description: m.description.clone(),
            url: m.url.clone(),
            order: None,
            hidden: m.hidden,
        }
    }
}

/// Body of the enrollment calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentPayload {
    #[serde(rename = "fkUsuario")]
    pub user_id: UserId,
    #[serde(rename = "fkCurso")]
    pub course_id: CourseId,
}

/// Body of `POST /progresso`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPayload {
    #[serde(rename = "fkUsuario")]
    pub user_id: UserId,
    #[serde(rename = "fkCurso")]
    pub course_id: CourseId,
    #[serde(rename = "tipo")]
    pub kind: MaterialKind,
    #[serde(rename = "fkMaterial")]
    pub material_id: MaterialId,
}

impl CompletionPayload {
    pub fn new(user_id: UserId, material: &Material) -> Self {
        Self {
            user_id,
            course_id: material.course_id,
            kind: material.kind,
            material_id: material.id,
        }
    }
}

/// One entry of `GET /progresso/usuario/{userId}/curso/{courseId}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionRecord {
    #[serde(rename = "tipo", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(rename = "fkMaterial", alias = "idMaterial", deserialize_with = "lenient_opt_u64", default)]
    pub material_id: Option<MaterialId>,
}

impl CompletionRecord {
    /// `None` for entries of an unknown kind or without an id.
    pub fn key(&self) -> Option<MaterialKey> {
        Some(MaterialKey {
            kind: self.kind.parse().ok()?,
            id: self.material_id?,
        })
    }
}

/// Body of `POST /usuarios/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
}

// ---------------------------------------------------------------------------
// Lenient decoders
// ---------------------------------------------------------------------------

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn unsigned_from(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A number, or a string holding one (`"6.50"`, `"6,5"`). `null` is zero.
pub fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    if value.is_null() {
        return Ok(0.0);
    }
    number_from(&value).ok_or_else(|| D::Error::custom(format!("expected a number, got {value}")))
}

/// An optional unsigned id; `null` and empty strings become `None`.
pub fn lenient_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(d)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        other => unsigned_from(other)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an id, got {other}"))),
    }
}

pub fn lenient_opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    lenient_opt_u64(d)?
        .map(|n| u32::try_from(n).map_err(D::Error::custom))
        .transpose()
}

/// Like [`lenient_opt_u32`], with `null` read as zero.
pub fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(lenient_opt_u32(d)?.unwrap_or(0))
}

pub fn lenient_opt_usize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
    lenient_opt_u64(d)?
        .map(|n| usize::try_from(n).map_err(D::Error::custom))
        .transpose()
}

/// A string, or a number rendered as one.
pub fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    coerce_to_string(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a string or number, got {value}")))
}

/// `true`/`false`, `0`/`1`, or their string forms.
pub fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(d)?;
    match &value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
        },
        other => Err(D::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

/// String form of a scalar JSON value, used to compare answers and ids that
/// may arrive as either numbers or strings. `null` has no string form.
pub fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
