//! Async collaborator traits for the REST backend.
//!
//! These are implemented by `coursekit-client` (HTTP and in-memory mock).
//! The state machines in this crate only ever see the traits.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{
    AnswerSheet, Attempt, CourseId, Exam, ExamId, Material, MaterialId, MaterialKey, MaterialKind,
    NewMaterial, SubmissionResult, TakeableExam, UserId,
};
use crate::wire::{ExamPayload, SavedExam, SubmitRequest};

/// Exam authoring endpoints (`/avaliacoes`).
#[async_trait]
pub trait ExamApi: Send + Sync {
    /// The course's exam, or `None` if it has none (404 included).
    async fn exam_by_course(&self, course_id: CourseId) -> Result<Option<Exam>, ApiError>;

    async fn create_exam(&self, payload: &ExamPayload) -> Result<SavedExam, ApiError>;

    async fn update_exam(
        &self,
        exam_id: ExamId,
        payload: &ExamPayload,
    ) -> Result<SavedExam, ApiError>;

    /// Delete an exam. Without `force` the server answers 409 when
    /// responses exist; with `force` it deletes them too.
    async fn delete_exam(&self, exam_id: ExamId, force: bool) -> Result<(), ApiError>;
}

/// Exam taking endpoints (`/exam`).
#[async_trait]
pub trait TakingApi: Send + Sync {
    async fn exam_for_taking(&self, exam_id: ExamId) -> Result<TakeableExam, ApiError>;

    async fn submit_answers(
        &self,
        exam_id: ExamId,
        request: &SubmitRequest,
    ) -> Result<SubmissionResult, ApiError>;
}

/// Attempt history and answer sheets.
#[async_trait]
pub trait AttemptApi: Send + Sync {
    /// All attempts by a user; empty when the user has none (404 included).
    async fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<Attempt>, ApiError>;

    async fn answer_sheet(&self, exam_id: ExamId, user_id: UserId)
        -> Result<AnswerSheet, ApiError>;
}

/// Video and PDF materials.
#[async_trait]
pub trait MaterialApi: Send + Sync {
    /// Materials of one kind for a course; empty when none (404 included).
    async fn list_materials(
        &self,
        course_id: CourseId,
        kind: MaterialKind,
    ) -> Result<Vec<Material>, ApiError>;

    async fn create_material(&self, material: &NewMaterial) -> Result<(), ApiError>;

    /// Persist every editable field of a material, order and visibility included.
    async fn update_material(&self, material: &Material) -> Result<(), ApiError>;

    async fn delete_material(&self, kind: MaterialKind, id: MaterialId) -> Result<(), ApiError>;

    /// Materials the user has finished in a course; empty when none (404 included).
    async fn completed_materials(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<MaterialKey>, ApiError>;

    /// Record that the user finished a material. The server answers 409 for
    /// a completion it already has.
    async fn mark_completed(&self, user_id: UserId, material: &Material) -> Result<(), ApiError>;
}

/// Enrollment bookkeeping (`/matriculas`).
#[async_trait]
pub trait EnrollmentApi: Send + Sync {
    async fn ensure_enrollment(&self, user_id: UserId, course_id: CourseId)
        -> Result<(), ApiError>;

    async fn update_last_access(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), ApiError>;
}

/// Everything a full backend provides.
pub trait Backend: ExamApi + TakingApi + AttemptApi + MaterialApi + EnrollmentApi {}

impl<T> Backend for T where T: ExamApi + TakingApi + AttemptApi + MaterialApi + EnrollmentApi {}
