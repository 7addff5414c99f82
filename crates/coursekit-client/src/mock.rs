//! In-memory backend for testing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use coursekit_core::model::{
    Alternative, AnswerSheet, Attempt, CourseId, Exam, ExamId, Material, MaterialId,
    MaterialKey, MaterialKind, NewMaterial, Question, SheetAlternative, SheetQuestion,
    SubmissionResult, TakeableAlternative, TakeableExam, TakeableQuestion, UserId,
};
use coursekit_core::traits::{AttemptApi, EnrollmentApi, ExamApi, MaterialApi, TakingApi};
use coursekit_core::wire::{ExamPayload, SavedExam, SubmitRequest};
use coursekit_core::ApiError;

#[derive(Default)]
struct State {
    exams: BTreeMap<ExamId, Exam>,
    next_id: u64,
    responses: HashMap<ExamId, u64>,
    attempts: Vec<Attempt>,
    sheets: HashMap<(ExamId, UserId), AnswerSheet>,
    materials: Vec<Material>,
    failing_updates: BTreeSet<MaterialKey>,
    enrollments: BTreeSet<(UserId, CourseId)>,
    last_access: HashMap<(UserId, CourseId), u32>,
    completions: BTreeSet<(UserId, CourseId, MaterialKey)>,
    calls: Vec<String>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn exam(&self, exam_id: ExamId) -> Result<&Exam, ApiError> {
        self.exams
            .get(&exam_id)
            .ok_or_else(|| ApiError::NotFound(format!("Avaliação {exam_id} não encontrada")))
    }

    fn build_exam(&mut self, id: ExamId, payload: &ExamPayload) -> Exam {
        let mut questions = Vec::with_capacity(payload.questions.len());
        for q in &payload.questions {
            let question_id = self.next_id();
            let mut alternatives = Vec::with_capacity(q.alternatives.len());
            for a in &q.alternatives {
                alternatives.push(Alternative {
                    id: self.next_id(),
                    text: a.text.clone(),
                    order: a.order as u32,
                });
            }
            questions.push(Question {
                id: question_id,
                number: q.number,
                text: q.text.clone(),
                alternatives,
                correct_index: Some(q.correct_index),
            });
        }
        Exam {
            id,
            course_id: payload.course_id,
            min_score: payload.min_score,
            questions,
        }
    }
}

/// A backend that keeps everything in memory and behaves like the REST
/// server for the flows coursekit drives: one exam per course, forced
/// deletion, server-side grading, answer sheets, materials, enrollment.
///
/// Every call is recorded so tests can assert on what was (not) sent.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    /// Store an exam as the server would after a create.
    pub fn insert_exam(&self, payload: &ExamPayload) -> ExamId {
        let mut state = self.state();
        let id = state.next_id();
        let exam = state.build_exam(id, payload);
        state.exams.insert(id, exam);
        id
    }

    /// Pretend `count` responses exist for an exam.
    pub fn set_response_count(&self, exam_id: ExamId, count: u64) {
        self.state().responses.insert(exam_id, count);
    }

    pub fn add_attempt(&self, attempt: Attempt) {
        self.state().attempts.push(attempt);
    }

    pub fn set_answer_sheet(&self, exam_id: ExamId, user_id: UserId, sheet: AnswerSheet) {
        self.state().sheets.insert((exam_id, user_id), sheet);
    }

    pub fn add_material(&self, material: Material) {
        self.state().materials.push(material);
    }

    /// Make every update of this material fail with a 500.
    pub fn fail_updates_for(&self, key: MaterialKey) {
        self.state().failing_updates.insert(key);
    }

    pub fn exams(&self) -> Vec<Exam> {
        self.state().exams.values().cloned().collect()
    }

    pub fn materials(&self) -> Vec<Material> {
        self.state().materials.clone()
    }

    pub fn is_enrolled(&self, user_id: UserId, course_id: CourseId) -> bool {
        self.state().enrollments.contains(&(user_id, course_id))
    }

    pub fn last_access_count(&self, user_id: UserId, course_id: CourseId) -> u32 {
        self.state()
            .last_access
            .get(&(user_id, course_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn completions(&self, user_id: UserId, course_id: CourseId) -> Vec<MaterialKey> {
        self.state()
            .completions
            .iter()
            .filter(|(u, c, _)| *u == user_id && *c == course_id)
            .map(|(_, _, key)| *key)
            .collect()
    }

    /// Calls received so far, as `"METHOD path"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }
}

fn conflict(body: Value) -> ApiError {
    ApiError::from_status(409, &body.to_string())
}

#[async_trait]
impl ExamApi for MockBackend {
    async fn exam_by_course(&self, course_id: CourseId) -> Result<Option<Exam>, ApiError> {
        let state = self.record(format!("GET /avaliacoes/curso/{course_id}"));
        Ok(state
            .exams
            .values()
            .find(|e| e.course_id == course_id)
            .cloned())
    }

    async fn create_exam(&self, payload: &ExamPayload) -> Result<SavedExam, ApiError> {
        let mut state = self.record("POST /avaliacoes".into());
        if state.exams.values().any(|e| e.course_id == payload.course_id) {
            return Err(conflict(
                json!({"message": "Curso já possui avaliação", "fkCurso": payload.course_id}),
            ));
        }
        let id = state.next_id();
        let exam = state.build_exam(id, payload);
        state.exams.insert(id, exam);
        Ok(SavedExam {
            id: Some(id),
            message: Some("Avaliação criada com sucesso".into()),
        })
    }

    async fn update_exam(
        &self,
        exam_id: ExamId,
        payload: &ExamPayload,
    ) -> Result<SavedExam, ApiError> {
        let mut state = self.record(format!("PUT /avaliacoes/{exam_id}"));
        state.exam(exam_id)?;
        let exam = state.build_exam(exam_id, payload);
        state.exams.insert(exam_id, exam);
        Ok(SavedExam {
            id: Some(exam_id),
            message: Some("Avaliação atualizada com sucesso".into()),
        })
    }

    async fn delete_exam(&self, exam_id: ExamId, force: bool) -> Result<(), ApiError> {
        let mut state = self.record(format!("DELETE /avaliacoes/{exam_id}?force={force}"));
        state.exam(exam_id)?;
        let responses = state.responses.get(&exam_id).copied().unwrap_or(0);
        if responses > 0 && !force {
            return Err(conflict(json!({
                "message": "A avaliação possui respostas.",
                "respostasCount": responses
            })));
        }
        state.exams.remove(&exam_id);
        state.responses.remove(&exam_id);
        state.attempts.retain(|a| a.exam_id != Some(exam_id));
        state.sheets.retain(|(exam, _), _| *exam != exam_id);
        Ok(())
    }
}

#[async_trait]
impl TakingApi for MockBackend {
    async fn exam_for_taking(&self, exam_id: ExamId) -> Result<TakeableExam, ApiError> {
        let state = self.record(format!("GET /exam/{exam_id}"));
        let exam = state.exam(exam_id)?;
        Ok(TakeableExam {
            id: exam.id,
            questions: exam
                .questions
                .iter()
                .map(|q| TakeableQuestion {
                    id: q.id,
                    text: q.text.clone(),
                    alternatives: q
                        .ordered_alternatives()
                        .into_iter()
                        .map(|a| TakeableAlternative {
                            id: a.id,
                            text: a.text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        })
    }

    async fn submit_answers(
        &self,
        exam_id: ExamId,
        request: &SubmitRequest,
    ) -> Result<SubmissionResult, ApiError> {
        let mut state = self.record(format!("POST /exam/{exam_id}/submit"));
        let exam = state.exam(exam_id)?.clone();
        if request.answers.is_empty() {
            return Err(ApiError::Validation("Nenhuma resposta enviada.".into()));
        }

        let mut correct = 0u32;
        let mut user_answers = BTreeMap::new();
        let mut correct_answers = BTreeMap::new();
        for question in &exam.questions {
            let right = question.correct_alternative().map(|a| a.id);
            let chosen = request.answers.get(&question.id).copied();
            if let Some(right) = right {
                correct_answers.insert(question.id.to_string(), json!(right.to_string()));
            }
            if let Some(chosen) = chosen {
                user_answers.insert(question.id.to_string(), json!(chosen));
            }
            if chosen.is_some() && chosen == right {
                correct += 1;
            }
        }
        let total = exam.questions.len() as u32;
        let score = if total == 0 {
            0.0
        } else {
            f64::from(correct) * 10.0 / f64::from(total)
        };

        let attempt_id = state.next_id();
        state.attempts.push(Attempt {
            id: attempt_id,
            exam_id: Some(exam_id),
            user_id: request.user_id,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            correct_count: Some(correct),
            total_count: Some(total),
        });
        let sheet = AnswerSheet {
            questions: exam
                .questions
                .iter()
                .map(|q| SheetQuestion {
                    id: q.id.to_string(),
                    number: Some(q.number),
                    text: q.text.clone(),
                    alternatives: q
                        .ordered_alternatives()
                        .into_iter()
                        .map(|a| SheetAlternative {
                            id: a.id.to_string(),
                            text: a.text.clone(),
                        })
                        .collect(),
                })
                .collect(),
            user_answers,
            correct_answers,
        };
        state.sheets.insert((exam_id, request.user_id), sheet);
        *state.responses.entry(exam_id).or_default() += 1;

        Ok(SubmissionResult {
            correct: Some(correct),
            total: Some(total),
            score: Some(score),
            passed: Some(score >= exam.min_score),
            message: Some("Respostas enviadas com sucesso".into()),
        })
    }
}

#[async_trait]
impl AttemptApi for MockBackend {
    async fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<Attempt>, ApiError> {
        let state = self.record(format!("GET /tentativas/usuario/{user_id}"));
        Ok(state
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn answer_sheet(
        &self,
        exam_id: ExamId,
        user_id: UserId,
    ) -> Result<AnswerSheet, ApiError> {
        let state = self.record(format!("GET /exams/{exam_id}/answersheet/{user_id}"));
        state
            .sheets
            .get(&(exam_id, user_id))
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Folha de respostas não encontrada".into()))
    }
}

#[async_trait]
impl MaterialApi for MockBackend {
    async fn list_materials(
        &self,
        course_id: CourseId,
        kind: MaterialKind,
    ) -> Result<Vec<Material>, ApiError> {
        let state = self.record(format!("GET /{}/curso/{course_id}", kind.collection()));
        Ok(state
            .materials
            .iter()
            .filter(|m| m.course_id == course_id && m.kind == kind)
            .cloned()
            .collect())
    }

    async fn create_material(&self, material: &NewMaterial) -> Result<(), ApiError> {
        let mut state = self.record(format!("POST /{}", material.kind.collection()));
        let id = state
            .materials
            .iter()
            .filter(|m| m.kind == material.kind)
            .map(|m| m.id)
            .max()
            .unwrap_or(0)
            + 1;
        let order = state
            .materials
            .iter()
            .filter(|m| m.course_id == material.course_id)
            .count() as u32
            + 1;
        state.materials.push(Material {
            id,
            course_id: material.course_id,
            kind: material.kind,
            title: material.title.clone(),
            description: material.description.clone(),
            url: material.url.clone(),
            order,
            hidden: material.hidden,
        });
        Ok(())
    }

    async fn update_material(&self, material: &Material) -> Result<(), ApiError> {
        let mut state = self.record(format!(
            "PUT /{}/update-dados/{}",
            material.kind.collection(),
            material.id
        ));
        if state.failing_updates.contains(&material.key()) {
            return Err(ApiError::from_status(500, "Erro interno"));
        }
        let stored = state
            .materials
            .iter_mut()
            .find(|m| m.key() == material.key())
            .ok_or_else(|| ApiError::NotFound(format!("{} não encontrado", material.key())))?;
        *stored = material.clone();
        Ok(())
    }

    async fn delete_material(&self, kind: MaterialKind, id: MaterialId) -> Result<(), ApiError> {
        let mut state = self.record(format!("DELETE /{}/{id}", kind.collection()));
        let before = state.materials.len();
        state.materials.retain(|m| !(m.kind == kind && m.id == id));
        if state.materials.len() == before {
            return Err(ApiError::NotFound(format!("{kind}#{id} não encontrado")));
        }
        Ok(())
    }

    async fn completed_materials(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<MaterialKey>, ApiError> {
        let state = self.record(format!("GET /progresso/usuario/{user_id}/curso/{course_id}"));
        Ok(state
            .completions
            .iter()
            .filter(|(u, c, _)| *u == user_id && *c == course_id)
            .map(|(_, _, key)| *key)
            .collect())
    }

    async fn mark_completed(&self, user_id: UserId, material: &Material) -> Result<(), ApiError> {
        let mut state = self.record("POST /progresso".into());
        if !state
            .completions
            .insert((user_id, material.course_id, material.key()))
        {
            return Err(conflict(json!({"message": "Material já concluído"})));
        }
        Ok(())
    }
}

#[async_trait]
impl EnrollmentApi for MockBackend {
    async fn ensure_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), ApiError> {
        let mut state = self.record("POST /matriculas".into());
        if !state.enrollments.insert((user_id, course_id)) {
            return Err(conflict(json!({"message": "Usuário já matriculado"})));
        }
        Ok(())
    }

    async fn update_last_access(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), ApiError> {
        let mut state = self.record("PUT /matriculas/ultimo-acesso".into());
        *state.last_access.entry((user_id, course_id)).or_default() += 1;
        Ok(())
    }
}
