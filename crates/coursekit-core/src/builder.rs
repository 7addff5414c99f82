//! Exam authoring state machine.
//!
//! [`ExamBuilder`] holds an editable draft of an exam: up to
//! [`MAX_QUESTIONS`] questions, each with 2 to [`MAX_ALTERNATIVES`]
//! alternatives and a single correct one, plus a minimum passing score.
//! The draft is validated and sent as one create or update call.
//!
//! ```text
//! Empty -> Editing -> Saving -> Saved
//!             ^          |
//!             +-- Error <+
//! ```

use std::fmt;

use thiserror::Error;

use crate::error::ApiError;
use crate::events::{EventBus, PortalEvent, ToastLevel};
use crate::model::{
    AlternativeId, CourseId, Exam, ExamId, QuestionId, DEFAULT_ALTERNATIVES, MAX_ALTERNATIVES,
    MAX_QUESTIONS, MIN_ALTERNATIVES, MIN_SCORE_CEILING, MIN_SCORE_FLOOR,
};
use crate::traits::ExamApi;
use crate::wire::{AlternativePayload, ExamPayload, QuestionPayload, SavedExam};

/// Shown when the course already has an exam (409 on create).
pub const EXAM_EXISTS_MESSAGE: &str = "Já existe uma avaliação cadastrada para este curso.";

/// Client-side validation and editing errors. No network call is made when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuilderError {
    #[error("Limite de {max} questões atingido.", max = MAX_QUESTIONS)]
    QuestionLimit,

    #[error("Limite de {max} alternativas atingido na questão {position}.", max = MAX_ALTERNATIVES)]
    AlternativeLimit { position: usize },

    #[error("A questão {position} precisa ter pelo menos {min} alternativas.", min = MIN_ALTERNATIVES)]
    TooFewAlternatives { position: usize },

    #[error("Questão {0} não encontrada.")]
    UnknownQuestion(QuestionId),

    #[error("Alternativa {alternative_id} não encontrada na questão {position}.")]
    UnknownAlternative {
        position: usize,
        alternative_id: AlternativeId,
    },

    #[error("Adicione pelo menos uma questão.")]
    NoQuestions,

    #[error("Informe a nota mínima.")]
    MissingMinScore,

    #[error("A nota mínima deve estar entre 0 e 10 (recebido {0}).")]
    MinScoreOutOfRange(f64),

    #[error("A questão {position} precisa ter exatamente uma alternativa correta.")]
    MissingCorrectAlternative { position: usize },

    #[error("O enunciado da questão {position} está vazio.")]
    EmptyQuestionText { position: usize },

    #[error("A alternativa {alternative} da questão {position} está vazia.")]
    EmptyAlternativeText { position: usize, alternative: usize },
}

/// Why a save did not go through.
#[derive(Debug, Clone, Error)]
pub enum SaveError {
    #[error(transparent)]
    Invalid(#[from] BuilderError),

    #[error("{}", EXAM_EXISTS_MESSAGE)]
    AlreadyExists,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SaveError {
    /// Text for the inline error block.
    pub fn user_message(&self) -> String {
        match self {
            SaveError::Invalid(e) => e.to_string(),
            SaveError::AlreadyExists => EXAM_EXISTS_MESSAGE.to_string(),
            SaveError::Api(e) => e.user_message(),
        }
    }

    /// `true` when the save failed before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, SaveError::Invalid(_))
    }
}

/// Where the builder is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    Editing,
    Saving,
    Saved,
    Error(String),
}

/// What a successful save did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new exam was created and the form was reset.
    Created(SavedExam),
    /// An existing exam was replaced; the form keeps its contents.
    Updated(SavedExam),
}

/// An alternative being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftAlternative {
    pub id: AlternativeId,
    pub text: String,
}

/// A question being edited. The correct alternative is a single slot, so at
/// most one alternative can ever be marked correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftQuestion {
    pub id: QuestionId,
    pub text: String,
    pub alternatives: Vec<DraftAlternative>,
    correct: Option<AlternativeId>,
}

impl DraftQuestion {
    fn blank(id: QuestionId) -> Self {
        Self {
            id,
            text: String::new(),
            alternatives: (1..=DEFAULT_ALTERNATIVES as AlternativeId)
                .map(|id| DraftAlternative {
                    id,
                    text: String::new(),
                })
                .collect(),
            correct: None,
        }
    }

    pub fn is_correct(&self, alternative_id: AlternativeId) -> bool {
        self.correct == Some(alternative_id)
    }

    pub fn correct_alternative(&self) -> Option<AlternativeId> {
        self.correct
    }

    /// 0-based index of the correct alternative, if one is marked and still present.
    pub fn correct_index(&self) -> Option<usize> {
        let correct = self.correct?;
        self.alternatives.iter().position(|a| a.id == correct)
    }

    fn next_alternative_id(&self) -> AlternativeId {
        self.alternatives.iter().map(|a| a.id).max().unwrap_or(0) + 1
    }
}

/// Editable exam draft bound to one course.
pub struct ExamBuilder {
    course_id: CourseId,
    exam_id: Option<ExamId>,
    min_score: Option<f64>,
    questions: Vec<DraftQuestion>,
    state: BuilderState,
    on_saved: Option<Box<dyn FnMut(&SavedExam) + Send>>,
    events: Option<EventBus>,
}

impl fmt::Debug for ExamBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamBuilder")
            .field("course_id", &self.course_id)
            .field("exam_id", &self.exam_id)
            .field("min_score", &self.min_score)
            .field("questions", &self.questions)
            .field("state", &self.state)
            .field("on_saved", &self.on_saved.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ExamBuilder {
    /// Start a new exam for a course. Saving creates it.
    pub fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            exam_id: None,
            min_score: None,
            questions: Vec::new(),
            state: BuilderState::Empty,
            on_saved: None,
            events: None,
        }
    }

    /// Load an existing exam for editing. Saving updates it.
    ///
    /// Draft ids are positional (1..n); server ids never reach the payload.
    pub fn from_exam(exam: &Exam) -> Self {
        let mut questions: Vec<_> = exam.questions.iter().collect();
        questions.sort_by_key(|q| q.number);

        let drafts = questions
            .into_iter()
            .zip(1..)
            .map(|(question, id)| {
                let alternatives: Vec<DraftAlternative> = question
                    .ordered_alternatives()
                    .into_iter()
                    .zip(1..)
                    .map(|(alt, alt_id)| DraftAlternative {
                        id: alt_id,
                        text: alt.text.clone(),
                    })
                    .collect();
                let correct = question
                    .correct_index
                    .and_then(|i| alternatives.get(i))
                    .map(|a| a.id);
                DraftQuestion {
                    id,
                    text: question.text.clone(),
                    alternatives,
                    correct,
                }
            })
            .collect();

        Self {
            course_id: exam.course_id,
            exam_id: Some(exam.id),
            min_score: Some(exam.min_score),
            questions: drafts,
            state: BuilderState::Editing,
            on_saved: None,
            events: None,
        }
    }

    /// Bind the draft to an existing exam so saving updates it.
    pub fn with_exam_id(mut self, exam_id: ExamId) -> Self {
        self.exam_id = Some(exam_id);
        self
    }

    /// Callback fired after a successful update.
    pub fn with_on_saved(mut self, callback: impl FnMut(&SavedExam) + Send + 'static) -> Self {
        self.on_saved = Some(Box::new(callback));
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn exam_id(&self) -> Option<ExamId> {
        self.exam_id
    }

    pub fn is_update(&self) -> bool {
        self.exam_id.is_some()
    }

    pub fn min_score(&self) -> Option<f64> {
        self.min_score
    }

    pub fn questions(&self) -> &[DraftQuestion] {
        &self.questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&DraftQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    fn touch(&mut self) {
        if self.state != BuilderState::Saving {
            self.state = BuilderState::Editing;
        }
    }

    fn position_of(&self, id: QuestionId) -> Result<usize, BuilderError> {
        self.questions
            .iter()
            .position(|q| q.id == id)
            .ok_or(BuilderError::UnknownQuestion(id))
    }

    fn next_question_id(&self) -> QuestionId {
        self.questions.iter().map(|q| q.id).max().unwrap_or(0) + 1
    }

    /// Append a question with three blank alternatives.
    pub fn add_question(&mut self) -> Result<QuestionId, BuilderError> {
        if self.questions.len() >= MAX_QUESTIONS {
            return Err(BuilderError::QuestionLimit);
        }
        let id = self.next_question_id();
        self.questions.push(DraftQuestion::blank(id));
        self.touch();
        Ok(id)
    }

    /// Append a fully specified question. `correct` is a 0-based index.
    pub fn add_question_with(
        &mut self,
        text: impl Into<String>,
        alternatives: Vec<String>,
        correct: Option<usize>,
    ) -> Result<QuestionId, BuilderError> {
        let position = self.questions.len() + 1;
        if self.questions.len() >= MAX_QUESTIONS {
            return Err(BuilderError::QuestionLimit);
        }
        if alternatives.len() > MAX_ALTERNATIVES {
            return Err(BuilderError::AlternativeLimit { position });
        }
        if alternatives.len() < MIN_ALTERNATIVES {
            return Err(BuilderError::TooFewAlternatives { position });
        }

        let alternatives: Vec<DraftAlternative> = alternatives
            .into_iter()
            .zip(1..)
            .map(|(text, id)| DraftAlternative { id, text })
            .collect();
        let correct = match correct {
            Some(index) => Some(
                alternatives
                    .get(index)
                    .map(|a| a.id)
                    .ok_or(BuilderError::UnknownAlternative {
                        position,
                        alternative_id: index as AlternativeId + 1,
                    })?,
            ),
            None => None,
        };

        let id = self.next_question_id();
        self.questions.push(DraftQuestion {
            id,
            text: text.into(),
            alternatives,
            correct,
        });
        self.touch();
        Ok(id)
    }

    /// Remove a question by id. Remaining ids are left as they are.
    pub fn remove_question(&mut self, id: QuestionId) -> bool {
        let before = self.questions.len();
        self.questions.retain(|q| q.id != id);
        let removed = self.questions.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Append a blank alternative to a question.
    pub fn add_alternative(&mut self, question_id: QuestionId) -> Result<AlternativeId, BuilderError> {
        let index = self.position_of(question_id)?;
        let question = &mut self.questions[index];
        if question.alternatives.len() >= MAX_ALTERNATIVES {
            return Err(BuilderError::AlternativeLimit {
                position: index + 1,
            });
        }
        let id = question.next_alternative_id();
        question.alternatives.push(DraftAlternative {
            id,
            text: String::new(),
        });
        self.touch();
        Ok(id)
    }

    /// Mark one alternative as the correct answer, replacing any previous choice.
    pub fn set_correct_alternative(
        &mut self,
        question_id: QuestionId,
        alternative_id: AlternativeId,
    ) -> Result<(), BuilderError> {
        let index = self.position_of(question_id)?;
        let question = &mut self.questions[index];
        if !question.alternatives.iter().any(|a| a.id == alternative_id) {
            return Err(BuilderError::UnknownAlternative {
                position: index + 1,
                alternative_id,
            });
        }
        question.correct = Some(alternative_id);
        self.touch();
        Ok(())
    }

    /// Clicking an alternative's "correct" control. Single-select: clicking the
    /// already-correct alternative keeps it correct.
    pub fn toggle_correct_answer(
        &mut self,
        question_id: QuestionId,
        alternative_id: AlternativeId,
    ) -> Result<(), BuilderError> {
        self.set_correct_alternative(question_id, alternative_id)
    }

    pub fn set_question_text(
        &mut self,
        question_id: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), BuilderError> {
        let index = self.position_of(question_id)?;
        self.questions[index].text = text.into();
        self.touch();
        Ok(())
    }

    pub fn set_alternative_text(
        &mut self,
        question_id: QuestionId,
        alternative_id: AlternativeId,
        text: impl Into<String>,
    ) -> Result<(), BuilderError> {
        let index = self.position_of(question_id)?;
        let alternative = self.questions[index]
            .alternatives
            .iter_mut()
            .find(|a| a.id == alternative_id)
            .ok_or(BuilderError::UnknownAlternative {
                position: index + 1,
                alternative_id,
            })?;
        alternative.text = text.into();
        self.touch();
        Ok(())
    }

    /// Set the minimum passing score. The value is kept even when out of
    /// range, so the error also blocks the next save.
    pub fn set_min_score(&mut self, value: f64) -> Result<(), BuilderError> {
        self.min_score = Some(value);
        self.touch();
        check_min_score(value)
    }

    /// Check the draft in save order: questions, score, correct answers, texts.
    pub fn validate(&self) -> Result<(), BuilderError> {
        if self.questions.is_empty() {
            return Err(BuilderError::NoQuestions);
        }

        let min_score = self.min_score.ok_or(BuilderError::MissingMinScore)?;
        check_min_score(min_score)?;

        for (index, question) in self.questions.iter().enumerate() {
            if question.correct_index().is_none() {
                return Err(BuilderError::MissingCorrectAlternative {
                    position: index + 1,
                });
            }
        }

        for (index, question) in self.questions.iter().enumerate() {
            let position = index + 1;
            if question.text.trim().is_empty() {
                return Err(BuilderError::EmptyQuestionText { position });
            }
            if question.alternatives.len() < MIN_ALTERNATIVES {
                return Err(BuilderError::TooFewAlternatives { position });
            }
            if let Some(alt_index) = question
                .alternatives
                .iter()
                .position(|a| a.text.trim().is_empty())
            {
                return Err(BuilderError::EmptyAlternativeText {
                    position,
                    alternative: alt_index + 1,
                });
            }
        }

        Ok(())
    }

    /// Validate and convert the draft into the backend's wire format.
    pub fn to_payload(&self) -> Result<ExamPayload, BuilderError> {
        self.validate()?;

        let questions = self
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| QuestionPayload {
                number: index as u32 + 1,
                text: question.text.trim().to_string(),
                alternatives: question
                    .alternatives
                    .iter()
                    .enumerate()
                    .map(|(order, alt)| AlternativePayload {
                        text: alt.text.trim().to_string(),
                        order,
                    })
                    .collect(),
                // validate() guarantees a correct alternative
                correct_index: question.correct_index().unwrap_or_default(),
            })
            .collect();

        Ok(ExamPayload {
            course_id: self.course_id,
            min_score: self.min_score.unwrap_or_default(),
            questions,
        })
    }

    /// Validate and submit the draft as one create or update call.
    ///
    /// A create resets the form; an update fires the `on_saved` callback and
    /// leaves the form populated.
    pub async fn save(&mut self, api: &dyn ExamApi) -> Result<SaveOutcome, SaveError> {
        let payload = match self.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.state = BuilderState::Error(e.to_string());
                return Err(e.into());
            }
        };

        self.state = BuilderState::Saving;
        let result = match self.exam_id {
            None => api.create_exam(&payload).await.map_err(|e| {
                if e.is_conflict() {
                    SaveError::AlreadyExists
                } else {
                    SaveError::Api(e)
                }
            }),
            Some(exam_id) => api
                .update_exam(exam_id, &payload)
                .await
                .map_err(SaveError::Api),
        };

        let saved = match result {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(course_id = self.course_id, error = %e, "exam save failed");
                self.state = BuilderState::Error(e.user_message());
                return Err(e);
            }
        };

        if let Some(events) = &self.events {
            events.publish(PortalEvent::ExamSaved {
                course_id: self.course_id,
                exam_id: saved.id.or(self.exam_id),
            });
            events.toast(ToastLevel::Success, "Avaliação salva com sucesso.");
        }

        let outcome = if self.exam_id.is_some() {
            if let Some(callback) = self.on_saved.as_mut() {
                callback(&saved);
            }
            SaveOutcome::Updated(saved)
        } else {
            self.reset();
            SaveOutcome::Created(saved)
        };
        self.state = BuilderState::Saved;
        Ok(outcome)
    }

    /// Clear the draft, keeping the course binding.
    pub fn reset(&mut self) {
        self.questions.clear();
        self.min_score = None;
        self.state = BuilderState::Empty;
    }
}

fn check_min_score(value: f64) -> Result<(), BuilderError> {
    if value.is_finite() && (MIN_SCORE_FLOOR..=MIN_SCORE_CEILING).contains(&value) {
        Ok(())
    } else {
        Err(BuilderError::MinScoreOutOfRange(value))
    }
}
