//! Exam taking: one answer per question, all questions before submit.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::events::{EventBus, PortalEvent};
use crate::model::{AlternativeId, QuestionId, SubmissionResult, TakeableExam, UserId};
use crate::submission::{self, SubmitError, INCOMPLETE_MESSAGE};
use crate::traits::TakingApi;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TakerError {
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(QuestionId),

    #[error("alternative {alternative} does not belong to question {question}")]
    UnknownAlternative {
        question: QuestionId,
        alternative: AlternativeId,
    },
}

/// Collects answers for a single exam and submits them once complete.
#[derive(Debug)]
pub struct ExamTaker {
    exam: TakeableExam,
    answers: BTreeMap<QuestionId, AlternativeId>,
    submitting: bool,
    warning: Option<String>,
    result: Option<SubmissionResult>,
    events: Option<EventBus>,
}

impl ExamTaker {
    pub fn new(exam: TakeableExam) -> Self {
        Self {
            exam,
            answers: BTreeMap::new(),
            submitting: false,
            warning: None,
            result: None,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn exam(&self) -> &TakeableExam {
        &self.exam
    }

    /// Choose an alternative, replacing any previous choice for the question.
    pub fn answer(
        &mut self,
        question_id: QuestionId,
        alternative_id: AlternativeId,
    ) -> Result<(), TakerError> {
        let question = self
            .exam
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(TakerError::UnknownQuestion(question_id))?;
        if !question.alternatives.iter().any(|a| a.id == alternative_id) {
            return Err(TakerError::UnknownAlternative {
                question: question_id,
                alternative: alternative_id,
            });
        }
        self.answers.insert(question_id, alternative_id);
        if self.is_complete() {
            self.warning = None;
        }
        Ok(())
    }

    pub fn answer_for(&self, question_id: QuestionId) -> Option<AlternativeId> {
        self.answers.get(&question_id).copied()
    }

    pub fn answers(&self) -> &BTreeMap<QuestionId, AlternativeId> {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn question_count(&self) -> usize {
        self.exam.questions.len()
    }

    pub fn is_complete(&self) -> bool {
        self.answered_count() >= self.question_count()
    }

    /// 1-based positions of the questions still unanswered.
    pub fn unanswered_positions(&self) -> Vec<usize> {
        self.exam
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| !self.answers.contains_key(&q.id))
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// The blocking warning from the last rejected submit, if any.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn result(&self) -> Option<&SubmissionResult> {
        self.result.as_ref()
    }

    /// Submit the answers. Incomplete answer sets are rejected before any
    /// request is made.
    pub async fn submit(
        &mut self,
        api: &dyn TakingApi,
        user_id: UserId,
    ) -> Result<SubmissionResult, SubmitError> {
        if self.submitting {
            return Err(SubmitError::InProgress);
        }
        if !self.is_complete() {
            self.warning = Some(INCOMPLETE_MESSAGE.to_string());
            return Err(SubmitError::Incomplete {
                answered: self.answered_count(),
                total: self.question_count(),
            });
        }

        self.warning = None;
        let outcome = {
            let _submitting = SubmittingFlag::raise(&mut self.submitting);
            submission::submit_answers(api, self.exam.id, user_id, &self.answers).await
        };

        let result = outcome?;
        if let Some(events) = &self.events {
            events.publish(PortalEvent::AttemptSubmitted {
                exam_id: self.exam.id,
                user_id,
            });
        }
        self.result = Some(result.clone());
        Ok(result)
    }
}

/// Holds `submitting` up for one request. Lowered on drop, so a cancelled
/// submit does not lock the taker.
struct SubmittingFlag<'a>(&'a mut bool);

impl<'a> SubmittingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for SubmittingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::model::{ExamId, TakeableAlternative, TakeableQuestion};
    use crate::wire::SubmitRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Answers after a long pause.
    #[derive(Default)]
    struct SlowApi {
        submits: AtomicU32,
    }

    #[async_trait]
    impl TakingApi for SlowApi {
        async fn exam_for_taking(&self, _: ExamId) -> Result<TakeableExam, ApiError> {
            Ok(two_question_exam())
        }

        async fn submit_answers(
            &self,
            _: ExamId,
            _: &SubmitRequest,
        ) -> Result<SubmissionResult, ApiError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(SubmissionResult {
                correct: Some(2),
                total: Some(2),
                ..Default::default()
            })
        }
    }

    fn two_question_exam() -> TakeableExam {
        let question = |id: QuestionId| TakeableQuestion {
            id,
            text: format!("Questão {id}"),
            alternatives: (1..=3)
                .map(|a| TakeableAlternative {
                    id: id * 10 + a,
                    text: format!("alt {a}"),
                })
                .collect(),
        };
        TakeableExam {
            id: 5,
            questions: vec![question(1), question(2)],
        }
    }

    #[test]
    fn answers_replace_by_key() {
        let mut taker = ExamTaker::new(two_question_exam());
        taker.answer(1, 11).unwrap();
        taker.answer(1, 13).unwrap();
        assert_eq!(taker.answered_count(), 1);
        assert_eq!(taker.answer_for(1), Some(13));
        assert_eq!(taker.unanswered_positions(), vec![2]);
    }

    #[test]
    fn rejects_foreign_ids() {
        let mut taker = ExamTaker::new(two_question_exam());
        assert_eq!(taker.answer(9, 11), Err(TakerError::UnknownQuestion(9)));
        assert_eq!(
            taker.answer(1, 21),
            Err(TakerError::UnknownAlternative {
                question: 1,
                alternative: 21
            })
        );
        assert_eq!(taker.answered_count(), 0);
    }

    #[test]
    fn completeness() {
        let mut taker = ExamTaker::new(two_question_exam());
        assert!(!taker.is_complete());
        taker.answer(1, 12).unwrap();
        taker.answer(2, 22).unwrap();
        assert!(taker.is_complete());
        assert!(taker.unanswered_positions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_submit_can_be_retried() {
        let api = SlowApi::default();
        let mut taker = ExamTaker::new(two_question_exam());
        taker.answer(1, 11).unwrap();
        taker.answer(2, 21).unwrap();

        let first = tokio::time::timeout(Duration::from_millis(10), taker.submit(&api, 42)).await;
        assert!(first.is_err());
        assert!(!taker.is_submitting());

        let result = taker.submit(&api, 42).await.unwrap();
        assert_eq!(result.correct, Some(2));
        assert_eq!(api.submits.load(Ordering::SeqCst), 2);
        assert!(taker.result().is_some());
    }
}
