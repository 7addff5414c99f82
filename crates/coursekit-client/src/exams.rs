//! Exam authoring and taking endpoints.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use coursekit_core::model::{CourseId, Exam, ExamId, SubmissionResult, TakeableExam};
use coursekit_core::traits::{ExamApi, TakingApi};
use coursekit_core::wire::{ExamPayload, SavedExam, SubmitRequest};
use coursekit_core::ApiError;

use crate::http::HttpBackend;

/// Some deployments wrap the course's exam in a one-element list.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExamByCourse {
    One(Exam),
    Many(Vec<Exam>),
}

#[async_trait]
impl ExamApi for HttpBackend {
    #[instrument(skip(self))]
    async fn exam_by_course(&self, course_id: CourseId) -> Result<Option<Exam>, ApiError> {
        let found: Option<ExamByCourse> = self
            .get_optional(&format!("avaliacoes/curso/{course_id}"))
            .await?;
        Ok(match found {
            Some(ExamByCourse::One(exam)) => Some(exam),
            Some(ExamByCourse::Many(exams)) => exams.into_iter().next(),
            None => None,
        })
    }

    #[instrument(skip(self, payload), fields(course_id = payload.course_id, questions = payload.questions.len()))]
    async fn create_exam(&self, payload: &ExamPayload) -> Result<SavedExam, ApiError> {
        let response = self.send_json(Method::POST, "avaliacoes", payload).await?;
        read_saved(response).await
    }

    #[instrument(skip(self, payload), fields(questions = payload.questions.len()))]
    async fn update_exam(
        &self,
        exam_id: ExamId,
        payload: &ExamPayload,
    ) -> Result<SavedExam, ApiError> {
        let response = self
            .send_json(Method::PUT, &format!("avaliacoes/{exam_id}"), payload)
            .await?;
        read_saved(response).await
    }

    #[instrument(skip(self))]
    async fn delete_exam(&self, exam_id: ExamId, force: bool) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &format!("avaliacoes/{exam_id}?force={force}")))
            .await?;
        Ok(())
    }
}

/// Save responses may be empty or carry only a message.
async fn read_saved(response: reqwest::Response) -> Result<SavedExam, ApiError> {
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(SavedExam::default());
    }
    Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "unrecognized save response body");
        SavedExam::default()
    }))
}

#[async_trait]
impl TakingApi for HttpBackend {
    #[instrument(skip(self))]
    async fn exam_for_taking(&self, exam_id: ExamId) -> Result<TakeableExam, ApiError> {
        self.get_json(&format!("exam/{exam_id}")).await
    }

    #[instrument(skip(self, request), fields(user_id = request.user_id, answers = request.answers.len()))]
    async fn submit_answers(
        &self,
        exam_id: ExamId,
        request: &SubmitRequest,
    ) -> Result<SubmissionResult, ApiError> {
        let response = self
            .send_json(Method::POST, &format!("exam/{exam_id}/submit"), request)
            .await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursekit_core::auth::AuthContext;
    use coursekit_core::builder::ExamBuilder;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&server.uri(), AuthContext::new("tok"), None).unwrap()
    }

    #[tokio::test]
    async fn exam_by_course_reads_backend_shape() {
        let server = MockServer::start().await;
        let body = json!({
            "idAvaliacao": 4,
            "fkCurso": 2,
            "notaMinima": "7.5",
            "questoes": [{
                "idQuestao": 10,
                "numeroQuestao": 1,
                "enunciado": "Pergunta",
                "fkAlternativaCorreta": 1,
                "alternativas": [
                    {"idAlternativa": 100, "texto": "a", "ordemAlternativa": 0},
                    {"idAlternativa": 101, "texto": "b", "ordemAlternativa": 1}
                ]
            }]
        });
        Mock::given(method("GET"))
            .and(path("/avaliacoes/curso/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let exam = backend(&server).await.exam_by_course(2).await.unwrap().unwrap();
        assert_eq!(exam.id, 4);
        assert_eq!(exam.min_score, 7.5);
        assert_eq!(exam.questions[0].correct_alternative().unwrap().text, "b");
    }

    #[tokio::test]
    async fn exam_by_course_404_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/avaliacoes/curso/9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "não encontrada"})))
            .mount(&server)
            .await;

        assert!(backend(&server).await.exam_by_course(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_posts_wire_payload() {
        let server = MockServer::start().await;

        let mut builder = ExamBuilder::new(3);
        builder.set_min_score(6.0).unwrap();
        builder
            .add_question_with("Pergunta", vec!["a".into(), "b".into(), "c".into()], Some(2))
            .unwrap();
        let payload = builder.to_payload().unwrap();

        Mock::given(method("POST"))
            .and(path("/avaliacoes"))
            .and(body_json(json!({
                "fkCurso": 3,
                "notaMinima": 6.0,
                "questoes": [{
                    "numeroQuestao": 1,
                    "enunciado": "Pergunta",
                    "alternativas": [
                        {"texto": "a", "ordemAlternativa": 0},
                        {"texto": "b", "ordemAlternativa": 1},
                        {"texto": "c", "ordemAlternativa": 2}
                    ],
                    "fkAlternativaCorreta": 2
                }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"idAvaliacao": 15})))
            .expect(1)
            .mount(&server)
            .await;

        let saved = backend(&server).await.create_exam(&payload).await.unwrap();
        assert_eq!(saved.id, Some(15));
    }

    #[tokio::test]
    async fn delete_sends_force_flag() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/avaliacoes/4"))
            .and(query_param("force", "false"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"message": "possui respostas", "respostasCount": 3})),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/avaliacoes/4"))
            .and(query_param("force", "true"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let err = backend.delete_exam(4, false).await.unwrap_err();
        assert_eq!(err.conflict_count("respostasCount"), Some(3));
        backend.delete_exam(4, true).await.unwrap();
    }

    #[tokio::test]
    async fn update_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/avaliacoes/4"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let mut builder = ExamBuilder::new(3).with_exam_id(4);
        builder.set_min_score(5.0).unwrap();
        builder
            .add_question_with("Q", vec!["a".into(), "b".into()], Some(0))
            .unwrap();
        let saved = backend(&server)
            .await
            .update_exam(4, &builder.to_payload().unwrap())
            .await
            .unwrap();
        assert_eq!(saved, SavedExam::default());
    }

    #[tokio::test]
    async fn submit_posts_answers_by_question() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/exam/5/submit"))
            .and(body_json(json!({"userId": 42, "answers": {"1": 12, "2": 21}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "acertos": 1, "totalQuestoes": 2, "aprovado": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = SubmitRequest {
            user_id: 42,
            answers: [(1, 12), (2, 21)].into_iter().collect(),
        };
        let result = backend(&server).await.submit_answers(5, &request).await.unwrap();
        assert_eq!(result.correct, Some(1));
        assert_eq!(result.passed, Some(false));
    }

    #[tokio::test]
    async fn exam_for_taking_accepts_portuguese_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exam/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "idAvaliacao": 5,
                "questoes": [{"idQuestao": 1, "enunciado": "P", "alternativas": [
                    {"idAlternativa": 11, "texto": "a"}, {"idAlternativa": 12, "texto": "b"}
                ]}]
            })))
            .mount(&server)
            .await;

        let exam = backend(&server).await.exam_for_taking(5).await.unwrap();
        assert_eq!(exam.questions[0].alternatives[1].id, 12);
    }
}
