//! Attempt history and answer sheets.

use async_trait::async_trait;
use tracing::instrument;

use coursekit_core::model::{AnswerSheet, Attempt, ExamId, UserId};
use coursekit_core::traits::AttemptApi;
use coursekit_core::ApiError;

use crate::http::HttpBackend;

#[async_trait]
impl AttemptApi for HttpBackend {
    #[instrument(skip(self))]
    async fn attempts_for_user(&self, user_id: UserId) -> Result<Vec<Attempt>, ApiError> {
        let attempts: Option<Vec<Attempt>> = self
            .get_optional(&format!("tentativas/usuario/{user_id}"))
            .await?;
        Ok(attempts.unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn answer_sheet(
        &self,
        exam_id: ExamId,
        user_id: UserId,
    ) -> Result<AnswerSheet, ApiError> {
        self.get_json(&format!("exams/{exam_id}/answersheet/{user_id}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursekit_core::answersheet::reconcile;
    use coursekit_core::auth::AuthContext;
    use coursekit_core::model::Score;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn attempts_404_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tentativas/usuario/7"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri(), AuthContext::anonymous(), None).unwrap();
        assert!(backend.attempts_for_user(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconcile_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tentativas/usuario/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"idTentativa": 1, "fkAvaliacao": 4, "fkUsuario": 42,
                 "dtTentativa": "2024-03-01T10:00:00Z", "qtdAcertos": 1, "qtdQuestoes": 2},
                {"idTentativa": 2, "fkUsuario": 42, "qtdAcertos": 0, "qtdQuestoes": 0}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/exams/4/answersheet/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "questions": [
                    {"id": 1, "numeroQuestao": 1, "text": "P1",
                     "alternatives": [{"id": 2, "text": "a"}, {"id": 3, "text": "b"}]},
                    {"id": 2, "numeroQuestao": 2, "text": "P2",
                     "alternatives": [{"id": 3, "text": "a"}, {"id": 4, "text": "b"}]}
                ],
                "userAnswers": {"1": "2", "2": "3"},
                "correctAnswers": {"1": "3", "2": "3"}
            })))
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri(), AuthContext::anonymous(), None).unwrap();
        let sheet = reconcile(&backend, 42, 1).await.unwrap();
        assert_eq!(sheet.exam_id, 4);
        assert_eq!(sheet.accuracy, Score::new(1, 2));
        assert_eq!(sheet.accuracy_display(), "1/2");

        let err = reconcile(&backend, 42, 2).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "ID da avaliação não disponível para esta tentativa."
        );

        let err = reconcile(&backend, 42, 99).await.unwrap_err();
        assert_eq!(err.user_message(), "Tentativa 99 não encontrada.");
    }
}
