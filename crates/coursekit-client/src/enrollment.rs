//! Enrollment endpoints (`/matriculas`).

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use coursekit_core::model::{CourseId, UserId};
use coursekit_core::traits::EnrollmentApi;
use coursekit_core::wire::EnrollmentPayload;
use coursekit_core::ApiError;

use crate::http::HttpBackend;

#[async_trait]
impl EnrollmentApi for HttpBackend {
    /// A 409 comes back as an error; `EnrollmentSession` treats it as enrolled.
    #[instrument(skip(self))]
    async fn ensure_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), ApiError> {
        let body = EnrollmentPayload { user_id, course_id };
        self.send_json(Method::POST, "matriculas", &body).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_last_access(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), ApiError> {
        let body = EnrollmentPayload { user_id, course_id };
        self.send_json(Method::PUT, "matriculas/ultimo-acesso", &body)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use coursekit_core::auth::AuthContext;
    use coursekit_core::enrollment::EnrollmentSession;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn session_sends_each_call_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/matriculas"))
            .and(body_json(json!({"fkUsuario": 42, "fkCurso": 3})))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "já matriculado"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/matriculas/ultimo-acesso"))
            .and(body_json(json!({"fkUsuario": 42, "fkCurso": 3})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpBackend::new(&server.uri(), AuthContext::anonymous(), None).unwrap();
        let session = EnrollmentSession::new(Arc::new(backend));

        let (a, b) = tokio::join!(session.open_course(42, 3), session.open_course(42, 3));
        assert!(a.is_ok() && b.is_ok());
        session.open_course(42, 3).await.unwrap();
    }
}
