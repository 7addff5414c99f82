//! Shared HTTP plumbing for the REST backend.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use coursekit_core::auth::AuthContext;
use coursekit_core::wire::{LoginRequest, LoginResponse};
use coursekit_core::ApiError;

/// REST client for the portal backend. Implements every collaborator trait
/// from `coursekit_core::traits`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    auth: AuthContext,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        auth: AuthContext,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn set_auth(&mut self, auth: AuthContext) {
        self.auth = auth;
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match self.auth.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request; any non-2xx status becomes an [`ApiError`].
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!("request timed out: {e}"))
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status, body = %body, "backend returned an error");
            return Err(ApiError::from_status(status, &body));
        }
        Ok(response)
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("failed to parse response: {e}")))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Self::read_json(response).await
    }

    /// GET where a 404 means "nothing there".
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        match self.get_json(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send a JSON body and ignore the response body.
    pub(crate) async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Response, ApiError> {
        self.send(self.request(method, path).json(body)).await
    }

    /// Exchange credentials for a token. The returned context is not
    /// installed; call [`HttpBackend::set_auth`] to use it.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthContext, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .send(self.client.post(self.url("usuarios/login")).json(&body))
            .await?;
        let login: LoginResponse = Self::read_json(response).await?;
        let auth = AuthContext::new(login.token);
        if !auth.is_authenticated() {
            return Err(ApiError::Decode("login response carried an empty token".into()));
        }
        tracing::info!("logged in");
        Ok(auth)
    }
}
