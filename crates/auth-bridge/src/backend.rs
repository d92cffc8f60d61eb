//! Backend auth endpoints: token exchange and session check.

use crate::{AuthError, AuthResult, BackendProfile, BearerToken};
use async_trait::async_trait;
use plant_config_and_utils::{bearer_header, endpoint, summarize_response_body};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Successful exchange of an external identity token.
#[derive(Debug, Clone)]
pub struct BackendSession {
    pub access_token: BearerToken,
    pub token_type: String,
    pub profile: BackendProfile,
}

/// Backend auth collaborator.
#[async_trait]
pub trait BackendAuth: Send + Sync {
    /// Trade an external identity token for a bearer token and profile.
    async fn exchange(&self, id_token: &str) -> AuthResult<BackendSession>;

    /// Profile for a bearer token. A rejected token is `SessionInvalid`.
    async fn whoami(&self, token: &BearerToken) -> AuthResult<BackendProfile>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    user: BackendProfile,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: BackendProfile,
}

/// reqwest implementation of [`BackendAuth`].
#[derive(Clone)]
pub struct HttpBackendAuth {
    http_client: reqwest::Client,
    api_url: String,
}

impl HttpBackendAuth {
    pub fn new(api_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(http_client: reqwest::Client, api_url: &str) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BackendAuth for HttpBackendAuth {
    async fn exchange(&self, id_token: &str) -> AuthResult<BackendSession> {
        let url = endpoint(&self.api_url, "/api/auth/login");
        debug!(url = %url, "Exchanging identity token");

        let response = self
            .http_client
            .post(&url)
            .json(&LoginRequest { id_token })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            warn!(status = %status, body_summary = %body_summary, "Identity token exchange rejected");
            return Err(AuthError::ExchangeFailed(format!(
                "HTTP {} ({})",
                status, body_summary
            )));
        }

        let login: LoginResponse = response.json().await?;
        debug!(uid = %login.user.uid, "Identity token exchanged");
        Ok(BackendSession {
            access_token: BearerToken::new(login.access_token),
            token_type: login.token_type,
            profile: login.user,
        })
    }

    async fn whoami(&self, token: &BearerToken) -> AuthResult<BackendProfile> {
        let url = endpoint(&self.api_url, "/api/auth/me");

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", bearer_header(token.as_str()))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::SessionInvalid(
                "Server rejected bearer token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            warn!(status = %status, body_summary = %body_summary, "Session check failed");
            return Err(AuthError::Backend {
                status: status.as_u16(),
                message: body_summary,
            });
        }

        let me: MeResponse = response.json().await?;
        Ok(me.user)
    }
}
