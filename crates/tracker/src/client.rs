use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use casewatch_common::error::AppError;
use casewatch_common::types::{SessionToken, StatusRecord};

use crate::auth::{AMZ_CONTENT_TYPE, AMZ_TARGET, InitiateAuthRequest, InitiateAuthResponse};
use crate::{AUTH_URL, CLIENT_ID, PROFILE_URL, StatusSource};

/// Body of a call to the `/user` endpoint; `method` selects the operation.
#[derive(Debug, Serialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum UserRpc<'a> {
    GetProfileSummary {
        /// Sent as a string, the way the web front end does.
        limit: String,
    },
    GetApplicationDetails {
        #[serde(rename = "applicationNumber")]
        application_number: &'a str,
    },
}

/// `apps` may be missing or `null` for accounts without applications.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileSummary {
    #[serde(default)]
    pub apps: Option<Vec<ApplicationSummary>>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSummary {
    #[serde(rename = "appNumber")]
    pub app_number: String,
}

/// HTTP implementation of [`StatusSource`] against the live tracker service.
pub struct TrackerClient {
    http: Client,
    auth_url: String,
    profile_url: String,
    client_id: String,
    page_size: u32,
}

impl TrackerClient {
    pub fn new(page_size: u32, request_timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth_url: AUTH_URL.to_string(),
            profile_url: PROFILE_URL.to_string(),
            client_id: CLIENT_ID.to_string(),
            page_size,
        })
    }

    /// Point the client at different hosts (staging, local proxy).
    pub fn with_endpoints(mut self, auth_url: String, profile_url: String) -> Self {
        self.auth_url = auth_url;
        self.profile_url = profile_url;
        self
    }

    async fn call<T>(&self, token: &SessionToken, body: &UserRpc<'_>) -> Result<T, AppError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(&self.profile_url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token.as_str())
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Fetch(e.to_string()))?;

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Fetch(format!("unexpected response body: {}", e)))
    }
}

#[async_trait]
impl StatusSource for TrackerClient {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, AppError> {
        let body = InitiateAuthRequest::password(&self.client_id, username, password);

        // Cognito wants its own JSON content type, so the body is encoded by hand.
        let payload = serde_json::to_vec(&body).map_err(|e| AppError::Auth(e.to_string()))?;

        let response = self
            .http
            .post(&self.auth_url)
            .header(header::ACCEPT, "*/*")
            .header(header::CONTENT_TYPE, AMZ_CONTENT_TYPE)
            .header("x-amz-target", AMZ_TARGET)
            .body(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Auth(format!("{} for user {}", e, username)))?;

        // Cognito replies with `application/x-amz-json-1.1`, which reqwest's
        // `json()` accepts regardless of content type.
        let parsed: InitiateAuthResponse = response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("no id token for user {}: {}", username, e)))?;

        tracing::debug!(username, "Authenticated against identity provider");
        Ok(SessionToken::new(parsed.authentication_result.id_token))
    }

    async fn application_numbers(&self, token: &SessionToken) -> Result<Vec<String>, AppError> {
        let summary: ProfileSummary = self
            .call(
                token,
                &UserRpc::GetProfileSummary {
                    limit: self.page_size.to_string(),
                },
            )
            .await?;

        Ok(summary
            .apps
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.app_number)
            .collect())
    }

    async fn application_status(
        &self,
        token: &SessionToken,
        application_number: &str,
    ) -> Result<StatusRecord, AppError> {
        self.call(token, &UserRpc::GetApplicationDetails { application_number })
            .await
            .map_err(|e| match e {
                AppError::Fetch(msg) => {
                    AppError::Fetch(format!("application {}: {}", application_number, msg))
                }
                other => other,
            })
    }
}
