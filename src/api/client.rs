//! HTTP client for the platform backend.
//!
//! One method per endpoint, each returning its typed response. Status
//! and error-body mapping happens in one place ([`ApiClient::check`]),
//! so the multi-session conflict and 401 handling are uniform across
//! every call.

use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::api::types::{
    ApiErrorBody, CourseSummary, LoginRequest, Paginated, PayRequest, PaymentAuthorization,
    PaymentRecord, PaymentVerification, QuizSummary, RegisterRequest, SubmitReceipt,
    SubmitRequest, TokenPair, UpdateProfileRequest, WaitlistEntry, WaitlistJoinRequest,
    WaitlistPatchRequest,
};
use crate::error::{ApiError, ErrorCode};
use crate::models::{Quiz, UserProfile};

/// Message text older backends use instead of a conflict code.
const LEGACY_CONFLICT_SENTINEL: &str = "logged in on another device";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4000/api".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Map non-success statuses to typed errors. The conflict code wins
    /// over the plain 401 mapping, and the legacy message sentinel is
    /// folded into the same typed code here so nothing above this layer
    /// ever string-matches.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        let code = body
            .code
            .as_deref()
            .map(ErrorCode::parse)
            .unwrap_or_else(|| ErrorCode::Other(String::new()));

        let is_conflict = code == ErrorCode::SessionConflict
            || body.text().to_lowercase().contains(LEGACY_CONFLICT_SENTINEL);
        if is_conflict {
            tracing::warn!("backend reported a multi-session conflict");
            return Err(ApiError::SessionConflict);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        tracing::debug!(status = %status, code = ?code, "backend error");
        Err(ApiError::Backend {
            code,
            message: body.text().to_string(),
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/user/register"))
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn profile(&self, token: &str) -> Result<UserProfile, ApiError> {
        let response = self
            .http
            .get(self.url("/user/profile"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn update_profile(
        &self,
        token: &str,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile, ApiError> {
        let response = self
            .http
            .put(self.url("/user/update"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn courses(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<Paginated<CourseSummary>, ApiError> {
        let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
        if let Some(term) = search {
            query.push(("search", term.to_string()));
        }
        let response = self
            .http
            .get(self.url("/courses"))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn quizzes(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<Paginated<QuizSummary>, ApiError> {
        let response = self
            .http
            .get(self.url("/quizzes"))
            .bearer_auth(token)
            .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Full quiz content for a course, canonical answers included; the
    /// backend only serves this to authorized sessions.
    pub async fn course_quizzes(&self, token: &str, course_id: &str) -> Result<Vec<Quiz>, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/quizzes/full/{course_id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn submit_quiz(
        &self,
        token: &str,
        quiz_id: &str,
        request: &SubmitRequest,
    ) -> Result<SubmitReceipt, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/quizzes/{quiz_id}/submit")))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn initialize_payment(
        &self,
        token: &str,
        request: &PayRequest,
    ) -> Result<PaymentAuthorization, ApiError> {
        let response = self
            .http
            .post(self.url("/payments/pay"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn verify_payment(
        &self,
        token: &str,
        reference: &str,
    ) -> Result<PaymentVerification, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/payments/{reference}/verify")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn user_payments(&self, token: &str) -> Result<Vec<PaymentRecord>, ApiError> {
        let response = self
            .http
            .get(self.url("/payments/i/user"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn waitlist(&self, token: &str) -> Result<Vec<WaitlistEntry>, ApiError> {
        let response = self
            .http
            .get(self.url("/waitlist"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Joining the waitlist is the one unauthenticated write: it backs
    /// the public marketing page.
    pub async fn join_waitlist(
        &self,
        request: &WaitlistJoinRequest,
    ) -> Result<WaitlistEntry, ApiError> {
        let response = self
            .http
            .post(self.url("/waitlist"))
            .json(request)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Admin moderation: move a waitlist entry to a new status.
    pub async fn update_waitlist(
        &self,
        token: &str,
        entry_id: &str,
        request: &WaitlistPatchRequest,
    ) -> Result<WaitlistEntry, ApiError> {
        let response = self
            .http
            .patch(self.url(&format!("/waitlist/{entry_id}")))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }
}
