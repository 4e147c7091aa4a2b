//! Authentication state machine and bootstrap.
//!
//! [`AuthState`] is a plain value with a pure reducer; nothing in here is
//! a singleton. [`Authenticator`] performs the IO (credential exchange,
//! profile fetch, local cache) and hands back the next state, so the
//! embedding front end owns the state and decides where it lives.
//!
//! Login is atomic: tokens are only persisted after the profile fetch
//! succeeds. A failure on either leg leaves the machine in
//! `Unauthenticated` with the store untouched.

use chrono::Utc;

use crate::api::types::{RegisterRequest, TokenPair, UpdateProfileRequest};
use crate::api::ApiClient;
use crate::error::{ApiError, ClientError};
use crate::models::UserProfile;
use crate::store::Store;
use crate::validate::{self, RegistrationForm};

/// Assumed access-token lifetime when the backend omits `expiresIn`.
const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub profile: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds; advisory, compared against the local clock.
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(AuthSession),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthState::Authenticated(session) => Some(&session.profile),
            _ => None,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            AuthState::Authenticated(session) => Some(session.access_token.as_str()),
            _ => None,
        }
    }

    /// Pure transition function. IO lives in [`Authenticator`]; this only
    /// folds an event into the current state.
    pub fn apply(self, event: AuthEvent) -> AuthState {
        match (self, event) {
            (_, AuthEvent::LoginStarted) => AuthState::Authenticating,
            (_, AuthEvent::LoginSucceeded(session)) => AuthState::Authenticated(session),
            (_, AuthEvent::LoginFailed) => AuthState::Unauthenticated,
            (_, AuthEvent::LoggedOut) => AuthState::Unauthenticated,
            // Forced exits: expiry and the multi-session conflict both
            // collapse straight to Unauthenticated.
            (_, AuthEvent::Expired) => AuthState::Unauthenticated,
            (_, AuthEvent::ConflictDetected) => AuthState::Unauthenticated,
            (AuthState::Authenticated(mut session), AuthEvent::ProfileUpdated(profile)) => {
                session.profile = profile;
                AuthState::Authenticated(session)
            }
            (AuthState::Authenticated(mut session), AuthEvent::CreditsAdjusted(credits)) => {
                session.profile.credits = credits;
                AuthState::Authenticated(session)
            }
            // Profile mutations mean nothing outside an authenticated state.
            (state, AuthEvent::ProfileUpdated(_)) | (state, AuthEvent::CreditsAdjusted(_)) => state,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    LoginStarted,
    LoginSucceeded(AuthSession),
    LoginFailed,
    LoggedOut,
    /// The stored expiry stamp passed, or the backend returned 401.
    Expired,
    /// The backend reported the account active in another session.
    ConflictDetected,
    ProfileUpdated(UserProfile),
    /// Server-reconciled credit balance (submit receipts, payments).
    CreditsAdjusted(i64),
}

pub struct Authenticator {
    client: ApiClient,
    store: Store,
}

impl Authenticator {
    pub fn new(client: ApiClient, store: Store) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Restore state from the local cache. A stored expiry in the past
    /// forces `Unauthenticated` and clears the cache, token presence
    /// notwithstanding.
    pub fn bootstrap(&self) -> Result<AuthState, ClientError> {
        let (Some(access_token), Some(refresh_token), Some(expires_at), Some(profile)) = (
            self.store.access_token()?,
            self.store.refresh_token()?,
            self.store.expires_at()?,
            self.store.profile()?,
        ) else {
            return Ok(AuthState::Unauthenticated);
        };

        if expires_at <= Utc::now().timestamp() {
            tracing::info!("stored session expired; clearing credentials");
            self.store.clear_credentials()?;
            return Ok(AuthState::Unauthenticated);
        }

        Ok(AuthState::Authenticated(AuthSession {
            profile,
            access_token,
            refresh_token,
            expires_at,
        }))
    }

    /// Credential exchange followed by the profile fetch. Nothing is
    /// persisted until both succeed.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthState, ClientError> {
        validate::login_form(username, password)?;

        let tokens: TokenPair = self.client.login(username, password).await?;
        let profile = match self.client.profile(&tokens.access_token).await {
            Ok(profile) => profile,
            Err(e) => {
                // Half a login is no login: drop the tokens on the floor.
                tracing::warn!(error = %e, "profile fetch failed after token exchange");
                return Err(e.into());
            }
        };

        let expires_at =
            Utc::now().timestamp() + tokens.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        self.store
            .save_credentials(&tokens.access_token, &tokens.refresh_token, expires_at)?;
        self.store.save_profile(&profile)?;
        tracing::info!(username = %profile.username, "login complete");

        Ok(AuthState::Authenticated(AuthSession {
            profile,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        }))
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<(), ClientError> {
        validate::registration_form(form)?;
        self.client
            .register(&RegisterRequest {
                name: form.name.trim().to_string(),
                username: form.username.trim().to_string(),
                email: form.email.trim().to_string(),
                password: form.password.clone(),
            })
            .await?;
        Ok(())
    }

    pub fn logout(&self, state: AuthState) -> Result<AuthState, ClientError> {
        self.store.clear_credentials()?;
        Ok(state.apply(AuthEvent::LoggedOut))
    }

    /// Fold an API failure from any authenticated call back into auth
    /// state. Conflicts and 401s force a local logout with a cleared
    /// store; every other error leaves the session alone.
    pub fn absorb(&self, state: AuthState, error: &ApiError) -> Result<AuthState, ClientError> {
        match error {
            ApiError::SessionConflict => {
                tracing::warn!("multi-session conflict: forcing local logout");
                self.store.clear_credentials()?;
                Ok(state.apply(AuthEvent::ConflictDetected))
            }
            ApiError::Unauthorized => {
                self.store.clear_credentials()?;
                Ok(state.apply(AuthEvent::Expired))
            }
            _ => Ok(state),
        }
    }

    /// Push a profile edit and fold the server's answer into both the
    /// state and the cached snapshot.
    pub async fn update_profile(
        &self,
        state: AuthState,
        request: &UpdateProfileRequest,
    ) -> Result<AuthState, ClientError> {
        let Some(token) = state.access_token().map(str::to_string) else {
            return Ok(state);
        };
        let profile = self.client.update_profile(&token, request).await?;
        self.store.save_profile(&profile)?;
        Ok(state.apply(AuthEvent::ProfileUpdated(profile)))
    }

    /// Apply a server-corrected credit balance (submit receipt, payment
    /// verification) to the live state and the cached snapshot.
    pub fn apply_credits(
        &self,
        state: AuthState,
        credits: i64,
    ) -> Result<AuthState, ClientError> {
        let next = state.apply(AuthEvent::CreditsAdjusted(credits));
        if let Some(profile) = next.profile() {
            self.store.save_profile(profile)?;
        }
        Ok(next)
    }
}
