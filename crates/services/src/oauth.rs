use chrono::Utc;
use dashmap::DashMap;
use drivegate_config::GoogleSettings;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::credential::Credential;

/// Upper bound on outstanding `state` nonces; the oldest is evicted past it.
const MAX_PENDING_STATES: usize = 1024;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid or expired state parameter")]
    InvalidState,
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{error}: {}", .description.as_deref().unwrap_or("no description"))]
    Provider {
        error: String,
        description: Option<String>,
    },
}

/// A consent-screen URL bound to a freshly issued `state` nonce.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Google OAuth2 authorization-code flow with offline access.
pub struct OAuthService {
    client: Client,
    settings: GoogleSettings,
    /// Outstanding `state` nonces and the unix time they were issued.
    pending: DashMap<String, i64>,
}

impl OAuthService {
    pub fn new(settings: GoogleSettings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(client: Client, settings: GoogleSettings) -> Self {
        Self {
            client,
            settings,
            pending: DashMap::new(),
        }
    }

    pub fn scope(&self) -> String {
        self.settings.scopes.join(" ")
    }

    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&include_granted_scopes=true&state={}",
            self.settings.auth_url,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode(&self.scope()),
            urlencoding::encode(state),
        )
    }

    /// Issues a new `state` nonce and returns the consent URL carrying it.
    pub fn begin_authorization(&self) -> AuthorizationRequest {
        let now = Utc::now().timestamp();
        let ttl = self.state_ttl();
        self.pending.retain(|_, issued_at| now - *issued_at < ttl);
        while self.pending.len() >= MAX_PENDING_STATES {
            let Some(oldest) = self
                .pending
                .iter()
                .min_by_key(|entry| *entry.value())
                .map(|entry| entry.key().clone())
            else {
                break;
            };
            self.pending.remove(&oldest);
            warn!("Too many pending authorizations, evicted the oldest state");
        }

        let state = nanoid::nanoid!(32);
        self.pending.insert(state.clone(), now);
        debug!(pending = self.pending.len(), "Issued authorization state");

        AuthorizationRequest {
            url: self.authorize_url(&state),
            state,
        }
    }

    /// Consumes `state`. Each nonce is accepted at most once and only within its TTL.
    pub fn verify_state(&self, state: &str) -> Result<(), OAuthError> {
        match self.pending.remove(state) {
            Some((_, issued_at)) if Utc::now().timestamp() - issued_at < self.state_ttl() => Ok(()),
            Some(_) => {
                warn!("Authorization state expired");
                Err(OAuthError::InvalidState)
            }
            None => Err(OAuthError::InvalidState),
        }
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Credential, OAuthError> {
        self.request_token(&[
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Trades a refresh token for a new access token. The returned
    /// credential has no refresh token unless the provider rotated it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential, OAuthError> {
        self.request_token(&[
            ("refresh_token", refresh_token),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<Credential, OAuthError> {
        let resp = self
            .client
            .post(&self.settings.token_url)
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            let (error, description) = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => (err.error, err.error_description),
                Err(_) => (format!("HTTP {}", status.as_u16()), Some(body)),
            };
            return Err(OAuthError::Provider { error, description });
        }

        let tokens: TokenResponse = resp.json().await?;
        Ok(Credential {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            scope: tokens.scope.or_else(|| Some(self.scope())),
            expires_at: tokens
                .expires_in
                .map(|secs| Utc::now().timestamp().saturating_add(secs)),
        })
    }

    fn state_ttl(&self) -> i64 {
        i64::try_from(self.settings.state_ttl_secs).unwrap_or(i64::MAX)
    }
}
