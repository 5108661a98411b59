//! Access token storage and refresh.

use crate::error::{status_error, transport_error};
use crate::types::{parse_http_url, AuthConfig, TokenResponse};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use playmark_core::{AccessTokenProvider, ApiError, Result};
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// Tokens are refreshed this long before they actually expire
const EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Default)]
struct TokenState {
    access: Option<String>,
    refresh: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| now + ChronoDuration::seconds(EXPIRY_MARGIN_SECS) >= at)
    }
}

/// OAuth token store backed by the service's token endpoint.
///
/// Hands out the current access token and exchanges the refresh token for a
/// new one when it expires or the API rejects it.
pub struct TokenStore {
    http: Client,
    token_url: Url,
    client_id: String,
    state: RwLock<TokenState>,
}

impl TokenStore {
    /// Create a store from the auth settings.
    pub fn new(http: Client, config: &AuthConfig) -> crate::error::Result<Self> {
        let token_url = parse_http_url(&config.token_url)?;
        Ok(Self {
            http,
            token_url,
            client_id: config.client_id.clone(),
            state: RwLock::new(TokenState {
                access: config.access_token.clone(),
                refresh: config.refresh_token.clone(),
                expires_at: None,
            }),
        })
    }

    /// Replace the stored tokens.
    ///
    /// `expires_in_secs` of `None` means the access token is used until the
    /// API rejects it.
    pub async fn set_tokens(
        &self,
        access: impl Into<String>,
        refresh: Option<String>,
        expires_in_secs: Option<u64>,
    ) {
        let mut state = self.state.write().await;
        state.access = Some(access.into());
        if refresh.is_some() {
            state.refresh = refresh;
        }
        state.expires_at = expires_in_secs.map(expiry_from_now);
    }

    /// Current access and refresh tokens
    pub async fn tokens(&self) -> (Option<String>, Option<String>) {
        let state = self.state.read().await;
        (state.access.clone(), state.refresh.clone())
    }

    /// Forget all tokens (sign out).
    pub async fn clear(&self) {
        *self.state.write().await = TokenState::default();
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        debug!(url = %self.token_url, "Refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];
        let response = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => response.json().await.map_err(transport_error),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let err = status_error(response).await;
                warn!(error = %err, "Refresh token rejected");
                Err(ApiError::AuthExpired)
            }
            _ => Err(status_error(response).await),
        }
    }
}

/// Longest lifetime accepted from the token endpoint (one day)
const MAX_LIFETIME_SECS: u64 = 86_400;

fn expiry_from_now(secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(secs.min(MAX_LIFETIME_SECS)).unwrap_or(0);
    Utc::now() + ChronoDuration::seconds(secs)
}

#[async_trait]
impl AccessTokenProvider for TokenStore {
    async fn access_token(&self) -> Result<String> {
        {
            let state = self.state.read().await;
            if !state.is_expired(Utc::now()) {
                if let Some(token) = &state.access {
                    return Ok(token.clone());
                }
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<String> {
        let refresh_token = self
            .state
            .read()
            .await
            .refresh
            .clone()
            .ok_or(ApiError::AuthExpired)?;

        let response = self.request_refresh(&refresh_token).await?;
        let access = response.access_token.clone();
        self.set_tokens(
            response.access_token,
            response.refresh_token,
            response.expires_in,
        )
        .await;

        info!(expires_in = ?response.expires_in, "Access token refreshed");
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_never_expires() {
        let state = TokenState {
            access: Some("a".into()),
            refresh: None,
            expires_at: None,
        };
        assert!(!state.is_expired(Utc::now()));
    }

    #[test]
    fn expiry_includes_margin() {
        let now = Utc::now();
        let state = TokenState {
            access: Some("a".into()),
            refresh: None,
            expires_at: Some(now + ChronoDuration::seconds(10)),
        };
        assert!(state.is_expired(now));

        let state = TokenState {
            expires_at: Some(now + ChronoDuration::seconds(3600)),
            ..state
        };
        assert!(!state.is_expired(now));
    }
}
