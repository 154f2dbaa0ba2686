// src/client/auth.rs
//! OAuth client-credentials lifecycle. Tokens live in process memory only.

use metrics::counter;
use serde::Deserialize;
use tracing::debug;

use crate::client::{HttpMethod, HttpRequest, RequestAuth, Transport};
use crate::error::SourceError;

/// Reuse margin: a cached token is only reused while
/// `now < expires_at - TOKEN_SAFETY_MARGIN_SECS`.
pub const TOKEN_SAFETY_MARGIN_SECS: u64 = 300;

/// OAuth client id/secret pair. Never persisted outside process memory.
#[derive(Debug, Clone)]
pub struct SourceCredential {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct BearerToken {
    pub access_token: String,
    pub expires_at: u64,
}

impl BearerToken {
    fn is_valid(&self, now: u64) -> bool {
        now < self.expires_at.saturating_sub(TOKEN_SAFETY_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    token_type: String,
    expires_in: u64,
    #[serde(default)]
    #[allow(dead_code)]
    scope: String,
}

/// Token cache owned by exactly one client instance. The tokio mutex is held
/// across the exchange so concurrent callers inside one validity window
/// never issue duplicate exchanges.
pub struct TokenCache {
    credential: SourceCredential,
    cached: tokio::sync::Mutex<Option<BearerToken>>,
}

impl TokenCache {
    pub fn new(credential: SourceCredential) -> Self {
        Self {
            credential,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Cached token while valid, otherwise a client-credentials exchange
    /// (`POST` with basic auth, form body `grant_type=client_credentials`).
    pub async fn access_token(
        &self,
        transport: &dyn Transport,
        token_url: &str,
        now: u64,
    ) -> Result<String, SourceError> {
        let mut guard = self.cached.lock().await;
        if let Some(tok) = guard.as_ref() {
            if tok.is_valid(now) {
                return Ok(tok.access_token.clone());
            }
        }

        let req = HttpRequest {
            method: HttpMethod::Post,
            url: token_url.to_string(),
            auth: RequestAuth::Basic {
                user: self.credential.client_id.clone(),
                pass: self.credential.client_secret.clone(),
            },
            query: Vec::new(),
            form: vec![("grant_type".to_string(), "client_credentials".to_string())],
        };

        let resp = transport.execute(req).await.map_err(|e| match e {
            SourceError::Cancelled => SourceError::Cancelled,
            other => SourceError::Auth(other.to_string()),
        })?;

        if !(200..300).contains(&resp.status) {
            return Err(SourceError::Auth(format!(
                "token endpoint returned status {}",
                resp.status
            )));
        }

        let body: TokenResponse = serde_json::from_str(&resp.body)
            .map_err(|e| SourceError::Auth(format!("malformed token response: {e}")))?;

        counter!("token_exchanges_total").increment(1);
        debug!(expires_in = body.expires_in, "token exchange succeeded");

        let tok = BearerToken {
            access_token: body.access_token,
            expires_at: now.saturating_add(body.expires_in),
        };
        let out = tok.access_token.clone();
        *guard = Some(tok);
        Ok(out)
    }

    /// Drop the cached token so the next call re-exchanges. Used for the
    /// one-time refresh retry after a 401/403.
    pub async fn invalidate(&self) {
        let mut guard = self.cached.lock().await;
        *guard = None;
    }
}
