// src/client/mod.rs
//! # Rate-Limited Source Client
//! Fetches content pages from the upstream API while respecting its rate
//! limits: OAuth when credentials are configured, anonymous tier otherwise,
//! circuit breaking on sustained failure.
//!
//! The client never sleeps-and-retries internally. Transient conditions are
//! surfaced with retry hints and the orchestrator schedules retries.

pub mod auth;
pub mod circuit;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::warn;

use crate::error::SourceError;
use auth::{SourceCredential, TokenCache};
use circuit::{CircuitBreaker, CircuitConfig, CircuitState};
use types::{FetchRequest, Listing, Page, Post, SortMode, TimeWindow, MAX_PAGE_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub enum RequestAuth {
    None,
    Bearer(String),
    Basic { user: String, pass: String },
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub auth: RequestAuth,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header, when the upstream sent one.
    pub retry_after_secs: Option<u64>,
}

/// Transport seam: reqwest in production, counting mocks in tests.
///
/// Implementations must report caller-driven aborts as
/// [`SourceError::Cancelled`]; the client skips circuit-failure accounting
/// for those, since a local cancel says nothing about upstream health.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, SourceError>;
}

/// Production transport backed by a shared reqwest client.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .connect_timeout(Duration::from_secs(4))
            .timeout(request_timeout)
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, SourceError> {
        let mut builder = match req.method {
            HttpMethod::Get => self.http.get(&req.url),
            HttpMethod::Post => self.http.post(&req.url),
        };
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        builder = match req.auth {
            RequestAuth::None => builder,
            RequestAuth::Bearer(tok) => builder.bearer_auth(tok),
            RequestAuth::Basic { user, pass } => builder.basic_auth(user, Some(pass)),
        };
        if !req.form.is_empty() {
            builder = builder.form(&req.form);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            body,
            retry_after_secs,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the authenticated tier.
    pub api_base: String,
    /// Base URL for the anonymous tier.
    pub anon_base: String,
    /// OAuth token endpoint.
    pub token_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub circuit: CircuitConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://oauth.reddit.com".to_string(),
            anon_base: "https://www.reddit.com".to_string(),
            token_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            user_agent: "trendpulse/0.1 (content metrics pipeline)".to_string(),
            request_timeout_secs: 10,
            circuit: CircuitConfig::default(),
        }
    }
}

/// Client for one upstream rate-limit bucket. The token cache and circuit
/// state are owned exclusively by this instance; use one client per bucket,
/// never a global lock.
pub struct SourceClient {
    cfg: ClientConfig,
    transport: Arc<dyn Transport>,
    tokens: Option<TokenCache>,
    circuit: CircuitBreaker,
}

impl SourceClient {
    pub fn new(
        cfg: ClientConfig,
        transport: Arc<dyn Transport>,
        credential: Option<SourceCredential>,
    ) -> Self {
        let circuit = CircuitBreaker::new(cfg.circuit);
        Self {
            cfg,
            transport,
            tokens: credential.map(TokenCache::new),
            circuit,
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit.state()
    }

    /// Fetch one listing page. `limit` is clamped to the API maximum.
    pub async fn fetch_posts(
        &self,
        channel: &str,
        sort: SortMode,
        limit: u32,
        time_window: Option<TimeWindow>,
        after: Option<&str>,
    ) -> Result<Page<Post>, SourceError> {
        let req = FetchRequest {
            channel: channel.to_string(),
            sort,
            limit: limit.min(MAX_PAGE_LIMIT),
            time_window,
            after: after.map(str::to_string),
            query: None,
        };

        let path = format!("/r/{}/{}.json", req.channel, req.sort.as_str());
        let mut query = vec![("limit".to_string(), req.limit.to_string())];
        if let Some(t) = req.time_window {
            query.push(("t".to_string(), t.as_str().to_string()));
        }
        if let Some(a) = &req.after {
            query.push(("after".to_string(), a.clone()));
        }
        self.request_listing(&path, query).await
    }

    /// Search within a channel. The sort vocabulary is remapped to what the
    /// search endpoint exposes (`rising` has no equivalent there). Falling
    /// back to a plain fetch on search failure is the orchestrator's call,
    /// not this client's.
    pub async fn search_posts(
        &self,
        query_text: &str,
        channel: &str,
        sort: SortMode,
        time_window: TimeWindow,
        limit: u32,
    ) -> Result<Page<Post>, SourceError> {
        let path = format!("/r/{channel}/search.json");
        let query = vec![
            ("q".to_string(), query_text.to_string()),
            ("sort".to_string(), sort.as_search_str().to_string()),
            ("t".to_string(), time_window.as_str().to_string()),
            ("limit".to_string(), limit.min(MAX_PAGE_LIMIT).to_string()),
            ("restrict_sr".to_string(), "true".to_string()),
        ];
        self.request_listing(&path, query).await
    }

    async fn request_listing(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<Page<Post>, SourceError> {
        let now = now_unix();
        if let Err(e) = self.circuit.check(now) {
            counter!("circuit_open_total").increment(1);
            return Err(e);
        }
        counter!("client_requests_total").increment(1);

        // Token acquisition; an exchange failure degrades to the anonymous
        // tier instead of failing the whole request.
        let (base, mut bearer) = match &self.tokens {
            Some(cache) => {
                match cache
                    .access_token(self.transport.as_ref(), &self.cfg.token_url, now)
                    .await
                {
                    Ok(tok) => (self.cfg.api_base.as_str(), Some(tok)),
                    Err(SourceError::Cancelled) => {
                        self.circuit.probe_aborted(now_unix());
                        return Err(SourceError::Cancelled);
                    }
                    Err(e) => {
                        warn!(error = %e, "token exchange failed, degrading to anonymous tier");
                        counter!("client_anon_fallback_total").increment(1);
                        (self.cfg.anon_base.as_str(), None)
                    }
                }
            }
            None => (self.cfg.anon_base.as_str(), None),
        };
        let url = format!("{base}{path}");

        let t0 = std::time::Instant::now();
        let mut result = self.send_once(&url, &query, bearer.clone()).await;

        // One-time token refresh retry on 401/403 when we were authenticated.
        if matches!(result, Err(SourceError::AccessBlocked)) && bearer.is_some() {
            if let Some(cache) = &self.tokens {
                cache.invalidate().await;
                match cache
                    .access_token(self.transport.as_ref(), &self.cfg.token_url, now_unix())
                    .await
                {
                    Ok(tok) => {
                        bearer = Some(tok);
                        result = self.send_once(&url, &query, bearer).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "token refresh after 401/403 failed");
                    }
                }
            }
        }

        let resp = match result {
            Ok(r) => r,
            Err(e) => {
                // Errors with no upstream health verdict (cancel, auth
                // rejection, unexpected status) must still release an
                // in-flight probe, or the breaker stays half-open forever.
                // No-op when send_once already recorded a verdict.
                self.circuit.probe_aborted(now_unix());
                return Err(e);
            }
        };
        histogram!("client_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let listing: Listing = serde_json::from_str(&resp.body)
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(listing.into_page())
    }

    /// One request with status-class discrimination and circuit accounting:
    /// 429 drives backoff and circuit state, 401/403 maps to AccessBlocked
    /// (no circuit count), 5xx counts toward circuit failures.
    async fn send_once(
        &self,
        url: &str,
        query: &[(String, String)],
        bearer: Option<String>,
    ) -> Result<HttpResponse, SourceError> {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            auth: match bearer {
                Some(tok) => RequestAuth::Bearer(tok),
                None => RequestAuth::None,
            },
            query: query.to_vec(),
            form: Vec::new(),
        };

        let now = now_unix();
        match self.transport.execute(req).await {
            Err(SourceError::Cancelled) => Err(SourceError::Cancelled),
            Err(e) => {
                self.circuit.record_failure(now);
                Err(e)
            }
            Ok(resp) => match resp.status {
                200..=299 => {
                    self.circuit.record_success(now);
                    Ok(resp)
                }
                429 => {
                    self.circuit.record_failure(now);
                    counter!("client_rate_limited_total").increment(1);
                    Err(SourceError::RateLimited {
                        retry_after_secs: resp
                            .retry_after_secs
                            .unwrap_or_else(|| self.circuit.backoff_secs()),
                    })
                }
                401 | 403 => Err(SourceError::AccessBlocked),
                500..=599 => {
                    self.circuit.record_failure(now);
                    Err(SourceError::Upstream {
                        status: resp.status,
                    })
                }
                other => Err(SourceError::Upstream { status: other }),
            },
        }
    }
}

fn now_unix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
