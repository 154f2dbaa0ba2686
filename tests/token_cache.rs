// tests/token_cache.rs
//
// Token lifecycle through the client seam:
// - one exchange serves many requests inside the validity window
// - authenticated requests go to the OAuth tier with a bearer token
// - a failed exchange degrades the request to the anonymous tier

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use trendpulse::client::types::SortMode;
use trendpulse::client::auth::SourceCredential;
use trendpulse::client::{
    ClientConfig, HttpRequest, HttpResponse, RequestAuth, SourceClient, Transport,
};
use trendpulse::error::SourceError;

const EMPTY_LISTING: &str = r#"{"data":{"after":null,"before":null,"children":[]}}"#;
const TOKEN_JSON: &str =
    r#"{"access_token":"tok-1","token_type":"bearer","expires_in":3600,"scope":"read"}"#;

/// Routes by URL: token endpoint vs listing endpoint. Records every listing
/// request so tests can assert which tier and auth each one used.
struct RoutingTransport {
    token_exchanges: AtomicUsize,
    token_status: u16,
    listing_requests: Mutex<Vec<HttpRequest>>,
}

impl RoutingTransport {
    fn new(token_status: u16) -> Self {
        Self {
            token_exchanges: AtomicUsize::new(0),
            token_status,
            listing_requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for RoutingTransport {
    async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, SourceError> {
        if req.url.contains("access_token") {
            self.token_exchanges.fetch_add(1, Ordering::SeqCst);
            return Ok(HttpResponse {
                status: self.token_status,
                body: if self.token_status == 200 {
                    TOKEN_JSON.to_string()
                } else {
                    String::new()
                },
                retry_after_secs: None,
            });
        }
        self.listing_requests.lock().unwrap().push(req);
        Ok(HttpResponse {
            status: 200,
            body: EMPTY_LISTING.to_string(),
            retry_after_secs: None,
        })
    }
}

fn credential() -> SourceCredential {
    SourceCredential {
        client_id: "id".into(),
        client_secret: "secret".into(),
    }
}

#[tokio::test]
async fn one_exchange_serves_many_requests() {
    let transport = Arc::new(RoutingTransport::new(200));
    let client = SourceClient::new(
        ClientConfig::default(),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Some(credential()),
    );

    for _ in 0..3 {
        client
            .fetch_posts("rust", SortMode::Hot, 25, None, None)
            .await
            .expect("fetch succeeds");
    }

    assert_eq!(
        transport.token_exchanges.load(Ordering::SeqCst),
        1,
        "a valid cached token must be reused"
    );

    let listings = transport.listing_requests.lock().unwrap();
    assert_eq!(listings.len(), 3);
    for req in listings.iter() {
        assert!(
            req.url.starts_with("https://oauth.reddit.com"),
            "authenticated requests use the OAuth tier, got {}",
            req.url
        );
        assert!(matches!(&req.auth, RequestAuth::Bearer(t) if t == "tok-1"));
    }
}

#[tokio::test]
async fn failed_exchange_degrades_to_anonymous_tier() {
    let transport = Arc::new(RoutingTransport::new(500));
    let client = SourceClient::new(
        ClientConfig::default(),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Some(credential()),
    );

    client
        .fetch_posts("rust", SortMode::Hot, 25, None, None)
        .await
        .expect("request degrades instead of failing");

    let listings = transport.listing_requests.lock().unwrap();
    assert_eq!(listings.len(), 1);
    assert!(
        listings[0].url.starts_with("https://www.reddit.com"),
        "degraded requests use the anonymous tier, got {}",
        listings[0].url
    );
    assert!(matches!(listings[0].auth, RequestAuth::None));
}
