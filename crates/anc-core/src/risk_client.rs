//! HTTP client for the external risk/recommendation service.
//!
//! Every call is bounded by the configured per-attempt timeout. Enrichment calls to `/analyze`
//! retry transient failures (timeouts, connection errors, 429 and 5xx responses) up to the
//! configured count with jittered exponential backoff. Forwarded prediction requests are sent
//! exactly once.

use crate::config::CoreConfig;
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const BACKOFF_BASE_MS: u64 = 200;
const BACKOFF_JITTER_MS: u64 = 100;

/// Endpoints exposed by the risk service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskEndpoint {
    Analyze,
    PredictPregnancy,
    PredictFetal,
}

impl RiskEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            RiskEndpoint::Analyze => "analyze",
            RiskEndpoint::PredictPregnancy => "predict_preg",
            RiskEndpoint::PredictFetal => "predict_fetal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RiskClientError {
    #[error("risk service request timed out")]
    Timeout,
    #[error("could not connect to risk service: {0}")]
    Connect(String),
    #[error("risk service returned status {0}")]
    Status(u16),
    #[error("risk service returned a malformed body: {0}")]
    Malformed(String),
    #[error("risk service transport error: {0}")]
    Transport(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl RiskClientError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RiskClientError::Timeout
        } else if err.is_connect() {
            RiskClientError::Connect(err.to_string())
        } else if err.is_decode() {
            RiskClientError::Malformed(err.to_string())
        } else {
            RiskClientError::Transport(err.to_string())
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            RiskClientError::Timeout
            | RiskClientError::Connect(_)
            | RiskClientError::Transport(_) => true,
            RiskClientError::Status(code) => *code == 429 || *code >= 500,
            RiskClientError::Malformed(_) | RiskClientError::Client(_) => false,
        }
    }

    /// Short category suitable for returning to API clients. Never includes addresses or
    /// upstream error text.
    pub fn category(&self) -> String {
        match self {
            RiskClientError::Timeout => "timeout".into(),
            RiskClientError::Connect(_) => "connection failed".into(),
            RiskClientError::Status(code) => format!("upstream returned status {code}"),
            RiskClientError::Malformed(_) => "malformed response".into(),
            RiskClientError::Transport(_) | RiskClientError::Client(_) => {
                "transport error".into()
            }
        }
    }
}

/// Client seam for the risk service so the workflow can be exercised without a network.
#[async_trait]
pub trait RiskClient: Send + Sync {
    /// Sends visit data to `/analyze` wrapped as `{ "data": ... }`.
    async fn analyze(&self, data: &Value) -> Result<Value, RiskClientError> {
        self.forward(RiskEndpoint::Analyze, json!({ "data": data }))
            .await
    }

    /// Posts `body` verbatim to `endpoint` and returns the JSON response.
    async fn forward(&self, endpoint: RiskEndpoint, body: Value) -> Result<Value, RiskClientError>;
}

/// `reqwest`-backed implementation of [`RiskClient`].
#[derive(Clone, Debug)]
pub struct HttpRiskClient {
    client: reqwest::Client,
    cfg: Arc<CoreConfig>,
}

impl HttpRiskClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RiskClientError::Client`] if the underlying HTTP client cannot be constructed.
    pub fn new(cfg: Arc<CoreConfig>) -> Result<Self, RiskClientError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.risk_timeout())
            .build()
            .map_err(|e| RiskClientError::Client(e.to_string()))?;

        Ok(Self { client, cfg })
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<Value, RiskClientError> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(RiskClientError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RiskClientError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await.map_err(RiskClientError::from_reqwest)?;
        serde_json::from_slice(&bytes).map_err(|e| RiskClientError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RiskClient for HttpRiskClient {
    async fn analyze(&self, data: &Value) -> Result<Value, RiskClientError> {
        let url = self.cfg.risk_endpoint(RiskEndpoint::Analyze.path());
        let body = json!({ "data": data });
        let mut attempt = 0u32;

        loop {
            match self.post_once(&url, &body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.cfg.risk_retries() => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "risk service analyze failed, retrying: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn forward(&self, endpoint: RiskEndpoint, body: Value) -> Result<Value, RiskClientError> {
        let url = self.cfg.risk_endpoint(endpoint.path());
        self.post_once(&url, &body).await
    }
}

/// Exponential backoff with random jitter: 200ms, 400ms, 800ms ... plus up to 100ms.
fn backoff_delay(attempt: u32) -> Duration {
    let base = BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(10));
    let jitter = rand::thread_rng().gen_range(0..=BACKOFF_JITTER_MS);
    Duration::from_millis(base + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cfg(url: &str, retries: u32) -> Arc<CoreConfig> {
        cfg_with_timeout(url, retries, Duration::from_secs(2))
    }

    fn cfg_with_timeout(url: &str, retries: u32, timeout: Duration) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(PathBuf::from("/tmp/anc"), url.into(), timeout, retries, None)
                .unwrap(),
        )
    }

    fn counting_unavailable(path: &str, hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            path,
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        )
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn backoff_grows_and_stays_bounded() {
        let first = backoff_delay(0);
        let second = backoff_delay(1);
        assert!(first >= Duration::from_millis(200) && first <= Duration::from_millis(300));
        assert!(second >= Duration::from_millis(400) && second <= Duration::from_millis(500));
    }

    #[test]
    fn categories_do_not_leak_details() {
        let err = RiskClientError::Connect("tcp connect error 10.0.0.5:8000".into());
        assert_eq!(err.category(), "connection failed");
        assert_eq!(RiskClientError::Status(502).category(), "upstream returned status 502");
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(RiskClientError::Timeout.is_retryable());
        assert!(RiskClientError::Status(503).is_retryable());
        assert!(RiskClientError::Status(429).is_retryable());
        assert!(!RiskClientError::Status(400).is_retryable());
        assert!(!RiskClientError::Malformed("x".into()).is_retryable());
    }

    #[tokio::test]
    async fn analyze_wraps_data_and_returns_body() {
        let app = Router::new().route(
            "/analyze",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "echo": body["data"]["hb"] }))
            }),
        );
        let url = spawn(app).await;

        let client = HttpRiskClient::new(cfg(&url, 0)).unwrap();
        let resp = client.analyze(&json!({ "hb": 10.5 })).await.unwrap();

        assert_eq!(resp["echo"], 10.5);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route("/predict_preg", post(|| async { StatusCode::BAD_REQUEST }));
        let url = spawn(app).await;

        let client = HttpRiskClient::new(cfg(&url, 2)).unwrap();
        let err = client
            .forward(RiskEndpoint::PredictPregnancy, json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, RiskClientError::Status(400)));
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let app = Router::new().route("/analyze", post(|| async { "not json" }));
        let url = spawn(app).await;

        let client = HttpRiskClient::new(cfg(&url, 0)).unwrap();
        let err = client.analyze(&json!({})).await.unwrap_err();

        assert!(matches!(err, RiskClientError::Malformed(_)));
    }

    #[tokio::test]
    async fn server_errors_are_retried_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/analyze",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(StatusCode::SERVICE_UNAVAILABLE)
                    } else {
                        Ok(Json(json!({ "alerts": [] })))
                    }
                }
            }),
        );
        let url = spawn(app).await;

        let client = HttpRiskClient::new(cfg(&url, 1)).unwrap();
        let resp = client.analyze(&json!({})).await.unwrap();

        assert_eq!(resp, json!({ "alerts": [] }));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn connection_refused_is_a_connect_error() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpRiskClient::new(cfg(&format!("http://{addr}"), 0)).unwrap();
        let err = client.analyze(&json!({})).await.unwrap_err();

        assert!(matches!(err, RiskClientError::Connect(_)));
    }

    #[tokio::test]
    async fn slow_analyze_times_out() {
        let app = Router::new().route(
            "/analyze",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({}))
            }),
        );
        let url = spawn(app).await;

        let client = HttpRiskClient::new(cfg_with_timeout(&url, 0, Duration::from_secs(1))).unwrap();
        let started = std::time::Instant::now();
        let err = client.analyze(&json!({})).await.unwrap_err();

        assert!(matches!(err, RiskClientError::Timeout), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn forwarded_predictions_are_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn(counting_unavailable("/predict_fetal", hits.clone())).await;

        let client = HttpRiskClient::new(cfg(&url, 2)).unwrap();
        let err = client
            .forward(RiskEndpoint::PredictFetal, json!({ "baseline": 120 }))
            .await
            .unwrap_err();

        assert!(matches!(err, RiskClientError::Status(503)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn analyze_gives_up_after_configured_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn(counting_unavailable("/analyze", hits.clone())).await;

        let client = HttpRiskClient::new(cfg(&url, 2)).unwrap();
        let err = client.analyze(&json!({})).await.unwrap_err();

        assert!(matches!(err, RiskClientError::Status(503)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
