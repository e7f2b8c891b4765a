//! # Generation Gateway
//!
//! Client for the external 3D/DXF generation service.
//!
//! ## Contract
//! ```text
//! POST {base_url}/generate
//!   request:  { "prompt": "M1(1000,400,1000)Eb", "closed": true }
//!   response: { "glb_url": "https://...", "dxf_url": "https://..." | null }
//! ```
//!
//! Generation is slow and deterministic per `(canonical code, closed)`, which
//! is what [`GenerationKey`] captures and what the preview cache keys on. It is
//! never on the pricing path.

use async_trait::async_trait;
use atelier_core::ValidatedSpecification;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use url::Url;

use crate::config::GenerationSettings;
use crate::error::{GatewayError, GatewayResult};
use crate::http::{self, RetryPolicy};

// =============================================================================
// Generation Key
// =============================================================================

/// Identity of a generation request: canonical code plus `closed`.
///
/// Only constructible from a [`ValidatedSpecification`], so nothing invalid
/// ever reaches the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationKey {
    canonical_code: String,
    closed: bool,
}

impl GenerationKey {
    pub fn new(spec: &ValidatedSpecification, closed: bool) -> Self {
        GenerationKey {
            canonical_code: spec.canonical_code(),
            closed,
        }
    }

    pub fn canonical_code(&self) -> &str {
        &self.canonical_code
    }

    /// Whether the generated model is a closed unit (back and sides).
    pub fn closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Display for GenerationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.closed {
            write!(f, "{} (closed)", self.canonical_code)
        } else {
            write!(f, "{}", self.canonical_code)
        }
    }
}

// =============================================================================
// Artifacts
// =============================================================================

/// Downloadable results of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    /// 3D model (glTF binary).
    pub glb_url: String,

    /// 2D cutting plan, when the service produced one.
    #[serde(default)]
    pub dxf_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    closed: bool,
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Anything that turns a [`GenerationKey`] into [`Artifacts`].
///
/// The HTTP client is the production implementation; tests substitute fakes.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, key: &GenerationKey) -> GatewayResult<Artifacts>;
}

// =============================================================================
// HTTP Gateway
// =============================================================================

/// Generation client over HTTP with per-attempt timeout and retry.
///
/// ## Usage
/// ```rust,ignore
/// let gateway = HttpGenerationGateway::new(&config.generation)?;
/// let spec = atelier_core::check("M1(1000,400,1000)bE")?;
/// let artifacts = gateway.generate(&GenerationKey::new(&spec, true)).await?;
/// println!("3D model: {}", artifacts.glb_url);
/// ```
#[derive(Debug, Clone)]
pub struct HttpGenerationGateway {
    client: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl HttpGenerationGateway {
    pub fn new(settings: &GenerationSettings) -> GatewayResult<Self> {
        Ok(HttpGenerationGateway {
            client: http::client(settings.connect_timeout())?,
            endpoint: http::endpoint(&settings.base_url, "generate")?,
            retry: settings.retry_policy(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn attempt(&self, key: &GenerationKey) -> GatewayResult<Artifacts> {
        let request = GenerateRequest {
            prompt: key.canonical_code(),
            closed: key.closed(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        let response = http::error_for_status(response).await?;

        let body = response.bytes().await?;
        let artifacts: Artifacts = serde_json::from_slice(&body)?;
        if artifacts.glb_url.is_empty() {
            return Err(GatewayError::DeserializationFailed(
                "generation response has an empty glb_url".into(),
            ));
        }
        Ok(artifacts)
    }
}

#[async_trait]
impl GenerationGateway for HttpGenerationGateway {
    async fn generate(&self, key: &GenerationKey) -> GatewayResult<Artifacts> {
        debug!(%key, endpoint = %self.endpoint, "Requesting generation");
        let artifacts = self.retry.run("generate", move || self.attempt(key)).await?;
        info!(%key, glb_url = %artifacts.glb_url, "Generation complete");
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn settings(base_url: String) -> GenerationSettings {
        GenerationSettings {
            base_url,
            request_timeout_secs: 5,
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_secs: 1,
            ..Default::default()
        }
    }

    fn key(code: &str, closed: bool) -> GenerationKey {
        GenerationKey::new(&atelier_core::check(code).unwrap(), closed)
    }

    #[test]
    fn test_key_uses_canonical_code() {
        let a = key("M1(1000,400,1000)bE", true);
        let b = key("M1(1000,400,1000)Eb", true);
        assert_eq!(a, b);
        assert_eq!(a.canonical_code(), "M1(1000,400,1000)Eb");
        assert_ne!(a, key("M1(1000,400,1000)Eb", false));
        assert_eq!(a.to_string(), "M1(1000,400,1000)Eb (closed)");
    }

    #[tokio::test]
    async fn test_generate_posts_prompt_and_closed() {
        let router = Router::new().route(
            "/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["prompt"], "M1(1000,400,1000)Eb");
                assert_eq!(body["closed"], true);
                Json(json!({
                    "glb_url": "https://cdn.test/m1.glb",
                    "dxf_url": "https://cdn.test/m1.dxf"
                }))
            }),
        );
        let gateway = HttpGenerationGateway::new(&settings(serve(router).await)).unwrap();

        let artifacts = gateway.generate(&key("M1(1000,400,1000)bE", true)).await.unwrap();
        assert_eq!(artifacts.glb_url, "https://cdn.test/m1.glb");
        assert_eq!(artifacts.dxf_url.as_deref(), Some("https://cdn.test/m1.dxf"));
    }

    #[tokio::test]
    async fn test_missing_dxf_is_allowed() {
        let router = Router::new().route(
            "/generate",
            post(|| async { Json(json!({ "glb_url": "https://cdn.test/a.glb" })) }),
        );
        let gateway = HttpGenerationGateway::new(&settings(serve(router).await)).unwrap();

        let artifacts = gateway.generate(&key("M1(1000,400,1000)b", false)).await.unwrap();
        assert!(artifacts.dxf_url.is_none());
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/generate",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err((StatusCode::SERVICE_UNAVAILABLE, "warming up"))
                    } else {
                        Ok(Json(json!({ "glb_url": "https://cdn.test/b.glb" })))
                    }
                }),
            )
            .with_state(calls.clone());
        let gateway = HttpGenerationGateway::new(&settings(serve(router).await)).unwrap();

        let artifacts = gateway.generate(&key("M1(1000,400,1000)b", false)).await.unwrap();
        assert_eq!(artifacts.glb_url, "https://cdn.test/b.glb");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/generate",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::UNPROCESSABLE_ENTITY, "unsupported prompt")
                }),
            )
            .with_state(calls.clone());
        let gateway = HttpGenerationGateway::new(&settings(serve(router).await)).unwrap();

        let err = gateway.generate(&key("M1(1000,400,1000)b", false)).await.unwrap_err();
        match err {
            GatewayError::HttpStatus { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "unsupported prompt");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let router = Router::new().route(
            "/generate",
            post(|| async { Json(json!({ "model": "nope" })) }),
        );
        let gateway = HttpGenerationGateway::new(&settings(serve(router).await)).unwrap();

        let err = gateway.generate(&key("M1(1000,400,1000)b", false)).await.unwrap_err();
        assert!(matches!(err, GatewayError::DeserializationFailed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut settings = settings(format!("http://{addr}"));
        settings.max_retries = 0;
        let gateway = HttpGenerationGateway::new(&settings).unwrap();

        let err = gateway.generate(&key("M1(1000,400,1000)b", false)).await.unwrap_err();
        assert!(err.is_retryable(), "{err:?}");
    }
}
