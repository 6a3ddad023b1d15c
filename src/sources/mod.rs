use std::borrow::Cow;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientWithMiddleware, Middleware, Next};
use serde_json::Value;
use tracing::debug;

use crate::error::BioPortalError;

pub mod bioportal;
pub mod pagination;

const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
const BODY_EXCERPT_CHARS: usize = 200;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type QueryParams = Vec<(&'static str, String)>;

/// One GET with query parameters, decoded as JSON.
#[async_trait]
pub trait JsonTransport: Send + Sync {
    async fn get_json(&self, url: &str, params: &[(&'static str, String)])
    -> Result<Value, BioPortalError>;
}

pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Cow::Owned(value.trim().to_string()),
        _ => Cow::Borrowed(default),
    }
}

fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn shared_client() -> Result<ClientWithMiddleware, BioPortalError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("bioportal-cli/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .gzip(true)
        .build()
        .map_err(BioPortalError::HttpClientInit)?;
    Ok(reqwest_middleware::ClientBuilder::new(client)
        .with(RequestLogger)
        .build())
}

pub(crate) async fn read_limited_body(
    mut resp: Response,
    api: &str,
) -> Result<Vec<u8>, BioPortalError> {
    let mut out = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if out.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(BioPortalError::Api {
                api: api.to_string(),
                message: format!("Response body exceeds {MAX_BODY_BYTES} bytes"),
            });
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= BODY_EXCERPT_CHARS {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(BODY_EXCERPT_CHARS).collect();
    out.push('…');
    out
}

/// Logs each request without its query string (the API key travels there).
struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let host = req.url().host_str().unwrap_or_default().to_string();
        let path = req.url().path().to_string();
        let started = Instant::now();
        let result = next.run(req, extensions).await;
        let elapsed_ms = saturating_millis(started.elapsed());
        match &result {
            Ok(resp) => debug!(%method, %host, %path, status = resp.status().as_u16(), elapsed_ms, "http request"),
            Err(err) => debug!(%method, %host, %path, elapsed_ms, "http request failed: {err}"),
        }
        result
    }
}

/// `JsonTransport` over the shared HTTP client.
#[derive(Clone)]
pub struct HttpTransport {
    client: ClientWithMiddleware,
    api: &'static str,
}

impl HttpTransport {
    pub fn new(api: &'static str) -> Result<Self, BioPortalError> {
        Ok(Self {
            client: shared_client()?,
            api,
        })
    }
}

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn get_json(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, BioPortalError> {
        let resp = self.client.get(url).query(params).send().await?;
        let status = resp.status();
        let bytes = read_limited_body(resp, self.api).await?;
        if !status.is_success() {
            let excerpt = body_excerpt(&bytes);
            return Err(BioPortalError::Api {
                api: self.api.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| BioPortalError::ApiJson {
            api: self.api.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn elapsed_millis_saturate_instead_of_wrapping() {
        assert_eq!(saturating_millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn body_excerpt_collapses_whitespace_and_truncates() {
        assert_eq!(body_excerpt(b"  not\n\tfound  "), "not found");

        let long = "x".repeat(BODY_EXCERPT_CHARS + 50);
        let excerpt = body_excerpt(long.as_bytes());
        assert_eq!(excerpt.chars().count(), BODY_EXCERPT_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }

    #[test]
    fn env_base_falls_back_to_default_when_unset() {
        let base = env_base(
            "https://data.bioontology.org",
            "BIOPORTAL_CLI_TEST_BASE_NEVER_SET_41c9",
        );
        assert_eq!(base, "https://data.bioontology.org");
    }

    #[tokio::test]
    async fn http_transport_sends_params_and_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "melanoma"))
            .and(query_param("apikey", "secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"collection": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new("bioportal").unwrap();
        let value = transport
            .get_json(
                &format!("{}/search", server.uri()),
                &[("q", "melanoma".to_string()), ("apikey", "secret".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"collection": []}));
    }

    #[tokio::test]
    async fn http_transport_maps_non_success_status_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new("bioportal").unwrap();
        let err = transport
            .get_json(&format!("{}/search", server.uri()), &[])
            .await
            .unwrap_err();
        match err {
            BioPortalError::Api { api, message } => {
                assert_eq!(api, "bioportal");
                assert!(message.contains("503"));
                assert!(message.contains("upstream overloaded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn http_transport_maps_undecodable_body_to_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new("bioportal").unwrap();
        let err = transport
            .get_json(&format!("{}/search", server.uri()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BioPortalError::ApiJson { .. }));
    }
}
