use std::time::Duration;

use dotclaude_domain::constants::USER_AGENT;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::{InstallError, InstallResult};

/// Thin reqwest wrapper that tags transport failures.
///
/// Sends are single-shot: retries, timeouts per attempt and circuit breaking
/// belong to the resilient executor wrapped around each call.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> InstallResult<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send a request once, returning any HTTP response as-is.
    ///
    /// Status codes are left to the caller; only failures to obtain a
    /// response become [`InstallError::Transport`].
    pub async fn send(&self, builder: RequestBuilder) -> InstallResult<Response> {
        let request = builder.build().map_err(|err| InstallError::from_reqwest(&err, "request"))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(InstallError::from_reqwest(&err, url.as_str()))
            }
        }
    }

    /// Read a response body, tagging mid-body failures against `url`.
    pub async fn read_bytes(&self, response: Response, url: &str) -> InstallResult<Vec<u8>> {
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|err| InstallError::from_reqwest(&err, url))
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: String,
    bearer_token: Option<String>,
    default_headers: HeaderMap,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: USER_AGENT.to_string(),
            bearer_token: None,
            default_headers: HeaderMap::new(),
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn default_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.default_headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn build(self) -> InstallResult<HttpClient> {
        let mut headers = self.default_headers;

        if let Some(token) = self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| InstallError::Config("GitHub token contains invalid characters".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|err| InstallError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use dotclaude_common::error::TransportFailure;
    use reqwest::StatusCode;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn sends_configured_headers_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::builder().bearer_token("secret-token").build().expect("http client");
        let response = client.send(client.request(Method::GET, server.uri())).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().expect("http client");
        let response = client.send(client.request(Method::GET, server.uri())).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tags_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        let url = format!("http://{addr}");

        let client = HttpClient::new().expect("http client");
        let result = client.send(client.request(Method::GET, &url)).await;

        match result {
            Err(InstallError::Transport { failure, target, .. }) => {
                assert_eq!(failure, TransportFailure::ConnectionRefused);
                assert!(target.starts_with("http://127.0.0.1"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_token_with_newline() {
        let result = HttpClient::builder().bearer_token("bad\ntoken").build();
        assert!(matches!(result, Err(InstallError::Config(_))));
    }
}
