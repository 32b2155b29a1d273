//! GitHub REST client
//!
//! Each method performs exactly one HTTP request and maps the response onto
//! [`InstallError`]. Retrying is the caller's job.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dotclaude_domain::constants::{DEFAULT_API_BASE_URL, DEFAULT_RAW_BASE_URL};
use dotclaude_domain::{RemoteEntry, RepoSource};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::{InstallError, InstallResult};
use crate::http::HttpClient;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Longest error body excerpt kept in a [`InstallError::ClientFault`]
const BODY_EXCERPT_LEN: usize = 200;

/// Configuration for [`GitHubClient`]
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    pub api_base_url: String,
    pub raw_base_url: String,
    pub token: Option<String>,
    /// Transport-level timeout for a single request
    pub request_timeout: Duration,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            raw_base_url: DEFAULT_RAW_BASE_URL.to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Contents API answers a directory with an array and a file with an object
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing {
    Directory(Vec<RemoteEntry>),
    File(RemoteEntry),
}

/// Client for the GitHub contents and raw endpoints
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: HttpClient,
    api_base: Url,
    raw_base: Url,
}

impl GitHubClient {
    /// # Errors
    ///
    /// [`InstallError::Config`] for unparseable base URLs or an invalid token.
    pub fn new(config: GitHubClientConfig) -> InstallResult<Self> {
        let mut http = HttpClient::builder()
            .timeout(config.request_timeout)
            .default_header("accept", "application/vnd.github+json")
            .default_header("x-github-api-version", "2022-11-28");
        if let Some(token) = config.token.filter(|token| !token.trim().is_empty()) {
            http = http.bearer_token(token.trim());
        }

        Ok(Self {
            http: http.build()?,
            api_base: parse_base("api_base_url", &config.api_base_url)?,
            raw_base: parse_base("raw_base_url", &config.raw_base_url)?,
        })
    }

    /// List one remote directory
    ///
    /// A path naming a single file yields a one-element listing.
    ///
    /// # Errors
    ///
    /// Tagged [`InstallError`] for transport failures, non-success statuses
    /// and undecodable bodies.
    #[instrument(skip(self, source), fields(repo = %source))]
    pub async fn list_directory(
        &self,
        source: &RepoSource,
        path: &str,
    ) -> InstallResult<Vec<RemoteEntry>> {
        let mut url = join_segments(
            &self.api_base,
            ["repos", source.owner.as_str(), source.repo.as_str(), "contents"]
                .into_iter()
                .chain(split_path(path)),
        )?;
        url.query_pairs_mut().append_pair("ref", &source.branch);

        let response = self.get(&url).await?;
        let body = self.http.read_bytes(response, url.as_str()).await?;

        let listing: Listing = serde_json::from_slice(&body).map_err(|err| InstallError::Decode {
            url: url.to_string(),
            message: format!("invalid contents listing: {err}"),
        })?;

        let entries = match listing {
            Listing::Directory(entries) => entries,
            Listing::File(entry) => vec![entry],
        };
        debug!(count = entries.len(), "listed remote directory");
        Ok(entries)
    }

    /// Download one file body from the raw content host
    ///
    /// # Errors
    ///
    /// Tagged [`InstallError`] for transport failures and non-success
    /// statuses.
    #[instrument(skip(self, source), fields(repo = %source))]
    pub async fn fetch_file(&self, source: &RepoSource, repo_path: &str) -> InstallResult<Vec<u8>> {
        let url = self.raw_url(source, repo_path)?;
        let response = self.get(&url).await?;
        let bytes = self.http.read_bytes(response, url.as_str()).await?;
        debug!(bytes = bytes.len(), "downloaded file");
        Ok(bytes)
    }

    /// Raw content URL of `repo_path` on the source branch
    ///
    /// # Errors
    ///
    /// [`InstallError::Config`] if the raw base URL cannot take path segments.
    pub fn raw_url(&self, source: &RepoSource, repo_path: &str) -> InstallResult<Url> {
        join_segments(
            &self.raw_base,
            [source.owner.as_str(), source.repo.as_str(), source.branch.as_str()]
                .into_iter()
                .chain(split_path(repo_path)),
        )
    }

    async fn get(&self, url: &Url) -> InstallResult<Response> {
        let response = self.http.send(self.http.request(Method::GET, url.clone())).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, &headers, &body, url.as_str(), Utc::now()))
    }
}

fn parse_base(field: &str, raw: &str) -> InstallResult<Url> {
    let url = Url::parse(raw).map_err(|err| InstallError::Config(format!("{field}: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(InstallError::Config(format!("{field}: '{raw}' cannot be a base URL")));
    }
    Ok(url)
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn join_segments<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> InstallResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| InstallError::Config(format!("'{base}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map a non-success response onto the installer taxonomy
///
/// GitHub signals primary rate limits with 403 and
/// `x-ratelimit-remaining: 0`, secondary ones with 403 or 429 and a
/// message in the body.
pub(crate) fn map_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    url: &str,
    now: DateTime<Utc>,
) -> InstallError {
    let url = url.to_string();
    let code = status.as_u16();

    let quota_spent = headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|remaining| remaining.trim() == "0");
    let mentions_rate_limit = body.to_ascii_lowercase().contains("rate limit");

    match code {
        429 => InstallError::RateLimited { url, retry_after: retry_after_hint(headers, now) },
        403 if quota_spent || mentions_rate_limit => {
            InstallError::RateLimited { url, retry_after: retry_after_hint(headers, now) }
        }
        401 | 403 => InstallError::Permission { status: code, url },
        404 | 410 => InstallError::NotFound { url },
        400..=499 => InstallError::ClientFault { status: code, url, message: excerpt(body) },
        500..=599 => {
            InstallError::ServerFault { status: code, url, retry_after: retry_after_hint(headers, now) }
        }
        _ => InstallError::Decode { url, message: format!("unexpected HTTP status {status}") },
    }
}

/// Wait suggested by `retry-after` (seconds) or `x-ratelimit-reset` (epoch
/// seconds)
pub(crate) fn retry_after_hint(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
    };

    if let Some(seconds) = header_u64(RETRY_AFTER.as_str()) {
        return Some(Duration::from_secs(seconds));
    }

    let reset_at = header_u64(RATE_LIMIT_RESET)?;
    let now_secs = u64::try_from(now.timestamp()).ok()?;
    reset_at.checked_sub(now_secs).filter(|secs| *secs > 0).map(Duration::from_secs)
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use dotclaude_common::error::ErrorClassification;
    use reqwest::header::HeaderValue;

    use super::*;

    fn at(epoch: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(epoch, 0).single().unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    /// Validates the status table, including GitHub's 403 rate limits.
    ///
    /// Assertions:
    /// - 403 with an empty quota or a rate-limit body is `RateLimited`.
    /// - Plain 403 and 401 are `Permission`.
    /// - 404, 422 and 502 map to `NotFound`, `ClientFault` and `ServerFault`.
    #[test]
    fn test_map_status() {
        let now = at(1_700_000_000);
        let none = HeaderMap::new();

        let spent = headers(&[(RATE_LIMIT_REMAINING, "0")]);
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, &spent, "", "u", now),
            InstallError::RateLimited { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, &none, "You have exceeded a secondary rate limit", "u", now),
            InstallError::RateLimited { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, &none, "Resource not accessible", "u", now),
            InstallError::Permission { status: 403, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, &none, "", "u", now),
            InstallError::Permission { status: 401, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, &none, "", "u", now),
            InstallError::NotFound { .. }
        ));
        assert!(matches!(
            map_status(StatusCode::UNPROCESSABLE_ENTITY, &none, "bad ref", "u", now),
            InstallError::ClientFault { status: 422, .. }
        ));

        let fault = map_status(StatusCode::BAD_GATEWAY, &none, "", "u", now);
        assert!(matches!(fault, InstallError::ServerFault { status: 502, .. }));
        assert!(fault.is_retryable());
    }

    /// Validates both rate-limit hint headers.
    #[test]
    fn test_retry_after_hint() {
        let now = at(1_700_000_000);

        let explicit = headers(&[("retry-after", "42")]);
        assert_eq!(retry_after_hint(&explicit, now), Some(Duration::from_secs(42)));

        let reset = headers(&[(RATE_LIMIT_RESET, "1700000090")]);
        assert_eq!(retry_after_hint(&reset, now), Some(Duration::from_secs(90)));

        let past = headers(&[(RATE_LIMIT_RESET, "1699999000")]);
        assert_eq!(retry_after_hint(&past, now), None);

        assert_eq!(retry_after_hint(&HeaderMap::new(), now), None);
    }

    #[test]
    fn test_raw_url_encodes_segments() {
        let client = GitHubClient::new(GitHubClientConfig {
            raw_base_url: "https://raw.example.test/".into(),
            ..GitHubClientConfig::default()
        })
        .unwrap();
        let source = RepoSource::new("acme", "dotfiles").unwrap();

        let url = client.raw_url(&source, ".claude/commands/my command.md").unwrap();
        assert_eq!(
            url.as_str(),
            "https://raw.example.test/acme/dotfiles/main/.claude/commands/my%20command.md"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let result = GitHubClient::new(GitHubClientConfig {
            api_base_url: "not a url".into(),
            ..GitHubClientConfig::default()
        });
        assert!(matches!(result, Err(InstallError::Config(_))));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(500);
        let short = excerpt(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.len(), BODY_EXCERPT_LEN + 3);
    }
}
