use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LINK};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{Result, RunCostError};
use crate::providers::github::rate_limit::RateLimiter;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);
const MAX_PER_PAGE: usize = 100;

/// How transient upstream failures are retried.
///
/// `max_retries = 0` gives the plain best-effort behaviour: the first failure
/// is final.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff, capped at one minute.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub per_page: usize,
    pub retry: RetryPolicy,
    pub min_remaining: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            per_page: MAX_PER_PAGE,
            retry: RetryPolicy::default(),
            min_remaining: 50,
        }
    }
}

/// GitHub REST client for Actions history.
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    per_page: usize,
}

/// A decoded response page plus the URL of the page after it.
pub(super) struct Page<T> {
    pub body: T,
    pub next: Option<Url>,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<Token>, settings: ClientSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .user_agent(concat!("runcost/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| RunCostError::Config(format!("Failed to create HTTP client: {e}")))?;

        // A trailing slash keeps any path prefix (GitHub Enterprise `/api/v3`) on join.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let api_url = Url::parse(&normalized)
            .map_err(|e| RunCostError::Config(format!("Invalid base URL: {e}")))?;

        if settings.per_page == 0 || settings.per_page > MAX_PER_PAGE {
            return Err(RunCostError::Config(format!(
                "per-page must be between 1 and {MAX_PER_PAGE}, got {}",
                settings.per_page
            )));
        }

        Ok(Self {
            client,
            api_url,
            token,
            limiter: Arc::new(RateLimiter::new(settings.min_remaining)),
            retry: settings.retry,
            per_page: settings.per_page,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// First-page URL for `path` with the given query, plus paging parameters.
    pub(super) fn first_page_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .api_url
            .join(path)
            .map_err(|e| RunCostError::Config(format!("Invalid API URL for {path}: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("per_page", &self.per_page.to_string());
            pairs.append_pair("page", "1");
        }

        Ok(url)
    }

    /// Fetches one page, retrying transient failures per the retry policy.
    pub(super) async fn get_page<T>(&self, url: Url) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            self.limiter.wait().await;

            debug!("GET {url}");
            let request = self.auth_request(self.client.get(url.clone()));

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Network error ({e}), retrying in {}s ({}/{})...",
                        delay.as_secs(),
                        attempt + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.limiter.observe(response.headers());
            let status = response.status();

            let transient = status == StatusCode::TOO_MANY_REQUESTS
                || status.is_server_error()
                || (status == StatusCode::FORBIDDEN && RateLimiter::exhausted(response.headers()));

            if transient {
                if attempt >= self.retry.max_retries {
                    if attempt == 0 {
                        let message = response.text().await.unwrap_or_default();
                        return Err(RunCostError::ApiError {
                            status: status.as_u16(),
                            message,
                        });
                    }
                    return Err(RunCostError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: attempt,
                    });
                }

                let delay = self.retry.delay_for(attempt);
                warn!(
                    "GitHub API error (status {status}). Waiting {}s before retry {}/{}...",
                    delay.as_secs(),
                    attempt + 1,
                    self.retry.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(RunCostError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }

            let next = next_link(response.headers());
            let body = response.json::<T>().await?;

            return Ok(Page { body, next });
        }
    }

    /// Lazily walks every page starting at `first`, following `rel="next"` links.
    pub(super) fn paginate<'a, T>(&'a self, first: Url) -> impl Stream<Item = Result<T>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        futures::stream::try_unfold(Some(first), move |cursor| async move {
            let Some(url) = cursor else {
                return Ok::<_, RunCostError>(None);
            };
            let page = self.get_page::<T>(url).await?;
            Ok(Some((page.body, page.next)))
        })
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<Url> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().replace(' ', "") == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}
