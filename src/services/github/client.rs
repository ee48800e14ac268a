use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::utils::config::Config;
use crate::utils::http_client::create_http_client;

pub const ITEMS_PER_PAGE: u32 = 100;

/// The only error the fetch layer surfaces. Everything else degrades to
/// "no data for this call" so one bad endpoint never aborts a run.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: the GitHub token is missing or invalid")]
    Unauthorized,
}

/// Raw response as the transport saw it. Header names are lowercased so
/// lookups match regardless of provider casing.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Seam between the rate-limit logic and the wire. Tests drive the fetcher
/// with scripted responses through this trait.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<TransportResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: create_http_client(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<TransportResponse> {
        let mut request = self.client.get(url);
        if !params.is_empty() {
            request = request.query(params);
        }
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

/// Parsed body and response headers of one API call. `body == None` with
/// headers present means 304 Not Modified; both `None` means the call failed
/// past recovery and the caller should treat the data as unavailable.
#[derive(Clone, Debug, Default)]
pub struct ApiResponse {
    pub body: Option<Value>,
    pub headers: Option<HashMap<String, String>>,
}

impl ApiResponse {
    fn empty() -> Self {
        Self::default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|h| h.get(name))
            .map(|v| v.as_str())
    }

    pub fn etag(&self) -> Option<String> {
        self.header("etag").map(|v| v.to_string())
    }

    /// Provider-requested poll interval in seconds, when sent.
    pub fn poll_interval(&self) -> Option<u64> {
        self.header("x-poll-interval").and_then(|v| v.parse().ok())
    }
}

/// Rate-limit-aware GitHub API client: one configured instance is shared by
/// every component, with the token injected at construction.
pub struct GithubClient {
    transport: Arc<dyn HttpTransport>,
    pub api_base_url: String,
    token: Option<String>,
    retry_limit: u32,
    sleep_interval: Duration,
}

impl GithubClient {
    pub fn new(config: &Config) -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new()), config)
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        Self {
            transport,
            api_base_url: config.api_base_url.clone(),
            token: config.github_token.clone(),
            retry_limit: config.retry_limit,
            sleep_interval: Duration::from_millis(config.sleep_interval_ms),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    fn request_headers(&self, etag: Option<&str>) -> Vec<(String, String)> {
        let mut headers = vec![(
            "Accept".to_string(),
            "application/vnd.github.v3+json".to_string(),
        )];
        if let Some(token) = &self.token {
            headers.push(("Authorization".to_string(), format!("token {}", token)));
        }
        if let Some(etag) = etag {
            headers.push(("If-None-Match".to_string(), etag.to_string()));
        }
        headers
    }

    /// Single GET with retry. Never fails for ordinary HTTP errors: a status
    /// outside {200, 304, 401, 403, 429}, a transport error, or an exhausted
    /// retry budget all come back as an empty `ApiResponse`. Only 401 is an
    /// `Err`, because running on without credentials is pointless.
    pub async fn request(
        &self,
        url: &str,
        params: &[(String, String)],
        etag: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let headers = self.request_headers(etag);
        let mut retry_count = 0u32;

        while retry_count < self.retry_limit {
            let response = match self.transport.get(url, params, &headers).await {
                Ok(response) => response,
                Err(e) => {
                    log::error!("Request error for {}: {}", url, e);
                    return Ok(ApiResponse::empty());
                }
            };
            log::info!("GET {} -> {}", url, response.status);

            match response.status {
                200 => {
                    let body: Value = match serde_json::from_str(&response.body) {
                        Ok(body) => body,
                        Err(e) => {
                            log::error!("Unparseable response body from {}: {}", url, e);
                            return Ok(ApiResponse::empty());
                        }
                    };
                    // Stay under abuse-detection thresholds even when the
                    // rate limit headers say we still have budget.
                    tokio::time::sleep(self.sleep_interval).await;
                    return Ok(ApiResponse {
                        body: Some(body),
                        headers: Some(response.headers),
                    });
                }
                304 => {
                    return Ok(ApiResponse {
                        body: None,
                        headers: Some(response.headers),
                    });
                }
                401 => {
                    log::error!("Authentication required. Add a GitHub token.");
                    return Err(ApiError::Unauthorized);
                }
                403 | 429 => {
                    retry_count += 1;
                    if retry_count > 1 {
                        log::info!("Retry attempt {}/{}", retry_count, self.retry_limit);
                    }
                    let wait = rate_limit_wait(&response.headers, retry_count);
                    log::warn!("Rate limited on {}. Waiting {}s", url, wait.as_secs());
                    tokio::time::sleep(wait).await;
                }
                status => {
                    log::error!("Request failed with status {} for {}", status, url);
                    return Ok(ApiResponse::empty());
                }
            }
        }

        log::error!("Exceeded retry limit ({}) for {}", self.retry_limit, url);
        Ok(ApiResponse::empty())
    }

    /// Follow `Link: rel="next"` until the chain ends or `limit` items are
    /// collected, flattening both raw-array and search-style `{items: []}`
    /// bodies. A failed page ends pagination with whatever was accumulated;
    /// partial results are acceptable, not an error.
    pub async fn fetch_all_pages(
        &self,
        url: &str,
        params: &[(String, String)],
        limit: Option<usize>,
    ) -> Result<Vec<Value>, ApiError> {
        let mut results: Vec<Value> = Vec::new();
        let mut next_url = Some(url.to_string());
        // Query parameters only apply to the first request; the next link
        // already carries them.
        let mut page_params = params.to_vec();

        while let Some(url) = next_url {
            if limit.is_some_and(|l| results.len() >= l) {
                break;
            }

            let page = self.request(&url, &page_params, None).await?;
            page_params.clear();

            let Some(body) = page.body else { break };
            let items = match body {
                Value::Array(items) => items,
                Value::Object(mut map) => match map.remove("items") {
                    Some(Value::Array(items)) => items,
                    _ => {
                        log::error!("Unexpected paginated response shape from {}", url);
                        break;
                    }
                },
                _ => {
                    log::error!("Unexpected paginated response shape from {}", url);
                    break;
                }
            };

            match limit {
                Some(l) => {
                    let room = l.saturating_sub(results.len());
                    results.extend(items.into_iter().take(room));
                }
                None => results.extend(items),
            }

            next_url = page
                .headers
                .as_ref()
                .and_then(|headers| parse_next_link(headers.get("link").map(|v| v.as_str())?));
        }

        Ok(results)
    }
}

/// How long to sleep for a 403/429, per the provider's contract: an explicit
/// `Retry-After` wins (secondary/abuse limit), then the primary-limit reset
/// timestamp, then exponential backoff for endpoints that rate-limit without
/// saying so in headers (search does this).
fn rate_limit_wait(headers: &HashMap<String, String>, retry_count: u32) -> Duration {
    if let Some(wait) = headers.get("retry-after").and_then(|v| v.parse::<u64>().ok()) {
        log::warn!("Secondary rate limit hit. Waiting {} seconds", wait);
        return Duration::from_secs(wait);
    }

    if headers.get("x-ratelimit-remaining").map(String::as_str) == Some("0") {
        if let Some(reset) = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.parse::<i64>().ok())
        {
            let wait = (reset - Utc::now().timestamp()).max(1) as u64;
            log::warn!("Rate limit exceeded. Waiting {} seconds until reset", wait);
            return Duration::from_secs(wait);
        }
    }

    let exponent = retry_count.saturating_sub(1).min(6);
    Duration::from_secs((1u64 << exponent).min(60))
}

/// Extract the `rel="next"` target from a Link header.
fn parse_next_link(link_header: &str) -> Option<String> {
    for part in link_header.split(',') {
        let mut sections = part.split(';');
        let url_section = sections.next()?.trim();
        let is_next = sections
            .any(|section| section.trim() == "rel=\"next\"" || section.trim() == "rel=next");
        if is_next {
            return Some(
                url_section
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string(),
            );
        }
    }
    None
}

/// URL-keyed scripted transport shared by the HTTP-layer tests in this
/// crate: each URL gets a queue of canned responses, unknown URLs 404.
#[cfg(test)]
pub mod tests_support {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct ScriptedTransport {
        responses: Mutex<HashMap<String, VecDeque<TransportResponse>>>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            })
        }

        /// Every (url, params) pair seen, in call order.
        pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.requests.lock().unwrap().clone()
        }

        pub fn script(&self, url: &str, response: TransportResponse) {
            self.responses
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(response);
        }

        pub fn script_ok(&self, url: &str, body: Value) {
            self.script(url, ok(body));
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(
            &self,
            url: &str,
            params: &[(String, String)],
            _headers: &[(String, String)],
        ) -> Result<TransportResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), params.to_vec()));
            let response = self.responses.lock().unwrap().get_mut(url).and_then(|q| q.pop_front());
            Ok(response.unwrap_or(TransportResponse {
                status: 404,
                headers: HashMap::new(),
                body: String::new(),
            }))
        }
    }

    pub fn ok(body: Value) -> TransportResponse {
        TransportResponse {
            status: 200,
            headers: HashMap::new(),
            body: body.to_string(),
        }
    }

    pub fn ok_with_headers(body: Value, headers: &[(&str, &str)]) -> TransportResponse {
        TransportResponse {
            status: 200,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
        }
    }

    pub fn not_modified(headers: &[(&str, &str)]) -> TransportResponse {
        TransportResponse {
            status: 304,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: String::new(),
        }
    }
}
