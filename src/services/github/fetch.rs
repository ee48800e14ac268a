use std::path::Path;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde_json::Value;

use super::client::{ApiError, GithubClient, ITEMS_PER_PAGE};
use crate::utils::config::Config;
use crate::utils::http_client::create_http_client;

/// Typed wrappers over the GitHub endpoints the pipeline consumes. Caps come
/// from configuration; every method degrades to empty data when the endpoint
/// fails, except for the fatal 401 which propagates.
pub struct GithubFetcher {
    client: Arc<GithubClient>,
    max_followers: usize,
    max_following: usize,
    max_repositories: usize,
    max_workers: usize,
}

impl GithubFetcher {
    pub fn new(client: Arc<GithubClient>, config: &Config) -> Self {
        Self {
            client,
            max_followers: config.max_followers,
            max_following: config.max_following,
            max_repositories: config.max_repositories,
            max_workers: config.max_workers.max(1),
        }
    }

    pub fn client(&self) -> &GithubClient {
        &self.client
    }

    fn per_page_params() -> Vec<(String, String)> {
        vec![("per_page".to_string(), ITEMS_PER_PAGE.to_string())]
    }

    pub async fn fetch_profile(&self, username: &str) -> Result<Option<Value>, ApiError> {
        let url = self.client.url(&format!("/users/{}", username));
        let response = self.client.request(&url, &[], None).await?;
        Ok(response.body)
    }

    pub async fn fetch_followers(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.client.url(&format!("/users/{}/followers", username));
        self.client
            .fetch_all_pages(&url, &Self::per_page_params(), Some(self.max_followers))
            .await
    }

    pub async fn fetch_following(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.client.url(&format!("/users/{}/following", username));
        self.client
            .fetch_all_pages(&url, &Self::per_page_params(), Some(self.max_following))
            .await
    }

    pub async fn fetch_repositories(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.client.url(&format!("/users/{}/repos", username));
        self.client
            .fetch_all_pages(&url, &Self::per_page_params(), Some(self.max_repositories))
            .await
    }

    pub async fn fetch_contributors(
        &self,
        owner: &str,
        repo_name: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let url = self
            .client
            .url(&format!("/repos/{}/{}/contributors", owner, repo_name));
        self.client.fetch_all_pages(&url, &[], None).await
    }

    /// Conditional event fetch. Returns `(events, new_etag, poll_interval)`;
    /// `events == None` means 304, nothing new since the given ETag, and
    /// `poll_interval == None` means the provider sent no `X-Poll-Interval`.
    pub async fn fetch_user_events(
        &self,
        username: &str,
        etag: Option<&str>,
    ) -> Result<(Option<Vec<Value>>, Option<String>, Option<u64>), ApiError> {
        let url = self.client.url(&format!("/users/{}/events", username));
        let response = self.client.request(&url, &[], etag).await?;

        let new_etag = response.etag().or_else(|| etag.map(|e| e.to_string()));
        let poll_interval = response.poll_interval();
        let events = match response.body {
            Some(Value::Array(events)) => Some(events),
            Some(_) => Some(Vec::new()),
            None => None,
        };
        Ok((events, new_etag, poll_interval))
    }

    pub async fn fetch_received_events(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self
            .client
            .url(&format!("/users/{}/received_events", username));
        self.client
            .fetch_all_pages(&url, &Self::per_page_params(), None)
            .await
    }

    pub async fn fetch_organizations(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.client.url(&format!("/users/{}/orgs", username));
        self.client.fetch_all_pages(&url, &[], None).await
    }

    pub async fn fetch_user_issues(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.client.url("/search/issues");
        let mut params = Self::per_page_params();
        params.push(("q".to_string(), format!("type:issue author:{}", username)));
        self.client.fetch_all_pages(&url, &params, None).await
    }

    /// Fetch the comment pages of each issue with bounded fan-out. These are
    /// independent read-only calls; results come back in issue order.
    pub async fn fetch_issue_comments(&self, issues: &[Value]) -> Result<Vec<Value>, ApiError> {
        let comment_urls: Vec<String> = issues
            .iter()
            .filter_map(|issue| issue.get("comments_url").and_then(|v| v.as_str()))
            .map(|url| url.to_string())
            .collect();

        let pages: Vec<Result<Vec<Value>, ApiError>> = stream::iter(comment_urls)
            .map(|url| {
                let client = Arc::clone(&self.client);
                async move { client.fetch_all_pages(&url, &[], None).await }
            })
            .buffered(self.max_workers)
            .collect()
            .await;

        let mut comments = Vec::new();
        for page in pages {
            comments.extend(page?);
        }
        Ok(comments)
    }

    pub async fn search_pull_requests(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.client.url("/search/issues");
        let mut params = Self::per_page_params();
        params.push(("q".to_string(), format!("type:pr author:{}", username)));
        self.client.fetch_all_pages(&url, &params, None).await
    }

    pub async fn search_commits_by_author(&self, username: &str) -> Result<Vec<Value>, ApiError> {
        let url = self.client.url("/search/commits");
        let mut params = Self::per_page_params();
        params.push(("q".to_string(), format!("author:{}", username)));
        self.client.fetch_all_pages(&url, &params, None).await
    }

    /// One commit-search call for a message, raw body included so the caller
    /// can read `total_count`. Not paginated; the first page of matches is
    /// plenty to judge whether a message is unique.
    pub async fn search_commit_message(&self, message: &str) -> Result<Option<Value>, ApiError> {
        let url = self.client.url("/search/commits");
        let mut params = Self::per_page_params();
        params.push(("q".to_string(), message.to_string()));
        let response = self.client.request(&url, &params, None).await?;
        Ok(response.body)
    }

    /// Download the profile avatar next to the report. Best-effort: a failure
    /// logs and returns None, the analysis does not care.
    pub async fn download_avatar(&self, avatar_url: &str, user_dir: &Path) -> Option<String> {
        let client = create_http_client();
        let response = match client.get(avatar_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                log::error!("Avatar download failed with status {}", response.status());
                return None;
            }
            Err(e) => {
                log::error!("Avatar download failed: {}", e);
                return None;
            }
        };

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Avatar download failed: {}", e);
                return None;
            }
        };

        let filename = "avatar.jpg";
        match std::fs::write(user_dir.join(filename), &bytes) {
            Ok(()) => Some(filename.to_string()),
            Err(e) => {
                log::error!("Failed to save avatar: {}", e);
                None
            }
        }
    }
}
