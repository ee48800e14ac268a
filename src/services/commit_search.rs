use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{CommitRecord, MatchRecord};
use crate::services::github::{ApiError, GithubFetcher};
use crate::utils::denylist::is_popular_message;

/// Searches the provider's commit-search endpoint for other repositories
/// containing the same commit messages. A distinctive message recurring
/// across unrelated repositories suggests copied history; generic messages
/// ("update", "initial commit", ...) are skipped up front because they match
/// thousands of repositories and burn rate-limit budget for nothing.
pub struct CommitSimilaritySearch<'a> {
    fetcher: &'a GithubFetcher,
}

impl<'a> CommitSimilaritySearch<'a> {
    pub fn new(fetcher: &'a GithubFetcher) -> Self {
        Self { fetcher }
    }

    /// Search every repository in the commit map. A repository with zero
    /// commits produces a placeholder record so consumers can tell
    /// "not checked" from "checked, no matches".
    pub async fn search_all(
        &self,
        commits: &BTreeMap<String, Vec<CommitRecord>>,
    ) -> Result<Vec<MatchRecord>, ApiError> {
        let mut records = Vec::new();
        for (repo_name, repo_commits) in commits {
            if repo_commits.is_empty() {
                records.push(placeholder(repo_name, "No commits found"));
            } else {
                records.extend(self.search_repo_commits(repo_name, repo_commits).await?);
            }
        }
        Ok(records)
    }

    /// Search a single named repository from the commit map. An unknown name
    /// yields a placeholder record rather than an error.
    pub async fn search_repo(
        &self,
        repo_name: &str,
        commits: &BTreeMap<String, Vec<CommitRecord>>,
    ) -> Result<Vec<MatchRecord>, ApiError> {
        match commits.get(repo_name) {
            Some(repo_commits) => self.search_repo_commits(repo_name, repo_commits).await,
            None => Ok(vec![placeholder(repo_name, "Repository not found")]),
        }
    }

    async fn search_repo_commits(
        &self,
        repo_name: &str,
        commits: &[CommitRecord],
    ) -> Result<Vec<MatchRecord>, ApiError> {
        let mut records = Vec::new();
        for commit in commits {
            if is_popular_message(&commit.message) {
                log::info!(
                    "Too popular a commit message to search, skipping: {}",
                    commit.message
                );
                continue;
            }
            let query = normalize_message(&commit.message);
            let Some(body) = self.fetcher.search_commit_message(&query).await? else {
                continue;
            };
            if let Some(record) = match_record(repo_name, &query, &body) {
                log::info!(
                    "Found {} matches for a commit in {}: {:.100}",
                    record.search_results,
                    repo_name,
                    record.target_commit
                );
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn placeholder(repo_name: &str, marker: &str) -> MatchRecord {
    MatchRecord {
        target_repo: repo_name.to_string(),
        target_commit: marker.to_string(),
        search_results: 0,
        matching_repos: Vec::new(),
    }
}

/// Search queries are single-line; collapse newlines to spaces.
fn normalize_message(message: &str) -> String {
    message.replace(['\n', '\r'], " ")
}

/// A record is emitted only when the search found something: total_count > 0
/// and at least one matching repository URL. URLs are stripped to owner/repo.
fn match_record(repo_name: &str, query: &str, body: &Value) -> Option<MatchRecord> {
    let total_count = body.get("total_count").and_then(Value::as_u64).unwrap_or(0);
    if total_count == 0 {
        return None;
    }
    let matching_repos: Vec<String> = body
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.pointer("/repository/html_url")
                        .and_then(Value::as_str)
                        .map(|url| url.replace("https://github.com/", ""))
                })
                .collect()
        })
        .unwrap_or_default();
    if matching_repos.is_empty() {
        return None;
    }
    Some(MatchRecord {
        target_repo: repo_name.to_string(),
        target_commit: query.to_string(),
        search_results: total_count,
        matching_repos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::github::client::tests_support::ScriptedTransport;
    use crate::services::github::GithubClient;
    use crate::utils::config::Config;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn commit(message: &str) -> CommitRecord {
        CommitRecord {
            sha: "0000000000000000000000000000000000000000".to_string(),
            author_name: "Alice".to_string(),
            author_email: "alice@example.com".to_string(),
            author_date: DateTime::<Utc>::UNIX_EPOCH,
            committer_name: "Alice".to_string(),
            committer_email: "alice@example.com".to_string(),
            committer_date: DateTime::<Utc>::UNIX_EPOCH,
            message: message.to_string(),
        }
    }

    fn fetcher_with(transport: Arc<ScriptedTransport>) -> GithubFetcher {
        let config = Config::default();
        let client = GithubClient::with_transport(transport, &config);
        GithubFetcher::new(Arc::new(client), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_denylisted_message_is_never_searched() {
        let transport = ScriptedTransport::new();
        let search_url = "https://api.github.com/search/commits";
        transport.script_ok(
            search_url,
            json!({
                "total_count": 3,
                "items": [
                    {"repository": {"html_url": "https://github.com/someone/copycat"}},
                ]
            }),
        );

        let fetcher = fetcher_with(transport.clone());
        let search = CommitSimilaritySearch::new(&fetcher);
        let commits = BTreeMap::from([(
            "project".to_string(),
            vec![commit("initial commit"), commit("rework frobnicator retry path")],
        )]);

        let records = search.search_all(&commits).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_commit, "rework frobnicator retry path");
        assert_eq!(records[0].search_results, 3);
        assert_eq!(records[0].matching_repos, vec!["someone/copycat"]);

        // Exactly one outbound search, and not for the denylisted message.
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let q = requests[0]
            .1
            .iter()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert_eq!(q, "rework frobnicator retry path");
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiline_message_is_normalized() {
        let transport = ScriptedTransport::new();
        transport.script_ok(
            "https://api.github.com/search/commits",
            json!({"total_count": 0, "items": []}),
        );
        let fetcher = fetcher_with(transport.clone());
        let search = CommitSimilaritySearch::new(&fetcher);
        let commits = BTreeMap::from([(
            "project".to_string(),
            vec![commit("add scheduler\n\nwith a long body")],
        )]);

        let records = search.search_all(&commits).await.unwrap();
        assert!(records.is_empty());
        let requests = transport.requests();
        let q = requests[0]
            .1
            .iter()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(!q.contains('\n'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_repo_and_unknown_repo_placeholders() {
        let fetcher = fetcher_with(ScriptedTransport::new());
        let search = CommitSimilaritySearch::new(&fetcher);
        let commits = BTreeMap::from([("empty".to_string(), Vec::new())]);

        let records = search.search_all(&commits).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_commit, "No commits found");
        assert_eq!(records[0].search_results, 0);

        let records = search.search_repo("missing", &commits).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_commit, "Repository not found");
    }
}
