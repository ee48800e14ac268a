use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::Report;

/// Provider URL clutter stripped from persisted bags; every one of these is
/// derivable from the login/repo name and only bloats the report.
const KEYS_TO_REMOVE: &[&str] = &[
    "followers_url",
    "following_url",
    "gists_url",
    "starred_url",
    "subscriptions_url",
    "organizations_url",
    "repos_url",
    "events_url",
    "received_events_url",
    "forks_url",
    "keys_url",
    "collaborators_url",
    "teams_url",
    "hooks_url",
    "issue_events_url",
    "assignees_url",
    "branches_url",
    "tags_url",
    "blobs_url",
    "git_tags_url",
    "git_refs_url",
    "trees_url",
    "statuses_url",
    "languages_url",
    "stargazers_url",
    "contributors_url",
    "subscribers_url",
    "subscription_url",
    "commits_url",
    "git_commits_url",
    "comments_url",
    "issue_comment_url",
    "contents_url",
    "compare_url",
    "merges_url",
    "archive_url",
    "downloads_url",
    "issues_url",
    "pulls_url",
    "milestones_url",
    "notifications_url",
    "labels_url",
    "releases_url",
    "deployments_url",
    "git_url",
    "ssh_url",
    "clone_url",
    "svn_url",
];

/// Owns the per-target output directory and the whole-file report rewrite.
/// Reports are superseded on rerun, never merged; a failure writing target B
/// cannot touch target A's already persisted report.
pub struct DataManager {
    pub username: String,
    pub user_dir: PathBuf,
    pub report_file: PathBuf,
}

impl DataManager {
    pub fn new(username: &str, out_path: Option<&Path>) -> Result<Self> {
        let user_dir = match out_path {
            Some(path) => path.join(username),
            None => std::env::current_dir()?.join("out").join(username),
        };
        fs::create_dir_all(&user_dir)
            .with_context(|| format!("Failed to create output directory {}", user_dir.display()))?;

        Ok(Self {
            username: username.to_string(),
            report_file: user_dir.join("report.json"),
            user_dir,
        })
    }

    pub fn save_report(&self, report: &Report) -> Result<()> {
        let value = serde_json::to_value(report).context("Failed to serialize report")?;
        self.save_value(&value)
    }

    /// Whole-file rewrite: serialize to a string first so a failed
    /// serialization can never leave a truncated report behind.
    pub fn save_value(&self, data: &Value) -> Result<()> {
        let filtered = strip_clutter(data.clone());
        let pretty = serde_json::to_string_pretty(&filtered)?;
        fs::write(&self.report_file, pretty)
            .with_context(|| format!("Failed to write {}", self.report_file.display()))?;
        log::info!("Data saved to {}", self.report_file.display());
        Ok(())
    }

    pub fn load_existing(&self) -> Option<Value> {
        if !self.report_file.exists() {
            log::info!("No existing data file found for {}", self.username);
            return None;
        }
        match fs::read_to_string(&self.report_file) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::error!("Existing report is not valid JSON: {}", e);
                    None
                }
            },
            Err(e) => {
                log::error!("Failed to read {}: {}", self.report_file.display(), e);
                None
            }
        }
    }
}

/// Recursively drop clutter keys from a provider bag.
pub fn strip_clutter(data: Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !KEYS_TO_REMOVE.contains(&key.as_str()))
                .map(|(key, value)| (key, strip_clutter(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_clutter).collect()),
        other => other,
    }
}

/// Narrow repository bags for the report: clutter keys gone, owner reduced to
/// its login, license to its key/name/spdx_id triple.
pub fn clean_repos(repos: &[Value]) -> Vec<Value> {
    repos
        .iter()
        .map(|repo| {
            let mut cleaned = strip_clutter(repo.clone());
            if let Value::Object(ref mut map) = cleaned {
                if let Some(owner) = repo.get("owner") {
                    map.insert(
                        "owner".to_string(),
                        serde_json::json!({"login": owner.get("login").cloned().unwrap_or(Value::Null)}),
                    );
                }
                if let Some(license) = repo.get("license").filter(|l| !l.is_null()) {
                    map.insert(
                        "license".to_string(),
                        serde_json::json!({
                            "key": license.get("key").cloned().unwrap_or(Value::Null),
                            "name": license.get("name").cloned().unwrap_or(Value::Null),
                            "spdx_id": license.get("spdx_id").cloned().unwrap_or(Value::Null),
                        }),
                    );
                }
            }
            cleaned
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_clutter_recurses() {
        let stripped = strip_clutter(json!({
            "login": "octocat",
            "repos_url": "https://api.github.com/users/octocat/repos",
            "nested": [{"clone_url": "x", "name": "keep"}]
        }));
        assert_eq!(stripped["login"], "octocat");
        assert!(stripped.get("repos_url").is_none());
        assert!(stripped["nested"][0].get("clone_url").is_none());
        assert_eq!(stripped["nested"][0]["name"], "keep");
    }

    #[test]
    fn test_clean_repos_narrows_owner_and_license() {
        let repos = vec![json!({
            "name": "hello",
            "owner": {"login": "octocat", "id": 1, "avatar_url": "..."},
            "license": {"key": "mit", "name": "MIT License", "spdx_id": "MIT", "url": "..."},
            "forks_url": "..."
        })];
        let cleaned = clean_repos(&repos);
        assert_eq!(cleaned[0]["owner"], json!({"login": "octocat"}));
        assert_eq!(cleaned[0]["license"]["spdx_id"], "MIT");
        assert!(cleaned[0]["license"].get("url").is_none());
        assert!(cleaned[0].get("forks_url").is_none());
    }

    #[test]
    fn test_report_roundtrip_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DataManager::new("octocat", Some(dir.path())).unwrap();
        assert!(manager.load_existing().is_none());

        manager.save_report(&Report::default()).unwrap();
        let loaded = manager.load_existing().unwrap();
        assert!(loaded.get("profile_info").is_some());
        assert_eq!(loaded["commit_filter"], json!([]));
    }
}
