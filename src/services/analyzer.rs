use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use crate::models::{
    CommitRecord, EventSummary, FailureRecord, MatchRecord, ProfileRecord, RepoContributors,
    RepoDescriptor,
};
use crate::services::commit_search::CommitSimilaritySearch;
use crate::services::git_history::GitHistoryCollector;
use crate::services::github::{GithubClient, GithubFetcher};
use crate::services::monitor::EventMonitor;
use crate::services::report::{ReportBuilder, ReportSources};
use crate::utils::config::Config;
use crate::utils::data::DataManager;
use crate::utils::validators::validate_username;

/// Everything collected for one target before correlation.
pub struct AnalysisData {
    pub profile: ProfileRecord,
    pub followers: Vec<Value>,
    pub following: Vec<Value>,
    pub repos: Vec<Value>,
    pub contributors: Vec<RepoContributors>,
    pub commits: BTreeMap<String, Vec<CommitRecord>>,
    pub errors: Vec<FailureRecord>,
    pub recent_events: Vec<EventSummary>,
    pub received_events: Vec<EventSummary>,
    pub organizations: Vec<Value>,
    pub issues: Vec<Value>,
    pub comments: Vec<Value>,
    pub pr_search: Vec<Value>,
    pub commit_search: Vec<Value>,
}

/// Drives the full collection pipeline for one target account and persists
/// the correlated report. Each target is independent: its own output
/// directory, its own report file, its own scratch space.
pub struct ProfileAnalyzer {
    username: String,
    config: Config,
    fetcher: GithubFetcher,
    data_manager: DataManager,
}

impl ProfileAnalyzer {
    pub fn new(username: &str, out_path: Option<&Path>, config: &Config) -> Result<Self> {
        validate_username(username)?;
        let client = Arc::new(GithubClient::new(config));
        let fetcher = GithubFetcher::new(client, config);
        let data_manager = DataManager::new(username, out_path)?;
        log::info!("Analyzer initialized for {}", username);
        Ok(Self {
            username: username.to_string(),
            config: config.clone(),
            fetcher,
            data_manager,
        })
    }

    pub fn fetcher(&self) -> &GithubFetcher {
        &self.fetcher
    }

    /// Fetch and persist only the profile section, skipping repositories,
    /// history and search.
    pub async fn profile_only(&self) -> Result<()> {
        let profile = self.fetch_profile().await?;
        self.download_avatar(&profile).await;
        self.data_manager
            .save_value(&json!({ "profile_info": profile.summary() }))
    }

    /// Full pipeline: profile, social graph, repositories, cloned history,
    /// events, issues and search, then the correlated report written as a
    /// whole-file rewrite. A pre-existing report's commit-search results are
    /// carried forward; everything else is superseded.
    pub async fn analyze(&self) -> Result<()> {
        let data = self.collect().await?;
        let commit_filter = self
            .data_manager
            .load_existing()
            .map(|report| load_match_records(&report))
            .unwrap_or_default();
        self.generate_report(&data, commit_filter)?;
        log::info!("Analysis completed for {}", self.username);
        Ok(())
    }

    /// Commit-message similarity search, optionally narrowed to one
    /// repository. Runs against the persisted report's commit collection;
    /// when no report exists yet, a full analysis runs first. Results extend
    /// the existing commit-filter list; re-searching a repository replaces
    /// its previous entries.
    pub async fn commit_search(&self, repo_name: Option<&str>) -> Result<()> {
        let mut report = match self.data_manager.load_existing() {
            Some(report) => report,
            None => {
                log::info!(
                    "No existing data for {}. Running analysis before commit search.",
                    self.username
                );
                self.analyze().await?;
                self.data_manager
                    .load_existing()
                    .ok_or_else(|| anyhow!("analysis did not produce a report"))?
            }
        };

        let commits: BTreeMap<String, Vec<CommitRecord>> = report
            .get("commits")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .context("existing report has an unreadable commits section")?
            .unwrap_or_default();

        let search = CommitSimilaritySearch::new(&self.fetcher);
        let new_results = match repo_name {
            Some(repo) => search.search_repo(repo, &commits).await?,
            None => search.search_all(&commits).await?,
        };

        let mut commit_filter = load_match_records(&report);
        if let Some(repo) = repo_name {
            commit_filter.retain(|record| record.target_repo != repo);
        }
        commit_filter.extend(new_results);
        report
            .as_object_mut()
            .ok_or_else(|| anyhow!("existing report is not a JSON object"))?
            .insert(
                "commit_filter".to_string(),
                serde_json::to_value(&commit_filter)?,
            );
        self.data_manager.save_value(&report)
    }

    async fn collect(&self) -> Result<AnalysisData> {
        let profile = self.fetch_profile().await?;
        self.download_avatar(&profile).await;

        let following = self.fetcher.fetch_following(&self.username).await?;
        let followers = self.fetcher.fetch_followers(&self.username).await?;
        let repos = self.fetcher.fetch_repositories(&self.username).await?;

        let descriptors: Vec<RepoDescriptor> = repos
            .iter()
            .filter_map(|repo| match RepoDescriptor::from_value(repo) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    log::warn!("Skipping malformed repository entry: {}", e);
                    None
                }
            })
            .collect();

        let mut contributors = Vec::new();
        for descriptor in descriptors.iter().filter(|d| !d.fork) {
            let logins: Vec<String> = self
                .fetcher
                .fetch_contributors(&self.username, &descriptor.name)
                .await?
                .iter()
                .filter_map(|c| c.get("login").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            if !logins.is_empty() {
                contributors.push(RepoContributors {
                    repo: descriptor.name.clone(),
                    contributors: logins,
                });
            }
        }

        let collector = GitHistoryCollector::new(
            &self.username,
            &self.data_manager.user_dir,
            self.config.clone_depth,
        );
        let (commits, errors) = collector.collect(&descriptors).await;

        let monitor = EventMonitor::new(&self.fetcher, &self.config);
        let recent_events = monitor.recent_events(&self.username).await?;
        let received_events = monitor.recent_received_events(&self.username).await?;

        let organizations = self.fetcher.fetch_organizations(&self.username).await?;
        let issues = self.fetcher.fetch_user_issues(&self.username).await?;
        let comments = self.fetcher.fetch_issue_comments(&issues).await?;

        let pr_search = self.fetcher.search_pull_requests(&self.username).await?;
        let commit_search = self.fetcher.search_commits_by_author(&self.username).await?;

        Ok(AnalysisData {
            profile,
            followers,
            following,
            repos,
            contributors,
            commits,
            errors,
            recent_events,
            received_events,
            organizations,
            issues,
            comments,
            pr_search,
            commit_search,
        })
    }

    fn generate_report(&self, data: &AnalysisData, commit_filter: Vec<MatchRecord>) -> Result<()> {
        let sources = ReportSources {
            profile: &data.profile,
            followers: &data.followers,
            following: &data.following,
            repos: &data.repos,
            commits: &data.commits,
            contributors: &data.contributors,
            pr_search: &data.pr_search,
            commit_search: &data.commit_search,
            organizations: &data.organizations,
            issues: &data.issues,
            comments: &data.comments,
            recent_events: &data.recent_events,
            received_events: &data.received_events,
            errors: &data.errors,
            commit_filter: &commit_filter,
        };
        let report = ReportBuilder::new(&self.username).build(&sources);
        self.data_manager.save_report(&report)?;
        log::info!(
            "Report generated and saved to {}",
            self.data_manager.report_file.display()
        );
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<ProfileRecord> {
        let raw = self
            .fetcher
            .fetch_profile(&self.username)
            .await?
            .ok_or_else(|| anyhow!("no profile data returned for {}", self.username))?;
        ProfileRecord::from_value(raw)
    }

    async fn download_avatar(&self, profile: &ProfileRecord) {
        if let Some(avatar_url) = profile.avatar_url() {
            if let Some(filename) = self
                .fetcher
                .download_avatar(avatar_url, &self.data_manager.user_dir)
                .await
            {
                log::info!("Avatar saved as {}", filename);
            }
        }
    }
}

fn load_match_records(report: &Value) -> Vec<MatchRecord> {
    report
        .get("commit_filter")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}
