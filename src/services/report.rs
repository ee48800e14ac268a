use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::models::{
    CommitRecord, EventSummary, FailureRecord, MatchRecord, ProfileRecord, Report,
    RepoCommits, RepoContributors, RepoPullRequests,
};
use crate::services::categorize::IdentityCategorizer;
use crate::services::detectors;
use crate::utils::data::clean_repos;

/// Everything a finished analysis run hands over for correlation. Raw
/// provider collections stay as JSON values; collections this crate computed
/// arrive typed.
pub struct ReportSources<'a> {
    pub profile: &'a ProfileRecord,
    pub followers: &'a [Value],
    pub following: &'a [Value],
    pub repos: &'a [Value],
    pub commits: &'a BTreeMap<String, Vec<CommitRecord>>,
    pub contributors: &'a [RepoContributors],
    pub pr_search: &'a [Value],
    pub commit_search: &'a [Value],
    pub organizations: &'a [Value],
    pub issues: &'a [Value],
    pub comments: &'a [Value],
    pub recent_events: &'a [EventSummary],
    pub received_events: &'a [EventSummary],
    pub errors: &'a [FailureRecord],
    pub commit_filter: &'a [MatchRecord],
}

/// Joins everything collected for one account into the final report. Each
/// derivation is independent and pure; building twice from the same sources
/// yields the same report. Absent data becomes an empty container, never a
/// missing key.
pub struct ReportBuilder {
    username: String,
}

impl ReportBuilder {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
        }
    }

    pub fn build(&self, sources: &ReportSources<'_>) -> Report {
        let followers = logins(sources.followers);
        let following = logins(sources.following);

        let categorized =
            IdentityCategorizer::new(&self.username, sources.contributors).categorize(sources.commits);
        let dprk_naming =
            detectors::dprk_naming(&self.username, &categorized.owner, sources.contributors);
        let identity_rotation = detectors::identity_rotation(&categorized.owner);

        let own_shas: BTreeSet<&str> = sources
            .commits
            .values()
            .flatten()
            .map(|c| c.sha.as_str())
            .collect();
        let (commits_to_other_repos, duplicate_hashes_found) =
            self.external_commits(sources.commit_search, &own_shas);

        Report {
            profile_info: sources.profile.summary(),
            original_repos_count: count_forks(sources.repos, false),
            forked_repos_count: count_forks(sources.repos, true),
            unique_emails: categorized,
            dprk_naming,
            identity_rotation,
            mutual_followers: mutual_followers(&followers, &following),
            potential_copy: self.date_inversions(sources),
            contributors: sources.contributors.to_vec(),
            following,
            followers,
            repo_list: repo_names(sources.repos, false),
            forked_repo_list: repo_names(sources.repos, true),
            pull_requests_to_other_repos: self.external_pull_requests(sources.pr_search),
            commits_to_other_repos,
            duplicate_hashes_found,
            repos: clean_repos(sources.repos),
            commits: sources.commits.clone(),
            errors: sources.errors.to_vec(),
            commit_filter: sources.commit_filter.to_vec(),
            recent_events: sources.recent_events.to_vec(),
            received_events: sources.received_events.to_vec(),
            issues: sources.issues.to_vec(),
            comments: sources.comments.to_vec(),
            organizations_member: logins(sources.organizations),
        }
    }

    /// A repository whose earliest commit predates the account's creation.
    /// The walk is newest-first, so the earliest commit is the last element.
    /// Strictly earlier only; a commit at the creation instant is normal.
    fn date_inversions(&self, sources: &ReportSources<'_>) -> Vec<crate::models::DateInversionFlag> {
        let created_at = sources.profile.created_at;
        let mut flags = Vec::new();
        for (repo_name, commits) in sources.commits {
            let Some(first_commit) = commits.last() else {
                continue;
            };
            if first_commit.author_date < created_at {
                flags.push(crate::models::DateInversionFlag {
                    repo: repo_name.clone(),
                    reason: "account creation date later than the first commit to the repository"
                        .to_string(),
                    commit_date: first_commit.author_date.to_rfc3339(),
                });
            }
        }
        flags
    }

    /// Pull requests the account opened against repositories it does not
    /// own, grouped by `owner/repo`.
    fn external_pull_requests(&self, items: &[Value]) -> Vec<RepoPullRequests> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for item in items {
            let Some(repo_key) = repo_key_from_repository_url(item) else {
                continue;
            };
            if self.owned_by_subject(&repo_key) {
                continue;
            }
            if let Some(url) = item.get("html_url").and_then(Value::as_str) {
                grouped.entry(repo_key).or_default().push(url.to_string());
            }
        }
        grouped
            .into_iter()
            .map(|(repo, pull_requests)| RepoPullRequests {
                repo,
                pull_requests,
            })
            .collect()
    }

    /// Commits attributed to the account in repositories it does not own.
    /// A repository whose entire SHA set already appears in the account's
    /// own history is a fork-merge artifact, not a genuine contribution; it
    /// moves to the duplicate list instead.
    fn external_commits(
        &self,
        items: &[Value],
        own_shas: &BTreeSet<&str>,
    ) -> (Vec<RepoCommits>, Vec<String>) {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for item in items {
            let repo_name = item
                .pointer("/repository/html_url")
                .and_then(Value::as_str)
                .and_then(|url| url.rsplit('/').next());
            let owner = item
                .pointer("/repository/owner/login")
                .and_then(Value::as_str);
            let sha = item.get("sha").and_then(Value::as_str);
            let (Some(repo_name), Some(owner), Some(sha)) = (repo_name, owner, sha) else {
                continue;
            };
            let repo_key = format!("{}/{}", owner, repo_name);
            if self.owned_by_subject(&repo_key) {
                continue;
            }
            grouped.entry(repo_key).or_default().push(sha.to_string());
        }

        let mut external = Vec::new();
        let mut duplicates = Vec::new();
        for (repo, commits) in grouped {
            if commits.iter().all(|sha| own_shas.contains(sha.as_str())) {
                duplicates.push(repo);
            } else {
                external.push(RepoCommits { repo, commits });
            }
        }
        (external, duplicates)
    }

    fn owned_by_subject(&self, repo_key: &str) -> bool {
        repo_key
            .split('/')
            .next()
            .is_some_and(|owner| owner.eq_ignore_ascii_case(&self.username))
    }
}

fn logins(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.get("login").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn mutual_followers(followers: &[String], following: &[String]) -> Vec<String> {
    let follower_set: BTreeSet<&String> = followers.iter().collect();
    let mut mutual: Vec<String> = following
        .iter()
        .filter(|login| follower_set.contains(login))
        .cloned()
        .collect();
    mutual.sort();
    mutual.dedup();
    mutual
}

fn count_forks(repos: &[Value], fork: bool) -> usize {
    repos
        .iter()
        .filter(|repo| repo.get("fork").and_then(Value::as_bool).unwrap_or(false) == fork)
        .count()
}

fn repo_names(repos: &[Value], fork: bool) -> Vec<String> {
    repos
        .iter()
        .filter(|repo| repo.get("fork").and_then(Value::as_bool).unwrap_or(false) == fork)
        .filter_map(|repo| repo.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// `repository_url` is the API form `.../repos/{owner}/{repo}`.
fn repo_key_from_repository_url(item: &Value) -> Option<String> {
    let url = item.get("repository_url").and_then(Value::as_str)?;
    let mut segments = url.rsplit('/');
    let repo = segments.next()?;
    let owner = segments.next()?;
    Some(format!("{}/{}", owner, repo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn profile(created_at: DateTime<Utc>) -> ProfileRecord {
        ProfileRecord::from_value(json!({
            "login": "octocat",
            "id": 1,
            "created_at": created_at.to_rfc3339(),
        }))
        .unwrap()
    }

    fn commit_at(sha: &str, date: DateTime<Utc>) -> CommitRecord {
        CommitRecord {
            sha: sha.to_string(),
            author_name: "Octo Cat".to_string(),
            author_email: "octocat@example.com".to_string(),
            author_date: date,
            committer_name: "Octo Cat".to_string(),
            committer_email: "octocat@example.com".to_string(),
            committer_date: date,
            message: "work".to_string(),
        }
    }

    fn empty_sources<'a>(
        profile: &'a ProfileRecord,
        commits: &'a BTreeMap<String, Vec<CommitRecord>>,
    ) -> ReportSources<'a> {
        ReportSources {
            profile,
            followers: &[],
            following: &[],
            repos: &[],
            commits,
            contributors: &[],
            pr_search: &[],
            commit_search: &[],
            organizations: &[],
            issues: &[],
            comments: &[],
            recent_events: &[],
            received_events: &[],
            errors: &[],
            commit_filter: &[],
        }
    }

    #[test]
    fn test_date_inversion_is_strict() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let profile = profile(created);
        let commits = BTreeMap::from([
            // Earliest commit exactly at creation: not flagged.
            (
                "boundary".to_string(),
                vec![commit_at("a".repeat(40).as_str(), created)],
            ),
            // Earliest commit one second before creation: flagged.
            (
                "copied".to_string(),
                vec![
                    commit_at("b".repeat(40).as_str(), created),
                    commit_at(
                        "c".repeat(40).as_str(),
                        created - chrono::Duration::seconds(1),
                    ),
                ],
            ),
        ]);

        let report = ReportBuilder::new("octocat").build(&empty_sources(&profile, &commits));
        assert_eq!(report.potential_copy.len(), 1);
        assert_eq!(report.potential_copy[0].repo, "copied");
    }

    #[test]
    fn test_mutual_followers_and_fork_split() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let profile = profile(created);
        let commits = BTreeMap::new();
        let followers = vec![json!({"login": "ada"}), json!({"login": "bob"})];
        let following = vec![json!({"login": "bob"}), json!({"login": "cyd"})];
        let repos = vec![
            json!({"name": "own", "fork": false}),
            json!({"name": "mirror", "fork": true}),
        ];
        let mut sources = empty_sources(&profile, &commits);
        sources.followers = &followers;
        sources.following = &following;
        sources.repos = &repos;

        let report = ReportBuilder::new("octocat").build(&sources);
        assert_eq!(report.mutual_followers, vec!["bob"]);
        assert_eq!(report.original_repos_count, 1);
        assert_eq!(report.forked_repos_count, 1);
        assert_eq!(report.repo_list, vec!["own"]);
        assert_eq!(report.forked_repo_list, vec!["mirror"]);
    }

    #[test]
    fn test_external_contributions_exclude_own_and_detect_duplicates() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let profile = profile(created);
        let own_sha = "d".repeat(40);
        let commits = BTreeMap::from([(
            "own".to_string(),
            vec![commit_at(&own_sha, created + chrono::Duration::days(1))],
        )]);
        let commit_search = vec![
            // Own repository: ignored entirely.
            json!({
                "sha": "e".repeat(40),
                "repository": {"html_url": "https://github.com/octocat/own",
                               "owner": {"login": "octocat"}},
            }),
            // Every SHA already in own history: a fork-merge artifact.
            json!({
                "sha": own_sha,
                "repository": {"html_url": "https://github.com/upstream/own",
                               "owner": {"login": "upstream"}},
            }),
            // Genuine external contribution.
            json!({
                "sha": "f".repeat(40),
                "repository": {"html_url": "https://github.com/friend/tool",
                               "owner": {"login": "friend"}},
            }),
        ];
        let pr_search = vec![
            json!({
                "repository_url": "https://api.github.com/repos/friend/tool",
                "html_url": "https://github.com/friend/tool/pull/7",
            }),
            json!({
                "repository_url": "https://api.github.com/repos/octocat/own",
                "html_url": "https://github.com/octocat/own/pull/1",
            }),
        ];
        let mut sources = empty_sources(&profile, &commits);
        sources.commit_search = &commit_search;
        sources.pr_search = &pr_search;

        let report = ReportBuilder::new("octocat").build(&sources);
        assert_eq!(report.duplicate_hashes_found, vec!["upstream/own"]);
        assert_eq!(report.commits_to_other_repos.len(), 1);
        assert_eq!(report.commits_to_other_repos[0].repo, "friend/tool");
        assert_eq!(report.pull_requests_to_other_repos.len(), 1);
        assert_eq!(report.pull_requests_to_other_repos[0].repo, "friend/tool");
        assert_eq!(
            report.pull_requests_to_other_repos[0].pull_requests,
            vec!["https://github.com/friend/tool/pull/7"]
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let profile = profile(created);
        let commits = BTreeMap::from([(
            "own".to_string(),
            vec![commit_at("a".repeat(40).as_str(), created + chrono::Duration::days(1))],
        )]);
        let sources = empty_sources(&profile, &commits);
        let builder = ReportBuilder::new("octocat");

        let first = serde_json::to_value(builder.build(&sources)).unwrap();
        let second = serde_json::to_value(builder.build(&sources)).unwrap();
        assert_eq!(first, second);
    }
}
