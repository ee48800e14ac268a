use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::commit::{CommitRecord, FailureRecord, NameEmailPair};
use super::event::EventSummary;

/// Name-email pairs classified as owner / contributor / other by the
/// fixed-point categorizer. Each list is sorted by (email, name).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedEmails {
    pub owner: Vec<NameEmailPair>,
    pub contributors: Vec<NameEmailPair>,
    pub other: Vec<NameEmailPair>,
}

/// A repository whose earliest commit predates the account's creation date.
/// Git allows arbitrary author dates, so this is a signal, not proof.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateInversionFlag {
    pub repo: String,
    pub reason: String,
    pub commit_date: String,
}

/// Result of searching one commit message across the provider. A record with
/// `search_results == 0` marks a repository that had nothing to search, so
/// downstream consumers can tell "not checked" from "checked, no matches".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub target_repo: String,
    pub target_commit: String,
    pub search_results: u64,
    pub matching_repos: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoContributors {
    pub repo: String,
    pub contributors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoPullRequests {
    pub repo: String,
    pub pull_requests: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoCommits {
    pub repo: String,
    pub commits: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NamesForEmail {
    pub names: Vec<String>,
    pub count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailsForName {
    pub emails: Vec<String>,
    pub count: usize,
}

/// Evidence of one operator rotating through aliases: any email used with
/// more than one name, or name used with more than one email, among the
/// pairs already attributed to the account owner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRotation {
    pub multiple_names_per_email: BTreeMap<String, NamesForEmail>,
    pub multiple_emails_per_name: BTreeMap<String, EmailsForName>,
}

/// The full per-account snapshot persisted as `report.json`. Built once per
/// run and rewritten whole; a key whose data was unavailable is present with
/// an empty container, never absent.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Report {
    pub profile_info: Value,
    pub original_repos_count: usize,
    pub forked_repos_count: usize,
    pub unique_emails: CategorizedEmails,
    pub dprk_naming: BTreeMap<String, Vec<String>>,
    pub identity_rotation: IdentityRotation,
    pub mutual_followers: Vec<String>,
    pub potential_copy: Vec<DateInversionFlag>,
    pub contributors: Vec<RepoContributors>,
    pub following: Vec<String>,
    pub followers: Vec<String>,
    pub repo_list: Vec<String>,
    pub forked_repo_list: Vec<String>,
    pub pull_requests_to_other_repos: Vec<RepoPullRequests>,
    pub commits_to_other_repos: Vec<RepoCommits>,
    pub duplicate_hashes_found: Vec<String>,
    pub repos: Vec<Value>,
    pub commits: BTreeMap<String, Vec<CommitRecord>>,
    pub errors: Vec<FailureRecord>,
    pub commit_filter: Vec<MatchRecord>,
    pub recent_events: Vec<EventSummary>,
    pub received_events: Vec<EventSummary>,
    pub issues: Vec<Value>,
    pub comments: Vec<Value>,
    pub organizations_member: Vec<String>,
}
