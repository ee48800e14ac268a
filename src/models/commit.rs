use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit from a cloned repository, normalized from the raw git object.
/// Immutable once collected; unique by `sha` within a repository.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<Utc>,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: DateTime<Utc>,
    pub message: String,
}

impl CommitRecord {
    /// The distinct (name, email) pairs this commit attributes work to.
    /// Pairs with an empty name or email are not attributable and skipped.
    pub fn name_email_pairs(&self) -> Vec<NameEmailPair> {
        let mut pairs = Vec::with_capacity(2);
        if !self.author_name.is_empty() && !self.author_email.is_empty() {
            pairs.push(NameEmailPair {
                email: self.author_email.clone(),
                name: self.author_name.clone(),
            });
        }
        if !self.committer_name.is_empty() && !self.committer_email.is_empty() {
            let committer = NameEmailPair {
                email: self.committer_email.clone(),
                name: self.committer_name.clone(),
            };
            if !pairs.contains(&committer) {
                pairs.push(committer);
            }
        }
        pairs
    }
}

/// A (name, email) attribution unit derived from commit author or committer
/// fields. Ordered by (email, name) so categorized output is deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameEmailPair {
    pub email: String,
    pub name: String,
}

/// One repository whose history could not be collected. The run continues;
/// these end up in the report's `errors` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub repo_name: String,
    pub clone_url: String,
    pub reason: String,
}
