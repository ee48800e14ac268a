use std::collections::{BTreeMap, BTreeSet};

use crate::models::{CategorizedEmails, CommitRecord, NameEmailPair, RepoContributors};

/// Classifies every distinct (name, email) pair found in commit history as
/// belonging to the account owner, a known contributor, or someone else.
///
/// Commit authorship is inconsistently attributed across tools and machines:
/// the same person shows up under several name spellings and several emails.
/// A single scan under-classifies, so ownership is propagated to a fixed
/// point: a confirmed owner name confirms its emails, and a confirmed owner
/// email confirms its names, until a full pass adds nothing.
pub struct IdentityCategorizer {
    username: String,
    contributors: BTreeSet<String>,
}

impl IdentityCategorizer {
    pub fn new(username: &str, contributors: &[RepoContributors]) -> Self {
        let username = username.to_lowercase();
        let mut logins: BTreeSet<String> = contributors
            .iter()
            .flat_map(|c| c.contributors.iter())
            .map(|login| login.to_lowercase())
            .collect();
        // The owner is not their own contributor.
        logins.remove(&username);
        Self {
            username,
            contributors: logins,
        }
    }

    pub fn categorize(&self, commits: &BTreeMap<String, Vec<CommitRecord>>) -> CategorizedEmails {
        let all_commits: Vec<&CommitRecord> = commits.values().flatten().collect();

        let mut unique_pairs: BTreeSet<NameEmailPair> = BTreeSet::new();
        for commit in &all_commits {
            unique_pairs.extend(commit.name_email_pairs());
        }
        // Platform-generated merge identity, not attributable to anyone.
        unique_pairs
            .retain(|pair| !(pair.name == "GitHub" && pair.email == "noreply@github.com"));

        let owner_pairs = self.owner_closure(&all_commits, unique_pairs.len());

        let mut categorized = CategorizedEmails::default();
        for pair in unique_pairs {
            if owner_pairs.contains(&pair) {
                categorized.owner.push(pair);
            } else if self.is_contributor(&pair.name, &pair.email) {
                categorized.contributors.push(pair);
            } else {
                categorized.other.push(pair);
            }
        }
        // BTreeSet iteration already yields (email, name) order.
        categorized
    }

    /// Seed owner identities from the username and from every email the
    /// username appears in (personal and noreply forms), then saturate:
    /// known owner names claim their emails, known owner emails claim their
    /// names. The pair universe is finite, so the loop terminates; the pass
    /// bound is a guard against a scan that flips state without converging.
    fn owner_closure(
        &self,
        all_commits: &[&CommitRecord],
        pair_count: usize,
    ) -> BTreeSet<NameEmailPair> {
        let mut owner_names: BTreeSet<String> = BTreeSet::new();
        owner_names.insert(self.username.clone());
        let mut owner_pairs: BTreeSet<NameEmailPair> = BTreeSet::new();
        let mut owner_emails: BTreeSet<String> = BTreeSet::new();

        for commit in all_commits {
            for pair in commit.name_email_pairs() {
                if pair.email.to_lowercase().contains(&self.username) {
                    owner_names.insert(pair.name.to_lowercase());
                    owner_emails.insert(pair.email.to_lowercase());
                    owner_pairs.insert(pair);
                }
            }
        }

        let max_passes = 2 * pair_count + 2;
        let mut changed = true;
        let mut passes = 0;
        while changed && passes < max_passes {
            changed = false;
            passes += 1;
            for commit in all_commits {
                for pair in commit.name_email_pairs() {
                    let name_lower = pair.name.to_lowercase();
                    let email_lower = pair.email.to_lowercase();
                    if owner_names.contains(&name_lower) {
                        if owner_pairs.insert(pair.clone()) {
                            owner_emails.insert(email_lower.clone());
                            changed = true;
                        }
                    }
                    if owner_emails.contains(&email_lower) && owner_names.insert(name_lower) {
                        changed = true;
                    }
                }
            }
        }

        owner_pairs
    }

    /// A pair belongs to a contributor when its name or email can be tied to
    /// a login fetched from the contributors endpoints. Commit names rarely
    /// equal logins exactly, so after the exact and noreply-email checks a
    /// fuzzy prefix/containment match is applied. All checks are
    /// case-insensitive.
    fn is_contributor(&self, name: &str, email: &str) -> bool {
        let name_lower = name.to_lowercase();
        let email_lower = email.to_lowercase();

        if self.contributors.contains(&name_lower) {
            return true;
        }

        let email_local = email_lower.split('@').next().unwrap_or("");
        if self.contributors.contains(email_local) {
            return true;
        }

        // 123456+login@users.noreply.github.com or login@users.noreply.github.com
        if email_lower.ends_with("@users.noreply.github.com") {
            let login = match email_local.split_once('+') {
                Some((_, login)) => login,
                None => email_local,
            };
            if self.contributors.contains(login) {
                return true;
            }
        }

        let name_no_spaces = name_lower.replace(' ', "");
        for login in &self.contributors {
            if login.starts_with(&name_lower) || name_lower.starts_with(login.as_str()) {
                return true;
            }
            if name_no_spaces == *login || name_no_spaces.contains(login.as_str()) {
                return true;
            }
            if !email_local.is_empty()
                && (login.starts_with(email_local) || email_local.starts_with(login.as_str()))
            {
                return true;
            }
        }

        false
    }
}
