use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gix::bstr::{BStr, ByteSlice};

use crate::models::{CommitRecord, FailureRecord, RepoDescriptor};
use crate::utils::validators::validate_clone_url;

/// Collects full commit history for a user's own (non-fork) repositories by
/// bare-cloning each one into a scratch directory, walking the history
/// newest-first, and removing the scratch clone no matter how the clone or
/// walk went. Forks are never cloned; the user's activity in them comes from
/// the search endpoints instead.
pub struct GitHistoryCollector {
    username: String,
    scratch_root: PathBuf,
    clone_depth: u32,
}

impl GitHistoryCollector {
    pub fn new(username: &str, scratch_root: &Path, clone_depth: u32) -> Self {
        Self {
            username: username.to_string(),
            scratch_root: scratch_root.to_path_buf(),
            clone_depth,
        }
    }

    /// Clone and read every non-fork repository. One repository failing
    /// produces a `FailureRecord` and never aborts the rest; a repository
    /// with zero commits contributes an empty list, not a failure.
    pub async fn collect(
        &self,
        repos: &[RepoDescriptor],
    ) -> (BTreeMap<String, Vec<CommitRecord>>, Vec<FailureRecord>) {
        let mut commits = BTreeMap::new();
        let mut failures = Vec::new();

        for repo in repos.iter().filter(|r| !r.fork) {
            if let Err(e) = validate_clone_url(&repo.clone_url) {
                log::error!("Skipping {}: {}", repo.name, e);
                failures.push(FailureRecord {
                    repo_name: repo.name.clone(),
                    clone_url: repo.clone_url.clone(),
                    reason: e.to_string(),
                });
                continue;
            }

            log::info!("Git clone: {}", repo.clone_url);
            let scratch = self
                .scratch_root
                .join(format!("{}_{}.git", self.username, repo.name));
            let clone_url = repo.clone_url.clone();
            let depth = self.clone_depth;

            let result =
                tokio::task::spawn_blocking(move || clone_and_read(&clone_url, &scratch, depth))
                    .await;

            match result {
                Ok(Ok(records)) => {
                    log::info!("Fetched {} commits from {}", records.len(), repo.name);
                    commits.insert(repo.name.clone(), records);
                }
                Ok(Err(e)) => {
                    log::error!("Git clone failed for {}: {:#}", repo.name, e);
                    failures.push(FailureRecord {
                        repo_name: repo.name.clone(),
                        clone_url: repo.clone_url.clone(),
                        reason: format!("{:#}", e),
                    });
                }
                Err(e) => {
                    log::error!("History task for {} did not complete: {}", repo.name, e);
                    failures.push(FailureRecord {
                        repo_name: repo.name.clone(),
                        clone_url: repo.clone_url.clone(),
                        reason: format!("history task did not complete: {}", e),
                    });
                }
            }
        }

        (commits, failures)
    }
}

/// Removes the scratch clone on drop, so cleanup happens on success, error
/// and panic alike. Scratch space must never leak across targets.
struct ScratchGuard {
    path: PathBuf,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                log::warn!(
                    "Failed to remove scratch clone {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

fn clone_and_read(clone_url: &str, scratch: &Path, depth: u32) -> Result<Vec<CommitRecord>> {
    let _guard = ScratchGuard {
        path: scratch.to_path_buf(),
    };
    // Stale scratch from an interrupted earlier run.
    if scratch.exists() {
        fs::remove_dir_all(scratch)?;
    }

    let mut prepare = gix::prepare_clone_bare(clone_url, scratch)
        .with_context(|| format!("clone setup failed for {}", clone_url))?;
    if let Some(depth) = NonZeroU32::new(depth) {
        prepare = prepare.with_shallow(gix::remote::fetch::Shallow::DepthAtRemote(depth));
    }

    let interrupt = AtomicBool::new(false);
    let (repo, _outcome) = prepare
        .fetch_only(gix::progress::Discard, &interrupt)
        .with_context(|| format!("git clone failed for {}", clone_url))?;

    read_commits(&repo)
}

/// Walk the history newest-first and normalize each commit. The walk order
/// matters downstream: "first commit" of a repository is the last element.
fn read_commits(repo: &gix::Repository) -> Result<Vec<CommitRecord>> {
    let Ok(head_id) = repo.head_id() else {
        // Unborn HEAD: the repository has no commits.
        return Ok(Vec::new());
    };

    let walk = repo
        .rev_walk([head_id.detach()])
        .sorting(gix::traverse::commit::simple::Sorting::ByCommitTimeNewestFirst)
        .all()
        .context("failed to start history walk")?;

    let mut records = Vec::new();
    for entry in walk {
        let Ok(info) = entry else { continue };
        let Ok(commit) = repo.find_commit(info.id) else {
            continue;
        };
        records.push(normalize_commit(info.id, &commit));
    }
    Ok(records)
}

fn normalize_commit(id: gix::ObjectId, commit: &gix::Commit<'_>) -> CommitRecord {
    let (author_name, author_email, author_date) = signature_parts(commit.author().ok());
    let (committer_name, committer_email, committer_date) =
        signature_parts(commit.committer().ok());

    CommitRecord {
        sha: id.to_string().to_ascii_lowercase(),
        author_name,
        author_email,
        author_date,
        committer_name,
        committer_email,
        committer_date,
        message: decode_text(commit.message_raw_sloppy()),
    }
}

fn signature_parts(
    signature: Option<gix::actor::SignatureRef<'_>>,
) -> (String, String, DateTime<Utc>) {
    match signature {
        Some(signature) => (
            decode_text(signature.name),
            decode_text(signature.email),
            DateTime::from_timestamp(signature.time.seconds, 0).unwrap_or(DateTime::UNIX_EPOCH),
        ),
        None => (String::new(), String::new(), DateTime::UNIX_EPOCH),
    }
}

fn decode_text(bytes: &BStr) -> String {
    bytes.to_str_lossy().trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gix::date::Time;

    fn signature<'a>(name: &'a str, email: &'a str, seconds: i64) -> gix::actor::SignatureRef<'a> {
        gix::actor::SignatureRef {
            name: name.into(),
            email: email.into(),
            time: Time::new(seconds, 0),
        }
    }

    fn fixture_repo_with_commits(dir: &Path) -> gix::Repository {
        let repo = gix::init_bare(dir).unwrap();
        let tree = gix::ObjectId::empty_tree(gix::hash::Kind::Sha1);

        let first = repo
            .commit_as(
                signature("Alice", "alice@example.com", 1_000),
                signature("Alice", "alice@example.com", 1_000),
                "HEAD",
                "first commit body",
                tree,
                gix::commit::NO_PARENT_IDS,
            )
            .unwrap();
        repo.commit_as(
            signature("Bot", "bot@ci.example.com", 2_000),
            signature("Alice", "alice@example.com", 2_000),
            "HEAD",
            "second commit body",
            tree,
            [first.detach()],
        )
        .unwrap();

        repo
    }

    #[test]
    fn test_read_commits_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = fixture_repo_with_commits(dir.path());

        let records = read_commits(&repo).unwrap();
        assert_eq!(records.len(), 2);
        // Newest first; "first commit" of the repo is the last element.
        assert_eq!(records[0].message, "second commit body");
        assert_eq!(records[1].message, "first commit body");
        assert_eq!(records[1].author_name, "Alice");
        assert_eq!(records[0].committer_email, "bot@ci.example.com");
        assert_eq!(records[1].author_date.timestamp(), 1_000);
        assert_eq!(records[0].sha.len(), 40);
    }

    #[test]
    fn test_read_commits_empty_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = gix::init_bare(dir.path()).unwrap();
        assert!(read_commits(&repo).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clone_failure_is_recorded_and_scratch_removed() {
        let dir = tempfile::tempdir().unwrap();
        let collector = GitHistoryCollector::new("octocat", dir.path(), 100);
        let repos = vec![RepoDescriptor {
            name: "nope".to_string(),
            owner: "octocat".to_string(),
            fork: false,
            clone_url: "http://127.0.0.1:9/octocat/nope.git".to_string(),
        }];

        let (commits, failures) = collector.collect(&repos).await;
        assert!(commits.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].repo_name, "nope");
        // Scratch clone must not leak, success or failure.
        assert!(!dir.path().join("octocat_nope.git").exists());
    }

    #[tokio::test]
    async fn test_invalid_clone_url_is_recorded_without_cloning() {
        let dir = tempfile::tempdir().unwrap();
        let collector = GitHistoryCollector::new("octocat", dir.path(), 100);
        let repos = vec![
            RepoDescriptor {
                name: "bad".to_string(),
                owner: "octocat".to_string(),
                fork: false,
                clone_url: "git@github.com:octocat/bad.git".to_string(),
            },
            // Forks are skipped entirely.
            RepoDescriptor {
                name: "forked".to_string(),
                owner: "octocat".to_string(),
                fork: true,
                clone_url: "http://127.0.0.1:9/x/forked.git".to_string(),
            },
        ];

        let (commits, failures) = collector.collect(&repos).await;
        assert!(commits.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].repo_name, "bad");
    }
}
