use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of a repository bag the pipeline branches on. Repositories with
/// `fork == false` are cloned for full history; forks are covered through the
/// commit/PR search endpoints instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub name: String,
    pub owner: String,
    pub fork: bool,
    pub clone_url: String,
}

impl RepoDescriptor {
    pub fn from_value(raw: &Value) -> Result<Self> {
        let name = raw
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("repository bag has no name field"))?
            .to_string();
        let owner = raw
            .get("owner")
            .and_then(|o| o.get("login"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let fork = raw.get("fork").and_then(|v| v.as_bool()).unwrap_or(false);
        let clone_url = raw
            .get("clone_url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            name,
            owner,
            fork,
            clone_url,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let repo = RepoDescriptor::from_value(&json!({
            "name": "hello-world",
            "owner": {"login": "octocat"},
            "fork": true,
            "clone_url": "https://github.com/octocat/hello-world.git"
        }))
        .unwrap();
        assert_eq!(repo.full_name(), "octocat/hello-world");
        assert!(repo.fork);

        // fork/clone_url default when missing, name is required
        let repo = RepoDescriptor::from_value(&json!({"name": "x"})).unwrap();
        assert!(!repo.fork);
        assert!(RepoDescriptor::from_value(&json!({"fork": false})).is_err());
    }
}
