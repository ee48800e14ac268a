use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Fields carried into the report's `profile_info` section. Everything else
/// the provider returns is clutter for this tool's purposes.
const PROFILE_INFO_KEYS: &[&str] = &[
    "login",
    "id",
    "node_id",
    "avatar_url",
    "html_url",
    "type",
    "site_admin",
    "name",
    "company",
    "blog",
    "location",
    "email",
    "hireable",
    "bio",
    "twitter_username",
    "public_repos",
    "public_gists",
    "followers",
    "following",
    "created_at",
    "updated_at",
];

/// A user profile as returned by the provider. The raw bag is kept for
/// pass-through into the report; the fields the pipeline branches on are
/// validated at construction time.
#[derive(Clone, Debug)]
pub struct ProfileRecord {
    pub login: String,
    pub id: u64,
    pub created_at: DateTime<Utc>,
    raw: Value,
}

impl ProfileRecord {
    pub fn from_value(raw: Value) -> Result<Self> {
        let login = raw
            .get("login")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("profile response has no login field"))?
            .to_string();
        let id = raw
            .get("id")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("profile response has no numeric id field"))?;
        let created_at = raw
            .get("created_at")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("profile response has no created_at field"))?;
        let created_at = DateTime::parse_from_rfc3339(created_at)
            .map_err(|e| anyhow!("unparseable profile created_at: {}", e))?
            .with_timezone(&Utc);

        Ok(Self {
            login,
            id,
            created_at,
            raw,
        })
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.raw.get("avatar_url").and_then(|v| v.as_str())
    }

    /// Select the `profile_info` subset of the raw bag. Missing keys are
    /// emitted as null so the report shape stays stable.
    pub fn summary(&self) -> Value {
        let mut info = serde_json::Map::new();
        for key in PROFILE_INFO_KEYS {
            info.insert(
                key.to_string(),
                self.raw.get(*key).cloned().unwrap_or(Value::Null),
            );
        }
        json!(info)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        json!({
            "login": "octocat",
            "id": 583231,
            "created_at": "2011-01-25T18:44:36Z",
            "avatar_url": "https://avatars.githubusercontent.com/u/583231",
            "followers": 3938,
            "repos_url": "https://api.github.com/users/octocat/repos"
        })
    }

    #[test]
    fn test_from_value_validates_required_fields() {
        let profile = ProfileRecord::from_value(sample()).unwrap();
        assert_eq!(profile.login, "octocat");
        assert_eq!(profile.id, 583231);
        assert_eq!(profile.created_at.to_rfc3339(), "2011-01-25T18:44:36+00:00");

        assert!(ProfileRecord::from_value(json!({"login": "x"})).is_err());
        assert!(ProfileRecord::from_value(json!({
            "login": "x", "id": 1, "created_at": "not a date"
        }))
        .is_err());
    }

    #[test]
    fn test_summary_keeps_shape_stable() {
        let profile = ProfileRecord::from_value(sample()).unwrap();
        let summary = profile.summary();
        assert_eq!(summary["login"], "octocat");
        assert_eq!(summary["followers"], 3938);
        // Absent keys are present as null, clutter keys are gone.
        assert!(summary["bio"].is_null());
        assert!(summary.get("repos_url").is_none());
    }
}
