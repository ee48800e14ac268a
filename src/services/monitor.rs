use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::Instant;

use crate::models::EventSummary;
use crate::services::github::{ApiError, GithubFetcher};
use crate::utils::config::Config;

/// Profile fields whose edits are reported while monitoring.
const PROFILE_WATCH_FIELDS: &[&str] = &[
    "name",
    "company",
    "blog",
    "location",
    "email",
    "bio",
    "twitter_username",
    "updated_at",
];

/// Events poll on the provider's interval; the profile is heavier and is
/// rechecked at most this often.
const PROFILE_RECHECK: Duration = Duration::from_secs(600);

const RECENT_EVENT_WINDOW_DAYS: i64 = 90;

#[derive(Default)]
struct TargetState {
    etag: Option<String>,
    following_count: u64,
    fields: BTreeMap<String, Value>,
    last_info_check: Option<Instant>,
}

/// Watches target accounts live: polls the public event feed with ETag
/// conditional requests so unchanged polls cost no rate-limit budget, and
/// periodically diffs the profile for edits and new follows. Findings go to
/// the log; the loop runs until Ctrl+C.
pub struct EventMonitor<'a> {
    fetcher: &'a GithubFetcher,
    /// Seconds between polls when the provider sends no `X-Poll-Interval`.
    poll_fallback: u64,
}

impl<'a> EventMonitor<'a> {
    pub fn new(fetcher: &'a GithubFetcher, config: &Config) -> Self {
        Self {
            fetcher,
            poll_fallback: config.monitor_sleep,
        }
    }

    /// One-shot summary of the account's events from the last 90 days,
    /// for the analysis report.
    pub async fn recent_events(&self, username: &str) -> Result<Vec<EventSummary>, ApiError> {
        let (events, _, _) = self.fetcher.fetch_user_events(username, None).await?;
        let events = events.unwrap_or_default();
        Ok(filter_recent(summarize_events(&events), Utc::now()))
    }

    /// Same window, for events the account received from others.
    pub async fn recent_received_events(
        &self,
        username: &str,
    ) -> Result<Vec<EventSummary>, ApiError> {
        let events = self.fetcher.fetch_received_events(username).await?;
        Ok(filter_recent(summarize_events(&events), Utc::now()))
    }

    pub async fn run(&self, targets: &[String]) -> Result<(), ApiError> {
        if targets.is_empty() {
            log::info!("No monitor target(s) specified");
            return Ok(());
        }

        let mut states: Vec<(String, TargetState)> = targets
            .iter()
            .map(|username| (username.clone(), TargetState::default()))
            .collect();

        log::info!("Monitoring activity for: {}", targets.join(", "));
        log::info!("Press Ctrl+C to stop monitoring.");

        loop {
            for (username, state) in states.iter_mut() {
                let poll_interval = self.poll_target(username, state).await?;

                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Stopping user activity monitoring.");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(self.poll_delay(poll_interval)) => {}
                }
            }
        }
    }

    /// Provider interval wins; the configured sleep covers its absence.
    fn poll_delay(&self, header_interval: Option<u64>) -> Duration {
        Duration::from_secs(header_interval.unwrap_or(self.poll_fallback))
    }

    async fn poll_target(
        &self,
        username: &str,
        state: &mut TargetState,
    ) -> Result<Option<u64>, ApiError> {
        let (events, new_etag, poll_interval) = self
            .fetcher
            .fetch_user_events(username, state.etag.as_deref())
            .await?;
        state.etag = new_etag;

        if let Some(events) = events {
            for event in summarize_events(&events) {
                log::info!(
                    "User: {}, {}, Date: {}",
                    username,
                    event.description,
                    event.date
                );
            }
        }

        for change in self.profile_changes(username, state).await? {
            log::info!("{}", change);
        }

        Ok(poll_interval)
    }

    /// Diff the profile against the last observed values. Follows are
    /// reported by name: when the following count grows by N, the N newest
    /// entries of the following list are assumed to be the additions.
    async fn profile_changes(
        &self,
        username: &str,
        state: &mut TargetState,
    ) -> Result<Vec<String>, ApiError> {
        if state
            .last_info_check
            .is_some_and(|checked| checked.elapsed() < PROFILE_RECHECK)
        {
            return Ok(Vec::new());
        }
        state.last_info_check = Some(Instant::now());

        let Some(info) = self.fetcher.fetch_profile(username).await? else {
            return Ok(Vec::new());
        };

        let mut changes = Vec::new();

        let following_count = info.get("following").and_then(Value::as_u64).unwrap_or(0);
        if following_count > state.following_count {
            let new_follows = (following_count - state.following_count) as usize;
            let following = self.fetcher.fetch_following(username).await?;
            for followed in following.iter().take(new_follows) {
                if let Some(login) = followed.get("login").and_then(Value::as_str) {
                    changes.push(format!("User: {} is now following {}", username, login));
                }
            }
        }
        state.following_count = following_count;

        for field in PROFILE_WATCH_FIELDS {
            let new_value = info.get(*field).cloned().unwrap_or(Value::Null);
            let old_value = state.fields.get(*field).cloned().unwrap_or(Value::Null);
            if new_value != old_value {
                if *field == "updated_at" {
                    changes.push(format!(
                        "User: {} profile was updated at {}",
                        username, new_value
                    ));
                } else {
                    changes.push(format!(
                        "User: {} changed their {} from {} to {}",
                        username, field, old_value, new_value
                    ));
                }
                state.fields.insert(field.to_string(), new_value);
            }
        }

        Ok(changes)
    }
}

/// Raw provider events reduced to the shape the report carries.
pub fn summarize_events(events: &[Value]) -> Vec<EventSummary> {
    events
        .iter()
        .map(|event| EventSummary {
            event_type: string_at(event, "/type"),
            target: string_at(event, "/repo/name"),
            date: string_at(event, "/created_at"),
            description: interpret_event(event),
        })
        .collect()
}

fn filter_recent(events: Vec<EventSummary>, now: DateTime<Utc>) -> Vec<EventSummary> {
    let cutoff = now - chrono::Duration::days(RECENT_EVENT_WINDOW_DAYS);
    events
        .into_iter()
        .filter(|event| {
            DateTime::parse_from_rfc3339(&event.date)
                .map(|date| date.with_timezone(&Utc) > cutoff)
                .unwrap_or(false)
        })
        .collect()
}

/// One human-readable line per event type.
fn interpret_event(event: &Value) -> String {
    let actor = string_at(event, "/actor/login");
    let repo = string_at(event, "/repo/name");
    let action = string_at(event, "/payload/action");
    let ref_type = string_at(event, "/payload/ref_type");

    match event.get("type").and_then(Value::as_str) {
        Some("WatchEvent") => format!("{} starred the repository {}", actor, repo),
        Some("PushEvent") => {
            let commits = event
                .pointer("/payload/commits")
                .and_then(Value::as_array)
                .map(|c| c.len())
                .unwrap_or(0);
            format!("{} pushed to {}. Commits: {}", actor, repo, commits)
        }
        Some("CreateEvent") => format!("{} created a {} in {}", actor, ref_type, repo),
        Some("DeleteEvent") => format!("{} deleted a {} in {}", actor, ref_type, repo),
        Some("ForkEvent") => format!("{} forked {}", actor, repo),
        Some("IssuesEvent") => format!("{} {} an issue in {}", actor, action, repo),
        Some("IssueCommentEvent") => format!("{} commented on an issue in {}", actor, repo),
        Some("PullRequestEvent") => format!("{} {} a pull request in {}", actor, action, repo),
        Some("PullRequestReviewEvent") => format!("{} reviewed a pull request in {}", actor, repo),
        Some("PullRequestReviewCommentEvent") => {
            format!("{} commented on a pull request review in {}", actor, repo)
        }
        Some("CommitCommentEvent") => format!("{} commented on a commit in {}", actor, repo),
        Some("ReleaseEvent") => format!("{} {} a release in {}", actor, action, repo),
        Some("PublicEvent") => format!("{} made {} public", actor, repo),
        Some("MemberEvent") => format!("{} {} a member in {}", actor, action, repo),
        Some("GollumEvent") => format!("{} updated the wiki in {}", actor, repo),
        other => format!("Unknown event type: {}", other.unwrap_or("none")),
    }
}

fn string_at(event: &Value, pointer: &str) -> String {
    event
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::services::github::client::tests_support::{ok_with_headers, ScriptedTransport};
    use crate::services::github::GithubClient;

    fn event(event_type: &str, created_at: &str) -> Value {
        json!({
            "type": event_type,
            "actor": {"login": "octocat"},
            "repo": {"name": "octocat/hello"},
            "created_at": created_at,
            "payload": {"action": "opened", "ref_type": "branch", "commits": [{}, {}]},
        })
    }

    #[test]
    fn test_interpret_event_descriptions() {
        assert_eq!(
            interpret_event(&event("PushEvent", "2024-01-01T00:00:00Z")),
            "octocat pushed to octocat/hello. Commits: 2"
        );
        assert_eq!(
            interpret_event(&event("WatchEvent", "2024-01-01T00:00:00Z")),
            "octocat starred the repository octocat/hello"
        );
        assert_eq!(
            interpret_event(&event("IssuesEvent", "2024-01-01T00:00:00Z")),
            "octocat opened an issue in octocat/hello"
        );
        assert_eq!(
            interpret_event(&event("CreateEvent", "2024-01-01T00:00:00Z")),
            "octocat created a branch in octocat/hello"
        );
        assert_eq!(
            interpret_event(&event("TeleportEvent", "2024-01-01T00:00:00Z")),
            "Unknown event type: TeleportEvent"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_delay_uses_configured_sleep_without_header() {
        let transport = ScriptedTransport::new();
        transport.script(
            "https://api.github.com/users/octocat/events",
            ok_with_headers(json!([]), &[("etag", "\"e1\"")]),
        );
        let config = Config {
            monitor_sleep: 25,
            ..Config::default()
        };
        let client = GithubClient::with_transport(transport, &config);
        let fetcher = GithubFetcher::new(Arc::new(client), &config);
        let monitor = EventMonitor::new(&fetcher, &config);

        let mut state = TargetState::default();
        let poll = monitor.poll_target("octocat", &mut state).await.unwrap();
        assert_eq!(poll, None);
        assert_eq!(monitor.poll_delay(poll), Duration::from_secs(25));
        // A provider-sent interval overrides the configured sleep.
        assert_eq!(monitor.poll_delay(Some(120)), Duration::from_secs(120));
    }

    #[test]
    fn test_summarize_and_filter_recent() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let events = vec![
            event("WatchEvent", "2024-05-20T12:00:00Z"),
            event("ForkEvent", "2023-01-01T00:00:00Z"),
            event("PushEvent", "not a date"),
        ];

        let recent = filter_recent(summarize_events(&events), now);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_type, "WatchEvent");
        assert_eq!(recent[0].target, "octocat/hello");
        assert_eq!(recent[0].date, "2024-05-20T12:00:00Z");
    }
}
