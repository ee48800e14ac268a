use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::utils::data::DataManager;

/// Print data from an already-persisted report: either one key (dot notation
/// for nested access), a human summary, or the whole report.
pub fn parse_report(
    username: &str,
    key: Option<&str>,
    summary: bool,
    out_path: Option<&Path>,
) -> Result<()> {
    let data_manager = DataManager::new(username, out_path)?;
    let report = data_manager
        .load_existing()
        .ok_or_else(|| anyhow!("no report found for {}", username))?;

    if summary {
        print_summary(&report);
        return Ok(());
    }

    match key {
        Some(key) => {
            let value = get_nested_value(&report, key)
                .ok_or_else(|| anyhow!("key '{}' not found in report", key))?;
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// `profile_info.login` -> report["profile_info"]["login"].
fn get_nested_value<'a>(data: &'a Value, key_path: &str) -> Option<&'a Value> {
    key_path.split('.').try_fold(data, |value, key| value.get(key))
}

const BLUE: &str = "\x1b[94m";
const RED: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

fn label(text: &str) -> String {
    format!("{}{}{}", BLUE, text, RESET)
}

fn print_summary(report: &Value) {
    let info = |key: &str| {
        get_nested_value(report, key)
            .map(display_value)
            .unwrap_or_default()
    };

    println!("{} {}", label("Name:"), info("profile_info.name"));
    println!("{} {}", label("Profile ID:"), info("profile_info.id"));
    println!("{} {}", label("URL:"), info("profile_info.html_url"));
    println!("{} {}", label("Created At:"), info("profile_info.created_at"));
    println!("{} {}", label("Updated At:"), info("profile_info.updated_at"));
    println!(
        "{} ({}/{})",
        label("Followers/Following:"),
        info("profile_info.followers"),
        info("profile_info.following")
    );
    println!(
        "{} ({}/{})",
        label("Repositories/Forks:"),
        info("original_repos_count"),
        info("forked_repos_count")
    );
    println!(
        "{} ({}/{})",
        label("Issues/Comments:"),
        array_len(report, "issues"),
        array_len(report, "comments")
    );

    let mutual = string_array(report, "mutual_followers");
    println!(
        "{} {} [{}]",
        label("Mutual Following:"),
        mutual.len(),
        truncated_list(&mutual)
    );

    let contributors: BTreeSet<String> = report
        .get("contributors")
        .and_then(Value::as_array)
        .map(|repos| {
            repos
                .iter()
                .filter_map(|repo| repo.get("contributors").and_then(Value::as_array))
                .flatten()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let contributors: Vec<String> = contributors.into_iter().collect();
    println!(
        "{} {} [{}]",
        label("Unique Contributors:"),
        contributors.len(),
        truncated_list(&contributors)
    );

    for (section, title) in [
        ("unique_emails.owner", "Emails owner"),
        ("unique_emails.contributors", "Emails contributors"),
        ("unique_emails.other", "Emails other"),
    ] {
        let Some(pairs) = get_nested_value(report, section).and_then(Value::as_array) else {
            continue;
        };
        if pairs.is_empty() {
            continue;
        }
        println!("\n{}", label(&format!("{}:", title)));
        for pair in pairs {
            let email = pair.get("email").and_then(Value::as_str).unwrap_or("");
            let name = pair.get("name").and_then(Value::as_str).unwrap_or("");
            if !email.is_empty() {
                println!("- {}: {}", email, name);
            }
        }
    }

    let flagged = report
        .get("dprk_naming")
        .and_then(Value::as_object)
        .map(|m| !m.is_empty())
        .unwrap_or(false);
    if flagged {
        println!("\n{}{}{}", RED, "Suspicious naming patterns:", RESET);
        println!(
            "{}",
            serde_json::to_string_pretty(&report["dprk_naming"]).unwrap_or_default()
        );
    }
    let copied = array_len(report, "potential_copy");
    if copied > 0 {
        println!(
            "\n{}Repositories with commits predating the account: {}{}",
            RED, copied, RESET
        );
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn array_len(report: &Value, key: &str) -> usize {
    report
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn string_array(report: &Value, key: &str) -> Vec<String> {
    report
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn truncated_list(items: &[String]) -> String {
    let mut list = items.iter().take(10).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > 10 {
        list.push_str(" <cut+10>");
    }
    list
}
