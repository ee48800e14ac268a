use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{EmailsForName, IdentityRotation, NameEmailPair, NamesForEmail, RepoContributors};

/// Naming pattern repeatedly observed on DPRK-operated developer accounts:
/// a run of letters followed by exactly four digits ("stardev2024",
/// "cloudkeeper0917").
static SUSPICIOUS_NAMING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+[0-9]{4}$").expect("static pattern"));

/// Test the account's naming surfaces against the suspicious pattern and
/// group the hits by where they were found. Categories with no hits are
/// omitted so an empty map means "nothing flagged".
pub fn dprk_naming(
    username: &str,
    owner_pairs: &[NameEmailPair],
    contributors: &[RepoContributors],
) -> BTreeMap<String, Vec<String>> {
    let mut flagged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut flag = |category: &str, candidate: &str| {
        if SUSPICIOUS_NAMING.is_match(candidate) {
            flagged
                .entry(category.to_string())
                .or_default()
                .insert(candidate.to_string());
        }
    };

    flag("username", username);
    for pair in owner_pairs {
        flag("owner_names", &pair.name);
        if let Some(local) = pair.email.split('@').next() {
            flag("owner_email_local_parts", local);
        }
    }
    for repo in contributors {
        for login in &repo.contributors {
            flag("contributors", login);
        }
    }

    flagged
        .into_iter()
        .map(|(category, hits)| (category, hits.into_iter().collect()))
        .collect()
}

/// One operator rotating through aliases leaves the same email behind several
/// display names, or the same name behind several emails. Only pairs already
/// attributed to the owner are considered; a single-entry mapping is normal
/// and not reported.
pub fn identity_rotation(owner_pairs: &[NameEmailPair]) -> IdentityRotation {
    let mut names_per_email: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut emails_per_name: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for pair in owner_pairs {
        names_per_email
            .entry(pair.email.clone())
            .or_default()
            .insert(pair.name.clone());
        emails_per_name
            .entry(pair.name.clone())
            .or_default()
            .insert(pair.email.clone());
    }

    IdentityRotation {
        multiple_names_per_email: names_per_email
            .into_iter()
            .filter(|(_, names)| names.len() > 1)
            .map(|(email, names)| {
                let names: Vec<String> = names.into_iter().collect();
                let count = names.len();
                (email, NamesForEmail { names, count })
            })
            .collect(),
        multiple_emails_per_name: emails_per_name
            .into_iter()
            .filter(|(_, emails)| emails.len() > 1)
            .map(|(name, emails)| {
                let emails: Vec<String> = emails.into_iter().collect();
                let count = emails.len();
                (name, EmailsForName { emails, count })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, email: &str) -> NameEmailPair {
        NameEmailPair {
            email: email.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_dprk_naming_groups_by_category_and_omits_empty() {
        let owner_pairs = vec![
            pair("stardev2024", "cloudkeeper0917@mail.example"),
            pair("Alice Smith", "alice@mail.example"),
        ];
        let contributors = vec![RepoContributors {
            repo: "project".to_string(),
            contributors: vec!["bob".to_string()],
        }];

        let flagged = dprk_naming("devguru1234", &owner_pairs, &contributors);
        assert_eq!(flagged["username"], vec!["devguru1234"]);
        assert_eq!(flagged["owner_names"], vec!["stardev2024"]);
        assert_eq!(flagged["owner_email_local_parts"], vec!["cloudkeeper0917"]);
        // No contributor matched, so the category is absent.
        assert!(!flagged.contains_key("contributors"));
    }

    #[test]
    fn test_dprk_naming_requires_exactly_four_trailing_digits() {
        assert!(dprk_naming("dev123", &[], &[]).is_empty());
        assert!(dprk_naming("dev12345", &[], &[]).is_empty());
        assert!(dprk_naming("1234", &[], &[]).is_empty());
        assert!(!dprk_naming("dev1234", &[], &[]).is_empty());
    }

    #[test]
    fn test_identity_rotation_reports_only_multiples() {
        let owner_pairs = vec![
            pair("Alice", "a@x.example"),
            pair("Alicia", "a@x.example"),
            pair("Alice", "b@x.example"),
            pair("Solo", "solo@x.example"),
        ];

        let rotation = identity_rotation(&owner_pairs);
        assert_eq!(
            rotation.multiple_names_per_email["a@x.example"],
            NamesForEmail {
                names: vec!["Alice".to_string(), "Alicia".to_string()],
                count: 2,
            }
        );
        assert_eq!(
            rotation.multiple_emails_per_name["Alice"],
            EmailsForName {
                emails: vec!["a@x.example".to_string(), "b@x.example".to_string()],
                count: 2,
            }
        );
        assert!(!rotation.multiple_names_per_email.contains_key("solo@x.example"));
        assert!(!rotation.multiple_emails_per_name.contains_key("Solo"));
    }
}
