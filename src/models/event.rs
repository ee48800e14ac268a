use serde::{Deserialize, Serialize};

/// A provider event reduced to what a reviewer needs: what happened, where,
/// when, and a one-line human-readable description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    #[serde(rename = "type")]
    pub event_type: String,
    pub target: String,
    pub date: String,
    pub description: String,
}
