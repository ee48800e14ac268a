pub mod analyzer;
pub mod categorize;
pub mod commit_search;
pub mod detectors;
pub mod git_history;
pub mod github;
pub mod monitor;
pub mod output;
pub mod report;
