use std::path::PathBuf;

use clap::Parser;

/// Dump and analyze GitHub profiles. Focused on detecting fake developers,
/// phishing, bot networks and scammers.
#[derive(Parser, Debug)]
#[command(name = "gitsleuth", version, about)]
pub struct Cli {
    /// GitHub username to analyze
    pub username: Option<String>,

    /// File containing GitHub usernames to analyze, one per line
    #[arg(long, value_name = "FILE")]
    pub targets: Option<PathBuf>,

    /// Watch live events and profile changes for the target(s)
    #[arg(long)]
    pub monitor: bool,

    /// Only fetch profile data (no commits, followers, etc.)
    #[arg(long)]
    pub only_profile: bool,

    /// Search GitHub for commit messages copied from the target's repos
    #[arg(long)]
    pub commit_search: bool,

    /// Narrow --commit-search to a single repository
    #[arg(long, value_name = "REPO", requires = "commit_search")]
    pub commit_search_repo: Option<String>,

    /// GitHub API token overriding the environment variable
    #[arg(long)]
    pub token: Option<String>,

    /// Output directory for analysis results (default: ./out)
    #[arg(long = "out", value_name = "DIR")]
    pub out_path: Option<PathBuf>,

    /// Print data from an existing report instead of analyzing
    #[arg(long, value_name = "USERNAME")]
    pub parse: Option<String>,

    /// Key to retrieve from the report (dot notation for nested keys)
    #[arg(long, requires = "parse")]
    pub key: Option<String>,

    /// Print a summary of key profile information
    #[arg(long)]
    pub summary: bool,
}
