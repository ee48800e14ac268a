use std::env;

/// Runtime limits and credentials, resolved once at startup. Components
/// receive these as plain parameters and never read the environment
/// themselves.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bearer token for the GitHub API. Unauthenticated runs work but hit
    /// rate limits almost immediately.
    pub github_token: Option<String>,
    pub api_base_url: String,
    pub max_followers: usize,
    pub max_following: usize,
    pub max_repositories: usize,
    /// History depth for bare clones; 0 means full history.
    pub clone_depth: u32,
    /// Fallback poll interval for the monitor loop, seconds.
    pub monitor_sleep: u64,
    pub retry_limit: u32,
    /// Minimum delay after a successful API call, milliseconds.
    pub sleep_interval_ms: u64,
    /// Bounded fan-out width for independent read-only calls.
    pub max_workers: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Config {
            github_token: env::var("GH_TOKEN").ok().filter(|t| !t.is_empty()),
            api_base_url: env::var("GH_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            max_followers: env::var("MAX_FOLLOWERS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("MAX_FOLLOWERS must be a number"),
            max_following: env::var("MAX_FOLLOWING")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("MAX_FOLLOWING must be a number"),
            max_repositories: env::var("MAX_REPOSITORIES")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("MAX_REPOSITORIES must be a number"),
            clone_depth: env::var("CLONE_DEPTH")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .expect("CLONE_DEPTH must be a number"),
            monitor_sleep: env::var("MONITOR_SLEEP")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("MONITOR_SLEEP must be a number"),
            retry_limit: env::var("RETRY_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("RETRY_LIMIT must be a number"),
            sleep_interval_ms: env::var("SLEEP_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("SLEEP_INTERVAL_MS must be a number"),
            max_workers: env::var("MAX_WORKERS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("MAX_WORKERS must be a number"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            github_token: None,
            api_base_url: "https://api.github.com".to_string(),
            max_followers: 300,
            max_following: 300,
            max_repositories: 1000,
            clone_depth: 100,
            monitor_sleep: 10,
            retry_limit: 10,
            sleep_interval_ms: 1000,
            max_workers: 5,
        }
    }
}
