mod cli;
mod models;
mod services;
mod utils;

use std::fs;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use services::analyzer::ProfileAnalyzer;
use services::github::{ApiError, GithubClient, GithubFetcher};
use services::monitor::EventMonitor;
use utils::config::Config;

#[tokio::main]
async fn main() {
    // Load .env file FIRST before anything else
    dotenv::dotenv().ok();

    // Initialize logger with default level if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Parse mode reads an existing report, no network involved.
    if let Some(username) = &cli.parse {
        if let Err(e) = services::output::parse_report(
            username,
            cli.key.as_deref(),
            cli.summary,
            cli.out_path.as_deref(),
        ) {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
        return;
    }

    let mut config = Config::from_env();
    if let Some(token) = &cli.token {
        config.github_token = Some(token.clone());
        log::info!("Using GitHub token from command line argument");
    } else if config.github_token.is_some() {
        log::info!("Using GitHub token from environment");
    } else {
        log::warn!("No GitHub token provided. Rate limits may apply.");
    }

    let targets = match collect_targets(&cli) {
        Ok(targets) if !targets.is_empty() => targets,
        Ok(_) => {
            log::error!("No targets specified. Provide a username or a --targets file.");
            log::info!("Print help with -h or --help.");
            std::process::exit(2);
        }
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(2);
        }
    };

    if cli.monitor {
        let client = Arc::new(GithubClient::new(&config));
        let fetcher = GithubFetcher::new(client, &config);
        let monitor = EventMonitor::new(&fetcher, &config);
        if let Err(e) = monitor.run(&targets).await {
            log::error!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    let start = Instant::now();
    for username in &targets {
        log::info!("Processing target: {}", username);
        if let Err(e) = process_target(username, &cli, &config).await {
            // A bad token fails every subsequent call the same way.
            if is_unauthorized(&e) {
                log::error!("{}", e);
                std::process::exit(1);
            }
            log::error!("Error processing target {}: {:#}", username, e);
        }
    }
    log::info!(
        "Processing completed in {:.2} seconds.",
        start.elapsed().as_secs_f64()
    );
}

async fn process_target(username: &str, cli: &Cli, config: &Config) -> Result<()> {
    let analyzer = ProfileAnalyzer::new(username, cli.out_path.as_deref(), config)?;

    if cli.only_profile {
        log::info!("Only fetching profile data for {}...", username);
        return analyzer.profile_only().await;
    }

    if cli.commit_search {
        match cli.commit_search_repo.as_deref() {
            Some(repo) => log::info!("Searching for copied commits in {}...", repo),
            None => log::info!("Searching for copied commits across all repos..."),
        }
        return analyzer.commit_search(cli.commit_search_repo.as_deref()).await;
    }

    log::info!("Starting full analysis for {}...", username);
    analyzer.analyze().await
}

/// The positional username and the --targets file combine into one batch.
fn collect_targets(cli: &Cli) -> Result<Vec<String>> {
    let mut targets = Vec::new();
    if let Some(username) = &cli.username {
        targets.push(username.clone());
    }
    if let Some(path) = &cli.targets {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read targets file {}", path.display()))?;
        targets.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
        log::info!("Targets read from {}", path.display());
    }
    Ok(targets)
}

fn is_unauthorized(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized)))
}
