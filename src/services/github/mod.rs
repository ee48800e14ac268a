pub mod client;
pub mod fetch;

pub use client::{ApiError, GithubClient};
pub use fetch::GithubFetcher;
