use anyhow::{anyhow, Result};
use url::Url;

/// Validate username (alphanumeric, hyphens, underscores, 1-39 chars for GitHub compatibility)
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.len() > 39 {
        return Err(anyhow!("Username must be between 1 and 39 characters"));
    }

    // Allow alphanumeric, hyphens, and underscores
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(anyhow!(
            "Username can only contain alphanumeric characters, hyphens, and underscores"
        ));
    }

    Ok(())
}

/// Validate that a string is a valid clone URL with http or https scheme
pub fn validate_clone_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).map_err(|e| anyhow!("Invalid URL format: {}", e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!(
            "Clone URL must use http or https scheme, got: {}",
            url.scheme()
        ));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("Clone URL must have a host"));
    }

    Ok(url)
}
