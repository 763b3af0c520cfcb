// src/adapters/http.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Shared client for adapters. Sites that serve search pages tend to refuse
/// clients without a browser user-agent.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("building http client")
}

/// GET `url` and return the body; non-2xx is an error.
pub async fn get_text(client: &Client, url: reqwest::Url) -> Result<String> {
    let display = url.to_string();
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {display}"))?
        .error_for_status()
        .with_context(|| format!("GET {display} non-2xx"))?
        .text()
        .await
        .with_context(|| format!("GET {display} .text()"))
}
