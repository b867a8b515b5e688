use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

const USER_AGENT: &str = concat!("mind-palette/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Client for relaying images. Redirects are not followed: only the vetted URL is fetched.
pub fn build_proxy_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .build()
}

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}
