use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::timing::start_request_timer;

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

fn host_allowed(host: &str, allowed_hosts: &[String]) -> bool {
    allowed_hosts.iter().any(|allowed| {
        host == allowed
            || host
                .strip_suffix(allowed.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Accepts only http(s) URLs without credentials whose host is on the allow-list.
pub fn validate_target(raw: &str, config: &Config) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| AppError::ProxyRejected(format!("invalid url: {err}")))?;

    match url.scheme() {
        "https" => {}
        "http" if config.proxy_allow_http => {}
        other => {
            return Err(AppError::ProxyRejected(format!(
                "scheme '{other}' is not allowed"
            )))
        }
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(AppError::ProxyRejected(
            "credentials in url are not allowed".to_string(),
        ));
    }

    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.trim_end_matches('.').to_lowercase(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => return Err(AppError::ProxyRejected("url has no host".to_string())),
    };
    if !host_allowed(&host, &config.proxy_allowed_hosts) {
        return Err(AppError::ProxyRejected(format!(
            "host '{host}' is not allowed"
        )));
    }

    Ok(url)
}

fn too_large(limit: u64) -> AppError {
    AppError::ProxyUpstream(format!("upstream image exceeds {limit} bytes"))
}

pub async fn proxy_image(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Result<Response, AppError> {
    let mut timer = start_request_timer("GET /proxy", query.url.as_deref());
    let result = relay(&state, query.url.as_deref().unwrap_or("")).await;
    timer.observe(&result);
    result
}

async fn relay(state: &AppState, raw_url: &str) -> Result<Response, AppError> {
    if raw_url.trim().is_empty() {
        return Err(AppError::ProxyRejected("missing url parameter".to_string()));
    }
    let target = validate_target(raw_url, &state.config)?;

    let mut response = state
        .proxy_client
        .get(target.clone())
        .send()
        .await
        .map_err(|err| {
            warn!("Failed to fetch proxied image {}: {}", target, err);
            AppError::ProxyUpstream(err.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::ProxyUpstream(format!(
            "upstream responded with status {status}"
        )));
    }

    let limit = state.config.proxy_max_bytes;
    if response.content_length().is_some_and(|length| length > limit) {
        return Err(too_large(limit));
    }
    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|err| AppError::ProxyUpstream(err.to_string()))?
    {
        if (bytes.len() + chunk.len()) as u64 > limit {
            return Err(too_large(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if !infer::is_image(&bytes) {
        return Err(AppError::ProxyUpstream(
            "upstream content is not an image".to_string(),
        ));
    }
    debug!("Relaying {} byte(s) from {}", bytes.len(), target);

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        bytes,
    )
        .into_response())
}
