use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{anyhow, Result};

const MAX_SESSION_TTL_MINUTES: u64 = 7 * 24 * 60;
const DEFAULT_PROXY_MAX_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub completion_model: String,
    pub image_model: String,
    pub image_size: String,
    pub image_count: u32,
    pub question_max_tokens: u32,
    pub question_temperature: f32,
    pub reappraisal_max_tokens: u32,
    pub http_timeout_seconds: u64,
    pub session_secret: Option<String>,
    pub session_cookie_secure: bool,
    pub session_ttl_minutes: u64,
    pub session_prune_seconds: u64,
    pub proxy_allowed_hosts: Vec<String>,
    pub proxy_allow_http: bool,
    pub proxy_max_bytes: u64,
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_csv_lowercase(name: &str, default: &str) -> Vec<String> {
    parse_csv_lowercase(&env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn parse_csv_lowercase(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim().trim_start_matches('.').to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn load() -> Result<Self> {
        let host_raw = env_string("HOST", "0.0.0.0");
        let host = host_raw
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| anyhow!("Invalid HOST value: {host_raw}"))?;

        let port_raw = env_string("PORT", "5000");
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: {port_raw}"))?;

        Ok(Config {
            host,
            port,
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: env_string("LOG_DIR", "logs"),
            openai_api_key: env_string("OPENAI_API_KEY", ""),
            openai_base_url: env_string("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            completion_model: env_string("OPENAI_COMPLETION_MODEL", "gpt-3.5-turbo-instruct"),
            image_model: env_string("OPENAI_IMAGE_MODEL", "dall-e-2"),
            image_size: env_string("IMAGE_SIZE", "512x512"),
            image_count: env_u32("IMAGE_COUNT", 2).max(1),
            question_max_tokens: env_u32("QUESTION_MAX_TOKENS", 150),
            question_temperature: env_f32("QUESTION_TEMPERATURE", 0.7),
            reappraisal_max_tokens: env_u32("REAPPRAISAL_MAX_TOKENS", 80),
            http_timeout_seconds: env_u64("HTTP_TIMEOUT_SECONDS", 60).max(1),
            session_secret: env_optional("SESSION_SECRET"),
            session_cookie_secure: env_bool("SESSION_COOKIE_SECURE", false),
            session_ttl_minutes: env_u64("SESSION_TTL_MINUTES", 60).clamp(1, MAX_SESSION_TTL_MINUTES),
            session_prune_seconds: env_u64("SESSION_PRUNE_SECONDS", 300).max(1),
            proxy_allowed_hosts: env_csv_lowercase("PROXY_ALLOWED_HOSTS", "blob.core.windows.net"),
            proxy_allow_http: env_bool("PROXY_ALLOW_HTTP", false),
            proxy_max_bytes: env_u64("PROXY_MAX_BYTES", DEFAULT_PROXY_MAX_BYTES).max(1),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn session_ttl(&self) -> time::Duration {
        let minutes = self.session_ttl_minutes.min(MAX_SESSION_TTL_MINUTES);
        time::Duration::minutes(i64::try_from(minutes).unwrap_or(60))
    }

    pub fn session_prune_interval(&self) -> Duration {
        Duration::from_secs(self.session_prune_seconds.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            openai_api_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            image_model: "dall-e-2".to_string(),
            image_size: "512x512".to_string(),
            image_count: 2,
            question_max_tokens: 150,
            question_temperature: 0.7,
            reappraisal_max_tokens: 80,
            http_timeout_seconds: 60,
            session_secret: None,
            session_cookie_secure: false,
            session_ttl_minutes: 60,
            session_prune_seconds: 300,
            proxy_allowed_hosts: vec!["blob.core.windows.net".to_string()],
            proxy_allow_http: false,
            proxy_max_bytes: DEFAULT_PROXY_MAX_BYTES,
        }
    }
}
