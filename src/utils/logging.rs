use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::Config;
use crate::utils::timing::TIMING_TARGET;

const QUIET_TARGETS: [&str; 6] = [
    "hyper",
    "hyper_util",
    "reqwest",
    "tower_http",
    "tower_sessions",
    "tower_sessions_core",
];

/// Keeps the background log writers alive; dropping it flushes and stops them.
pub struct LoggingGuards {
    _writers: Vec<WorkerGuard>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Application events at `level`, minus request timing and chatty dependencies.
fn server_filter(level: LevelFilter) -> Targets {
    QUIET_TARGETS
        .iter()
        .fold(Targets::new().with_default(level), |targets, target| {
            targets.with_target(*target, LevelFilter::WARN)
        })
        .with_target(TIMING_TARGET, LevelFilter::OFF)
}

fn timing_filter() -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO)
}

fn daily_file(dir: &Path, name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
    guards.push(guard);
    writer
}

/// Installs stdout plus daily `server.log`/`server.jsonl` and `timing.log`/`timing.jsonl` files.
pub fn init_logging(config: &Config) -> LoggingGuards {
    let logs_dir = Path::new(&config.log_dir);
    if let Err(err) = fs::create_dir_all(logs_dir) {
        eprintln!("Failed to create logs directory {}: {err}", logs_dir.display());
    }

    let mut guards = Vec::with_capacity(4);
    let server_log = daily_file(logs_dir, "server.log", &mut guards);
    let server_jsonl = daily_file(logs_dir, "server.jsonl", &mut guards);
    let timing_log = daily_file(logs_dir, "timing.log", &mut guards);
    let timing_jsonl = daily_file(logs_dir, "timing.jsonl", &mut guards);

    let server = server_filter(parse_log_level(&config.log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(server.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(server_log)
                .with_filter(server.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(server_jsonl)
                .with_filter(server),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(timing_log)
                .with_filter(timing_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(timing_jsonl)
                .with_filter(timing_filter()),
        )
        .init();

    LoggingGuards { _writers: guards }
}
