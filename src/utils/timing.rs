use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "palette.timing";

#[derive(Debug)]
pub struct RequestTimer {
    route: String,
    detail_in: Option<String>,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: String,
    detail: Option<String>,
    completed: bool,
}

impl RequestTimer {
    pub fn new(route: &str, detail_in: Option<&str>) -> Self {
        let detail_in = detail_in.map(|value| {
            let flattened = value.replace('\n', " ");
            if flattened.chars().count() > 300 {
                flattened.chars().take(300).collect()
            } else {
                flattened
            }
        });

        RequestTimer {
            route: route.to_string(),
            detail_in,
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: "success".to_string(),
            detail: None,
            completed: false,
        }
    }

    pub fn log_received(&self) {
        info!(
            target: TIMING_TARGET,
            "event=request_received route={} received_at={} input={:?}",
            self.route,
            self.started_at.to_rfc3339(),
            self.detail_in
        );
    }

    pub fn mark_status(&mut self, status: &str, detail: Option<String>) {
        self.status = status.to_string();
        self.detail = detail;
    }

    pub fn observe<T, E: std::fmt::Display>(&mut self, result: &Result<T, E>) {
        if let Err(err) = result {
            self.mark_status("error", Some(err.to_string()));
        }
    }

    pub fn log_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: TIMING_TARGET,
            "event=request_completed route={} started_at={} response_sent_at={} duration_s={:.3} status={} detail={}",
            self.route,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            self.status,
            self.detail.clone().unwrap_or_default()
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.log_completed();
    }
}

pub fn start_request_timer(route: &str, detail_in: Option<&str>) -> RequestTimer {
    let timer = RequestTimer::new(route, detail_in);
    timer.log_received();
    timer
}

/// Wraps one call to the hosted model API in `gateway_call`/`gateway_result` timing events.
pub async fn time_gateway_call<T, F, Fut>(
    operation: &str,
    model: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_perf = Instant::now();
    let metadata_text = metadata
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=gateway_call operation={} model={} started_at={} metadata={}",
        operation,
        model,
        Utc::now().to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let (status, detail) = match &result {
        Ok(_) => ("success", String::new()),
        Err(err) => ("error", err.to_string()),
    };
    info!(
        target: TIMING_TARGET,
        "event=gateway_result operation={} model={} duration_s={:.3} status={} detail={:?}",
        operation,
        model,
        started_perf.elapsed().as_secs_f64(),
        status,
        detail
    );

    result
}
