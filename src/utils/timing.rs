use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "creatorflow.timing";

/// Tracks one inbound generation request from receipt to response.
#[derive(Debug)]
pub struct RequestTimer {
    route: String,
    mode: String,
    text: Option<String>,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: String,
    detail: Option<String>,
    completed: bool,
}

impl RequestTimer {
    pub fn new(route: &str, mode: &str, user_text: Option<&str>) -> Self {
        let text = user_text.map(|value| {
            let flattened = value.replace('\n', " ");
            if flattened.chars().count() > 300 {
                flattened.chars().take(300).collect()
            } else {
                flattened
            }
        });

        RequestTimer {
            route: route.to_string(),
            mode: mode.to_string(),
            text,
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
            "event=request_received route={} mode={} received_at={} text={:?}",
            self.route,
            self.mode,
            self.started_at.to_rfc3339(),
            self.text
        );
    }

    pub fn mark_status(&mut self, status: &str, detail: Option<String>) {
        self.status = status.to_string();
        self.detail = detail;
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
            "event=request_completed route={} mode={} started_at={} response_sent_at={} duration_s={:.3} status={} detail={}",
            self.route,
            self.mode,
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
        if !self.completed {
            self.mark_status("dropped", None);
            self.log_completed();
        }
    }
}

pub fn start_request_timer(route: &str, mode: &str, user_text: Option<&str>) -> RequestTimer {
    let timer = RequestTimer::new(route, mode, user_text);
    timer.log_received();
    timer
}

pub fn complete_request_timer(timer: &mut RequestTimer, status: &str, detail: Option<String>) {
    timer.mark_status(status, detail);
    timer.log_completed();
}

pub async fn log_llm_timing<T, E, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=llm_request provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: TIMING_TARGET,
        "event=llm_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_the_wrapped_result() {
        let ok: Result<u8, String> =
            log_llm_timing("test", "model", "op", None, || async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u8, String> = log_llm_timing("test", "model", "op", None, || async {
            Err("boom".to_string())
        })
        .await;
        assert_eq!(err, Err("boom".to_string()));
    }

    #[test]
    fn truncates_long_request_text() {
        let long = "a".repeat(400);
        let mut timer = RequestTimer::new("/api/v1/generate", "text_only", Some(&long));
        assert_eq!(timer.text.as_ref().map(|text| text.len()), Some(300));
        complete_request_timer(&mut timer, "success", None);
        assert!(timer.completed);
    }
}
