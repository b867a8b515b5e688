use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::utils::http::truncate_for_log;
use crate::utils::timing::time_gateway_call;

pub const REAPPRAISAL_FAILED_TEXT: &str = "Could not generate reappraisal text.";
pub const REAPPRAISAL_EMPTY_TEXT: &str =
    "Failed to generate meaningful output. Please refine the prompt.";

const ERROR_BODY_LOG_LIMIT: usize = 2000;

/// Outcome of a single text completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Text(String),
    Empty,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// Client for the hosted image and text-completion endpoints.
///
/// Every public method is best-effort: failures are logged and turned into sentinel values.
#[derive(Clone)]
pub struct AiGateway {
    client: Client,
    config: Arc<Config>,
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (
            message,
            truncate_for_log(&value.to_string(), ERROR_BODY_LOG_LIMIT),
        );
    }

    (None, truncate_for_log(trimmed, ERROR_BODY_LOG_LIMIT))
}

fn extract_image_urls(response: &Value) -> Vec<String> {
    response
        .get("data")
        .and_then(|v| v.as_array())
        .map(|images| {
            images
                .iter()
                .filter_map(|image| image.get("url").and_then(|v| v.as_str()))
                .map(|url| url.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn extract_completion_text(response: &Value) -> Option<String> {
    let choice = response
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())?;
    Some(
        choice
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string(),
    )
}

impl AiGateway {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        AiGateway { client, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.openai_base_url.trim_end_matches('/'),
            path
        )
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.config.openai_api_key)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!(
                "OpenAI API error on {}: status={}, body={}",
                path, status, body_summary
            );
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "OpenAI request failed with status {}: {}",
                status,
                detail
            ));
        }

        Ok(response.json::<Value>().await?)
    }

    /// Requests `n` images for `prompt`; returns their URLs, or nothing on any failure.
    pub async fn generate_images(&self, prompt: &str, n: u32) -> Vec<String> {
        let mut payload = json!({
            "prompt": prompt,
            "n": n,
            "size": self.config.image_size,
        });
        let model = self.config.image_model.trim();
        if !model.is_empty() {
            payload["model"] = json!(model);
        }

        let metadata = json!({ "n": n, "size": self.config.image_size });
        let result = time_gateway_call("images", model, Some(metadata), || async {
            let response = self.post_json("images/generations", &payload).await?;
            Ok(extract_image_urls(&response))
        })
        .await;

        match result {
            Ok(urls) => {
                if urls.is_empty() {
                    warn!("No images returned from the image API.");
                } else {
                    debug!("Image API returned {} url(s)", urls.len());
                }
                urls
            }
            Err(err) => {
                warn!("Image generation failed: {}", err);
                Vec::new()
            }
        }
    }

    pub async fn complete(&self, prompt: &str, params: CompletionParams) -> Completion {
        let model = self.config.completion_model.as_str();
        let mut payload = json!({
            "model": model,
            "prompt": prompt,
            "max_tokens": params.max_tokens,
            "n": 1,
        });
        if let Some(temperature) = params.temperature {
            payload["temperature"] = json!(temperature);
        }

        debug!(
            "Completion request: model={}, prompt={}",
            model,
            truncate_for_log(prompt, 200)
        );
        let result = time_gateway_call("completions", model, None, || async {
            let response = self.post_json("completions", &payload).await?;
            Ok(extract_completion_text(&response))
        })
        .await;

        match result {
            Ok(Some(text)) => Completion::Text(text),
            Ok(None) => {
                warn!("Completion response had no choices");
                Completion::Empty
            }
            Err(err) => {
                warn!("Completion request failed: {}", err);
                Completion::Failed
            }
        }
    }

    /// Short encouraging reframe of a child's description.
    pub async fn generate_reappraisal_text(&self, description: &str) -> String {
        let prompt = format!(
            "Generate a short positive cognitive reappraisal advice for a child's description, less than three sentences: {description}"
        );
        let params = CompletionParams {
            max_tokens: self.config.reappraisal_max_tokens,
            temperature: None,
        };
        match self.complete(&prompt, params).await {
            Completion::Text(text) => text,
            Completion::Empty => REAPPRAISAL_EMPTY_TEXT.to_string(),
            Completion::Failed => REAPPRAISAL_FAILED_TEXT.to_string(),
        }
    }

    pub fn question_params(&self) -> CompletionParams {
        CompletionParams {
            max_tokens: self.config.question_max_tokens,
            temperature: Some(self.config.question_temperature),
        }
    }
}
