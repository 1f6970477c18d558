//! Text generation for startup ideas and MVP plans.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::OpenAiConfig;

pub const IDEA_FALLBACK: &str = "Failed to generate idea";
pub const MVP_FALLBACK: &str = "Failed to generate MVP plan";

/// Upper bound on one completion call, connect through last body byte.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const IDEA_SYSTEM_PROMPT: &str = "You are an expert startup consultant. Generate unique, innovative, \
and practical startup ideas based on the given topic. Focus on solving real problems with clear value propositions.";

const MVP_SYSTEM_PROMPT: &str = "You are an experienced product manager and startup consultant. \
Create detailed, actionable MVP development plans that are realistic and achievable within 3-6 months.";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

pub fn idea_request(topic: &str) -> CompletionRequest {
    CompletionRequest {
        system: IDEA_SYSTEM_PROMPT.to_string(),
        prompt: format!(
            "Generate a unique startup idea based on the theme: {}. Include: 1) Problem statement, \
             2) Solution description, 3) Target market, 4) Revenue model, 5) Key features. \
             Keep it concise but comprehensive.",
            topic
        ),
        max_tokens: 400,
        temperature: 0.8,
    }
}

pub fn mvp_request(idea: &str) -> CompletionRequest {
    CompletionRequest {
        system: MVP_SYSTEM_PROMPT.to_string(),
        prompt: format!(
            "Create a comprehensive step-by-step MVP development plan for this startup idea: {}. \
             Include: 1) Core features for MVP, 2) Technical requirements, 3) Development phases \
             with timelines, 4) Resource needs, 5) Testing strategy, 6) Launch checklist. \
             Format as a clear, actionable plan.",
            idea
        ),
        max_tokens: 800,
        temperature: 0.7,
    }
}

/// A completion backend. Returns the generated text, which may be empty.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.prompt},
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!(
                "OpenAI completion failed ({}): {}",
                status,
                resp.text().await.unwrap_or_default()
            ));
        }

        let resp_json: serde_json::Value = resp
            .json()
            .await
            .context("OpenAI response was not JSON")?;
        Ok(completion_text(&resp_json))
    }
}

fn completion_text(resp_json: &serde_json::Value) -> String {
    resp_json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// Substitutes `fallback` when the model returned nothing useful.
pub fn or_fallback(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}
