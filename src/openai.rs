//! Minimal OpenAI-compatible client for the assistant bridge.
//!
//! We only call chat.completions and request either plain text or a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::Quiz;
use crate::util::fill_template;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// Send one chat completion and return the raw reply text.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, json = json_mode))]
  async fn complete(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
    json_mode: bool,
  ) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: json_mode.then(|| ResponseFormat { r#type: "json_object".into() }),
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "skillstream-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), %status, "Model call failed");
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default()
      .trim()
      .to_string();
    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Model response received");
    if text.is_empty() {
      return Err("Model returned an empty reply".into());
    }
    Ok(text)
  }

  // --- High-level helpers ---

  /// Free-form question to the assistant; the system prompt asks for the reply envelope.
  #[instrument(level = "info", skip(self, prompts, message), fields(message_len = message.len()))]
  pub async fn send_message(&self, prompts: &Prompts, message: &str) -> Result<String, String> {
    self.complete(&prompts.assistant_system, message, 0.4, false).await
  }

  #[instrument(level = "info", skip(self, prompts, title, video_url), fields(title_len = title.len()))]
  pub async fn summarize(&self, prompts: &Prompts, title: &str, video_url: &str) -> Result<String, String> {
    let user = fill_template(&prompts.summarize_user_template, &[("title", title), ("video_url", video_url)]);
    self.complete(&prompts.assistant_system, &user, 0.4, false).await
  }

  #[instrument(level = "info", skip(self, prompts, previous), fields(previous_len = previous.len()))]
  pub async fn elaborate(&self, prompts: &Prompts, previous: &str) -> Result<String, String> {
    let user = fill_template(&prompts.elaborate_user_template, &[("previous", previous)]);
    self.complete(&prompts.assistant_system, &user, 0.4, false).await
  }

  /// Draft a quiz for a lecture. The reply must be exactly `{"questions": [...]}`.
  #[instrument(level = "info", skip(self, prompts, title, description), fields(%count))]
  pub async fn generate_quiz(
    &self,
    prompts: &Prompts,
    title: &str,
    description: &str,
    count: usize,
  ) -> Result<Quiz, String> {
    let count_s = count.to_string();
    let user = fill_template(
      &prompts.quiz_user_template,
      &[("title", title), ("description", description), ("count", &count_s)],
    );
    let text = self.complete(&prompts.quiz_system, &user, 0.7, true).await?;
    serde_json::from_str::<Quiz>(&text).map_err(|e| format!("JSON parse error: {}", e))
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
