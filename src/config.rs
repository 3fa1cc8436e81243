//! Loading service configuration (assistant prompts, catalog vocabularies, session
//! lifetime) from TOML.
//!
//! See `AppConfig`, `Prompts`, `CatalogConfig` and `SessionConfig` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub catalog: CatalogConfig,
  #[serde(default)]
  pub sessions: SessionConfig,
}

/// Sessions expire `ttl_minutes` after sign-in; expired tokens stop resolving.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  pub ttl_minutes: i64,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self { ttl_minutes: 12 * 60 }
  }
}

/// Categories offered on the upload form and the store filter.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
  pub categories: Vec<String>,
  pub default_thumbnail_url: String,
}

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      categories: vec![
        "Web Development".into(),
        "Data Science".into(),
        "Mobile Development".into(),
        "Design".into(),
        "Business".into(),
      ],
      default_thumbnail_url: "https://placehold.co/600x400?text=Course+Thumbnail".into(),
    }
  }
}

/// Prompts used by the assistant bridge. Any subset may be overridden in TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Asks the model for the JSON reply envelope.
  pub assistant_system: String,
  pub summarize_user_template: String,
  pub elaborate_user_template: String,
  pub quiz_system: String,
  pub quiz_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      assistant_system: "You are SkillStream's AI learning assistant. Help students understand their courses. \
Format every response as JSON with this structure and nothing else:\n\
{\"content\": \"main response text\", \"format\": \"markdown\", \"code\": \"optional code sample\", \
\"bullets\": [\"optional\"], \"steps\": [\"optional\"], \"keyPoints\": [\"optional\"], \"concepts\": [\"optional\"]}".into(),
      summarize_user_template: "Please analyze and summarize the educational content from this video: {video_url}\n\
Lecture title: {title}\n\
Include key concepts, important points, and core learning objectives. \
Consider yourself the teacher and the user the student, and teach them what is in the video.".into(),
      elaborate_user_template: "Based on this summary: {previous}\nPlease provide more detailed explanations and examples.".into(),
      quiz_system: "You write multiple-choice quizzes for course lectures. Respond ONLY with strict JSON.".into(),
      quiz_user_template: "Write {count} multiple-choice questions for the lecture '{title}'.\n\
Lecture description: {description}\n\
Return JSON {\"questions\": [{\"questionText\": string, \"options\": [4 strings], \"correctAnswer\": index 0-3}]}.".into(),
    }
  }
}

/// Load `AppConfig` from SKILLSTREAM_CONFIG_PATH. On any IO/parse error, fall back to defaults.
pub fn load_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("SKILLSTREAM_CONFIG_PATH") else {
    return AppConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "skillstream", %path, categories = cfg.catalog.categories.len(), "Loaded config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "skillstream", %path, error = %e, "Failed to parse TOML config; using defaults");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "skillstream", %path, error = %e, "Failed to read TOML config file; using defaults");
      AppConfig::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
      [prompts]
      quiz_system = "Quiz bot."

      [catalog]
      categories = ["Music"]
      "#,
    )
    .unwrap();
    assert_eq!(cfg.prompts.quiz_system, "Quiz bot.");
    assert!(cfg.prompts.assistant_system.contains("keyPoints"));
    assert_eq!(cfg.catalog.categories, vec!["Music".to_string()]);
    assert!(cfg.catalog.default_thumbnail_url.starts_with("https://"));
  }

  #[test]
  fn empty_toml_is_default() {
    let cfg: AppConfig = toml::from_str("").unwrap();
    assert_eq!(cfg.catalog.categories.len(), 5);
    assert_eq!(cfg.sessions.ttl_minutes, 720);
  }
}
