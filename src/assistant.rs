//! Assistant reply model and strict parsing of model output.
//!
//! A reply is either the structured envelope requested by the system prompt or,
//! when the text is not exactly that envelope, the whole text as-is.

use serde::{Deserialize, Serialize};

use crate::util::strip_code_fence;

pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";
pub const GREETING: &str = "Hi! I'm your AI learning assistant. How can I help you with your courses today?";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReply {
  pub content: String,
  #[serde(default = "default_format")]
  pub format: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bullets: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub steps: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub key_points: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub concepts: Option<Vec<String>>,
}

fn default_format() -> String {
  "markdown".into()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantReply {
  Structured(StructuredReply),
  PlainText {
    content: String,
    /// True when this is the inline apology for a failed collaborator call.
    #[serde(default)]
    error: bool,
  },
}

impl AssistantReply {
  pub fn plain(content: impl Into<String>) -> Self {
    AssistantReply::PlainText { content: content.into(), error: false }
  }

  pub fn apology() -> Self {
    AssistantReply::PlainText { content: APOLOGY.into(), error: true }
  }

  pub fn content(&self) -> &str {
    match self {
      AssistantReply::Structured(s) => &s.content,
      AssistantReply::PlainText { content, .. } => content,
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, AssistantReply::PlainText { error: true, .. })
  }
}

/// Parse a model reply. Only a whole-reply envelope (optionally inside one code
/// fence) with non-empty `content` counts as structured.
pub fn parse_reply(text: &str) -> AssistantReply {
  let body = strip_code_fence(text);
  match serde_json::from_str::<StructuredReply>(body) {
    Ok(s) if !s.content.trim().is_empty() => AssistantReply::Structured(s),
    _ => AssistantReply::plain(text.trim()),
  }
}
