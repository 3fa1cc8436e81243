//! Assistant behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Free-form chat with the learning assistant
//!   - Lecture summaries and follow-up elaboration
//!   - Drafting quizzes for teachers
//!
//! Chat, summary and elaboration never fail on the collaborator: a failed or
//! disabled model call becomes the inline apology reply. Quiz drafting does fail,
//! since a broken draft must not reach the authoring form.

use tracing::{debug, error, info, instrument};

use crate::assistant::{parse_reply, AssistantReply};
use crate::catalog::validate_quiz;
use crate::domain::Quiz;
use crate::error::{AppError, AppResult, ValidationError};
use crate::state::AppState;
use crate::util::trunc_for_log;

const MAX_QUIZ_QUESTIONS: usize = 20;

fn reply_or_apology(op: &str, res: Option<Result<String, String>>) -> AssistantReply {
  match res {
    Some(Ok(text)) => {
      let reply = parse_reply(&text);
      debug!(target: "assistant", op, structured = matches!(reply, AssistantReply::Structured(_)), "Assistant reply parsed");
      reply
    }
    Some(Err(e)) => {
      error!(target: "assistant", op, error = %trunc_for_log(&e, 300), "Assistant call failed; replying with apology.");
      AssistantReply::apology()
    }
    None => {
      debug!(target: "assistant", op, "Assistant disabled; replying with apology.");
      AssistantReply::apology()
    }
  }
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn do_chat(state: &AppState, text: &str) -> AppResult<AssistantReply> {
  let text = text.trim();
  if text.is_empty() {
    return Err(ValidationError::field("text", "Message cannot be empty").into());
  }
  let res = match &state.openai {
    Some(oa) => Some(oa.send_message(&state.config.prompts, text).await),
    None => None,
  };
  Ok(reply_or_apology("chat", res))
}

/// Summary of one lecture, built from its title and video URL.
#[instrument(level = "info", skip(state), fields(%course_id, %lecture_id))]
pub async fn do_summarize(state: &AppState, course_id: &str, lecture_id: &str) -> AppResult<AssistantReply> {
  let course = state.get_course(course_id).await?;
  let lecture = course
    .lecture(lecture_id)
    .ok_or_else(|| AppError::NotFound(format!("Lecture not found: {}", lecture_id)))?;
  let res = match &state.openai {
    Some(oa) => Some(oa.summarize(&state.config.prompts, &lecture.title, &lecture.video_url).await),
    None => None,
  };
  Ok(reply_or_apology("summarize", res))
}

#[instrument(level = "info", skip(state, previous), fields(previous_len = previous.len()))]
pub async fn do_elaborate(state: &AppState, previous: &str) -> AppResult<AssistantReply> {
  if previous.trim().is_empty() {
    return Err(ValidationError::field("previous", "Nothing to elaborate on").into());
  }
  let res = match &state.openai {
    Some(oa) => Some(oa.elaborate(&state.config.prompts, previous).await),
    None => None,
  };
  Ok(reply_or_apology("elaborate", res))
}

/// Draft a quiz for a lecture. The draft passes the same checks as a
/// teacher-authored quiz before it is returned.
#[instrument(level = "info", skip(state, description), fields(%title, %count))]
pub async fn do_generate_quiz(state: &AppState, title: &str, description: &str, count: usize) -> AppResult<Quiz> {
  if title.trim().is_empty() {
    return Err(ValidationError::field("title", "Lecture title is required").into());
  }
  if count == 0 || count > MAX_QUIZ_QUESTIONS {
    return Err(ValidationError::field("count", format!("Question count must be between 1 and {}", MAX_QUIZ_QUESTIONS)).into());
  }
  let oa = state
    .openai
    .as_ref()
    .ok_or_else(|| AppError::ExternalService("Assistant is not configured".into()))?;

  let quiz = oa
    .generate_quiz(&state.config.prompts, title.trim(), description.trim(), count)
    .await
    .map_err(|e| {
      error!(target: "assistant", error = %trunc_for_log(&e, 300), "Quiz generation failed");
      AppError::ExternalService("Quiz generation failed. Please try again.".into())
    })?;

  validate_quiz(&quiz).map_err(|e| {
    error!(target: "assistant", error = %e, "Generated quiz is malformed");
    AppError::ExternalService("Generated quiz was malformed. Please try again.".into())
  })?;
  info!(target: "assistant", questions = quiz.questions.len(), "Quiz drafted");
  Ok(quiz)
}
