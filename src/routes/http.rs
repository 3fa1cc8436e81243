//! HTTP endpoint handlers. These are thin wrappers that forward to state and core logic.
//! Each handler is instrumented and logs identifiers and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::assistant::AssistantReply;
use crate::catalog::{CourseFilter, NewCourse, NewLecture};
use crate::domain::{Course, Lecture, QuizAttempt, Quiz, Role};
use crate::error::{AppError, AppResult, JsonBody};
use crate::logic::*;
use crate::profile::ProfileSubmission;
use crate::protocol::*;
use crate::session::SessionContext;
use crate::state::AppState;

fn require(ctx: &SessionContext, role: Role) -> AppResult<()> {
  if ctx.role() != role {
    return Err(AppError::Forbidden(format!("Only {}s can do this", role)));
  }
  Ok(())
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, assistant: state.openai.is_some() })
}

// --- auth ---

#[instrument(level = "info", skip(state, body), fields(role = %body.role))]
pub async fn http_sign_up(
  State(state): State<Arc<AppState>>,
  JsonBody(body): JsonBody<SignUpIn>,
) -> AppResult<(StatusCode, Json<SessionOut>)> {
  let ctx = state.sign_up(&body.email, &body.password, body.role).await?;
  info!(target: "skillstream", uid = %ctx.uid(), route = ctx.route().path(), "HTTP signup");
  Ok((StatusCode::CREATED, Json(ctx.into())))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_sign_in(
  State(state): State<Arc<AppState>>,
  JsonBody(body): JsonBody<SignInIn>,
) -> AppResult<Json<SessionOut>> {
  let ctx = state.sign_in(&body.email, &body.password).await?;
  info!(target: "skillstream", uid = %ctx.uid(), route = ctx.route().path(), "HTTP signin");
  Ok(Json(ctx.into()))
}

#[instrument(level = "info", skip(state, ctx), fields(uid = %ctx.uid()))]
pub async fn http_sign_out(State(state): State<Arc<AppState>>, ctx: SessionContext) -> StatusCode {
  ctx.invalidate(&state).await;
  StatusCode::NO_CONTENT
}

// --- profile ---

#[instrument(level = "info", skip(ctx), fields(uid = %ctx.uid()))]
pub async fn http_me(ctx: SessionContext) -> Json<MeOut> {
  Json((&ctx).into())
}

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid(), role = %ctx.role()))]
pub async fn http_complete_profile(
  State(state): State<Arc<AppState>>,
  mut ctx: SessionContext,
  JsonBody(body): JsonBody<ProfileSubmission>,
) -> AppResult<Json<MeOut>> {
  state.complete_profile(ctx.uid(), &body).await?;
  ctx.refresh(&state).await?;
  Ok(Json((&ctx).into()))
}

// --- catalog ---

#[instrument(level = "info", skip(state, filter))]
pub async fn http_list_courses(
  State(state): State<Arc<AppState>>,
  Query(filter): Query<CourseFilter>,
) -> Json<Vec<Course>> {
  let courses = state.list_courses(&filter).await;
  info!(target: "catalog", count = courses.len(), sort = ?filter.sort, "HTTP courses listed");
  Json(courses)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_course(
  State(state): State<Arc<AppState>>,
  Path(course_id): Path<String>,
) -> AppResult<Json<Course>> {
  Ok(Json(state.get_course(&course_id).await?))
}

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid()))]
pub async fn http_create_course(
  State(state): State<Arc<AppState>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<NewCourse>,
) -> AppResult<(StatusCode, Json<Course>)> {
  let course = state.create_course(ctx.uid(), body).await?;
  Ok((StatusCode::CREATED, Json(course)))
}

#[instrument(level = "info", skip(state, ctx), fields(uid = %ctx.uid()))]
pub async fn http_teacher_courses(
  State(state): State<Arc<AppState>>,
  ctx: SessionContext,
) -> AppResult<Json<Vec<Course>>> {
  require(&ctx, Role::Teacher)?;
  Ok(Json(state.teacher_courses(ctx.uid()).await))
}

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid()))]
pub async fn http_add_lecture(
  State(state): State<Arc<AppState>>,
  Path(course_id): Path<String>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<NewLecture>,
) -> AppResult<(StatusCode, Json<Lecture>)> {
  require(&ctx, Role::Teacher)?;
  let lecture = state.add_lecture(ctx.uid(), &course_id, body).await?;
  Ok((StatusCode::CREATED, Json(lecture)))
}

#[instrument(level = "info", skip(state, ctx), fields(uid = %ctx.uid()))]
pub async fn http_remove_lecture(
  State(state): State<Arc<AppState>>,
  Path((course_id, lecture_id)): Path<(String, String)>,
  ctx: SessionContext,
) -> AppResult<StatusCode> {
  require(&ctx, Role::Teacher)?;
  state.remove_lecture(ctx.uid(), &course_id, &lecture_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// --- ledger ---

#[instrument(level = "info", skip(state, ctx), fields(uid = %ctx.uid()))]
pub async fn http_enroll(
  State(state): State<Arc<AppState>>,
  Path(course_id): Path<String>,
  ctx: SessionContext,
) -> AppResult<(StatusCode, Json<EnrollOut>)> {
  let (enrollment, created) = state.enroll(ctx.uid(), &course_id).await?;
  let status = if created { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(EnrollOut { enrollment, created })))
}

#[instrument(level = "info", skip(state, ctx), fields(uid = %ctx.uid()))]
pub async fn http_enrollments(
  State(state): State<Arc<AppState>>,
  ctx: SessionContext,
) -> AppResult<Json<Vec<DashboardEntry>>> {
  let entries = state
    .dashboard(ctx.uid())
    .await?
    .into_iter()
    .map(|(course, enrollment)| DashboardEntry { course, enrollment })
    .collect();
  Ok(Json(entries))
}

#[instrument(level = "info", skip(state, ctx), fields(uid = %ctx.uid()))]
pub async fn http_toggle_completion(
  State(state): State<Arc<AppState>>,
  Path((course_id, lecture_id)): Path<(String, String)>,
  ctx: SessionContext,
) -> AppResult<Json<ToggleOut>> {
  let enrollment = state.toggle_lecture_completion(ctx.uid(), &course_id, &lecture_id).await?;
  let completed = enrollment.completed_lectures.contains(&lecture_id);
  Ok(Json(ToggleOut { enrollment, completed }))
}

// --- quizzes ---

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid(), answered = body.answers.len()))]
pub async fn http_submit_quiz(
  State(state): State<Arc<AppState>>,
  Path((course_id, lecture_id)): Path<(String, String)>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<QuizSubmitIn>,
) -> AppResult<(StatusCode, Json<QuizAttempt>)> {
  let attempt = state.submit_quiz(ctx.uid(), &course_id, &lecture_id, &body.answers).await?;
  Ok((StatusCode::CREATED, Json(attempt)))
}

#[instrument(level = "info", skip(state, ctx), fields(uid = %ctx.uid()))]
pub async fn http_get_attempt(
  State(state): State<Arc<AppState>>,
  Path((_course_id, lecture_id)): Path<(String, String)>,
  ctx: SessionContext,
) -> AppResult<Json<QuizAttempt>> {
  state
    .get_attempt(ctx.uid(), &lecture_id)
    .await
    .map(Json)
    .ok_or_else(|| AppError::NotFound("No attempt for this quiz yet".into()))
}

// --- assistant ---

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid(), text_len = body.text.len()))]
pub async fn http_assistant_chat(
  State(state): State<Arc<AppState>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<ChatIn>,
) -> AppResult<Json<AssistantReply>> {
  Ok(Json(do_chat(&state, &body.text).await?))
}

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid(), course_id = %body.course_id, lecture_id = %body.lecture_id))]
pub async fn http_assistant_summarize(
  State(state): State<Arc<AppState>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<SummarizeIn>,
) -> AppResult<Json<AssistantReply>> {
  Ok(Json(do_summarize(&state, &body.course_id, &body.lecture_id).await?))
}

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid(), previous_len = body.previous.len()))]
pub async fn http_assistant_elaborate(
  State(state): State<Arc<AppState>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<ElaborateIn>,
) -> AppResult<Json<AssistantReply>> {
  Ok(Json(do_elaborate(&state, &body.previous).await?))
}

#[instrument(level = "info", skip(state, ctx, body), fields(uid = %ctx.uid(), count = body.count))]
pub async fn http_assistant_quiz(
  State(state): State<Arc<AppState>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<QuizGenIn>,
) -> AppResult<Json<Quiz>> {
  require(&ctx, Role::Teacher)?;
  Ok(Json(do_generate_quiz(&state, &body.title, &body.description, body.count).await?))
}
