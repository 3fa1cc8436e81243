//! Error taxonomy shared by every handler.
//!
//! Everything is caught where the operation runs and converted into a single
//! user-visible message; nothing escapes to a global boundary.

use axum::{
  extract::{rejection::JsonRejection, FromRequest},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

/// Required field missing or out of range. Reported inline; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
  pub message: String,
  pub fields: Vec<String>,
}

impl ValidationError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into(), fields: Vec::new() }
  }

  pub fn field(field: &str, message: impl Into<String>) -> Self {
    Self { message: message.into(), fields: vec![field.to_string()] }
  }

  pub fn fields(fields: Vec<String>, message: impl Into<String>) -> Self {
    Self { message: message.into(), fields }
  }
}

impl std::fmt::Display for ValidationError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.message)
  }
}

/// Identity failures, mapped to the small fixed set of messages users see.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
  #[error("Invalid email or password")]
  InvalidCredentials,
  #[error("Email is already registered")]
  EmailAlreadyRegistered,
  #[error("Password should be at least 6 characters")]
  WeakPassword,
  #[error("Invalid email format")]
  InvalidEmail,
  #[error("Access denied. Please try again.")]
  PermissionDenied,
  #[error("You are not signed in. Please sign in and try again.")]
  MissingToken,
  #[error("Your session has expired. Please sign in again.")]
  InvalidToken,
  /// Unmapped provider code: the provider's raw message.
  #[error("{0}")]
  Provider(String),
}

impl AuthError {
  /// Map an identity-provider error code onto the fixed message set.
  pub fn from_provider_code(code: &str) -> Self {
    // Providers append detail after " : " (e.g. "WEAK_PASSWORD : Password should be ...").
    let head = code.split(" : ").next().unwrap_or(code).trim();
    match head {
      "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
      | "auth/user-not-found" | "auth/wrong-password" => AuthError::InvalidCredentials,
      "EMAIL_EXISTS" | "auth/email-already-in-use" => AuthError::EmailAlreadyRegistered,
      "WEAK_PASSWORD" | "auth/weak-password" => AuthError::WeakPassword,
      "INVALID_EMAIL" | "MISSING_EMAIL" | "auth/invalid-email" => AuthError::InvalidEmail,
      "permission-denied" | "USER_DISABLED" => AuthError::PermissionDenied,
      _ => AuthError::Provider(code.to_string()),
    }
  }
}

#[derive(Error, Debug)]
pub enum AppError {
  #[error("{0}")]
  Validation(ValidationError),

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("Persistence error: {0}")]
  Persistence(String),

  #[error("External service error: {0}")]
  ExternalService(String),
}

impl From<ValidationError> for AppError {
  fn from(e: ValidationError) -> Self {
    AppError::Validation(e)
  }
}

/// Malformed or mistyped request bodies are validation errors like any other.
impl From<JsonRejection> for AppError {
  fn from(rejection: JsonRejection) -> Self {
    AppError::Validation(ValidationError::new(rejection.body_text()))
  }
}

/// `Json` extractor whose rejection is an `AppError`, so bad bodies get the
/// same `{error, fields}` response as every other failure.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(AuthError::PermissionDenied) => StatusCode::FORBIDDEN,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub error: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub fields: Vec<String>,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "skillstream", %status, error = %self, "Request failed");
    } else {
      warn!(target: "skillstream", %status, error = %self, "Request rejected");
    }
    let fields = match &self {
      AppError::Validation(v) => v.fields.clone(),
      _ => Vec::new(),
    };
    (status, Json(ErrorOut { error: self.to_string(), fields })).into_response()
  }
}
