//! Explicit per-request session context.
//!
//! Handlers that need the caller's identity take a `SessionContext` argument; it is
//! resolved from `Authorization: Bearer <token>` and carries a snapshot of the
//! caller's profile. Only the WebSocket upgrade also reads `?token=`, since
//! browsers cannot set headers on it.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::domain::{Role, UserProfile};
use crate::error::{AppError, AppResult, AuthError};
use crate::profile::{route_for, Route};
use crate::state::AppState;

#[derive(Clone, Debug)]
pub struct SessionContext {
    pub token: String,
    pub profile: UserProfile,
}

impl SessionContext {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn uid(&self) -> &str {
        &self.profile.uid
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn route(&self) -> Route {
        route_for(&self.profile)
    }

    /// Re-read the profile snapshot after a write.
    pub async fn refresh(&mut self, state: &AppState) -> AppResult<()> {
        self.profile = state.profile(self.uid()).await?;
        Ok(())
    }

    /// End the session; the token stops resolving.
    pub async fn invalidate(self, state: &AppState) {
        state.close_session(self.token()).await;
    }
}

/// Token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        state.session(&token).await
    }
}
