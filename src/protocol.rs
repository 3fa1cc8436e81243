//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Field names are camelCase to match the stored document shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assistant::AssistantReply;
use crate::domain::{Course, EnrollmentRecord, Role, UserProfile};
use crate::profile::Route;
use crate::session::SessionContext;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Chat {
        text: String,
    },
    Summarize {
        #[serde(rename = "courseId")]
        course_id: String,
        #[serde(rename = "lectureId")]
        lecture_id: String,
    },
    Elaborate {
        previous: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    AssistantReply {
        reply: AssistantReply,
    },
    Error {
        message: String,
    },
}

/// `/ws?token=...`; never logged.
#[derive(Deserialize)]
pub struct WsAuthQuery {
    #[serde(default)]
    pub token: Option<String>,
}

//
// HTTP request/response DTOs
//

#[derive(Deserialize)]
pub struct SignUpIn {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct SignInIn {
    pub email: String,
    pub password: String,
}

/// Where the client should navigate and which view it should render.
#[derive(Debug, Serialize)]
pub struct RouteOut {
    pub path: &'static str,
    pub view: &'static str,
}

impl From<Route> for RouteOut {
    fn from(r: Route) -> Self {
        RouteOut { path: r.path(), view: r.view() }
    }
}

#[derive(Serialize)]
pub struct SessionOut {
    pub token: String,
    pub profile: UserProfile,
    pub route: RouteOut,
}

impl From<SessionContext> for SessionOut {
    fn from(ctx: SessionContext) -> Self {
        let route = ctx.route().into();
        SessionOut { token: ctx.token, profile: ctx.profile, route }
    }
}

#[derive(Serialize)]
pub struct MeOut {
    pub profile: UserProfile,
    pub route: RouteOut,
}

impl From<&SessionContext> for MeOut {
    fn from(ctx: &SessionContext) -> Self {
        MeOut { profile: ctx.profile.clone(), route: ctx.route().into() }
    }
}

#[derive(Serialize)]
pub struct EnrollOut {
    pub enrollment: EnrollmentRecord,
    pub created: bool,
}

#[derive(Serialize)]
pub struct DashboardEntry {
    pub course: Course,
    pub enrollment: EnrollmentRecord,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOut {
    pub enrollment: EnrollmentRecord,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct QuizSubmitIn {
    /// question index -> chosen option index
    pub answers: BTreeMap<usize, usize>,
}

#[derive(Deserialize)]
pub struct ChatIn {
    pub text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeIn {
    pub course_id: String,
    pub lecture_id: String,
}

#[derive(Deserialize)]
pub struct ElaborateIn {
    pub previous: String,
}

fn default_quiz_count() -> usize {
    5
}

#[derive(Deserialize)]
pub struct QuizGenIn {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quiz_count")]
    pub count: usize,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub assistant: bool,
}
