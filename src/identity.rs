//! Identity collaborator: account creation and password sign-in.
//!
//! With IDENTITY_API_KEY set we talk to a Firebase-compatible identity REST API
//! (`accounts:signUp`, `accounts:signInWithPassword`). Without it an in-process
//! provider with the same contract is used, which keeps accounts in memory only
//! and is meant for local development and tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::AuthError;

/// What the provider hands back after a successful sign-up or sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
  pub uid: String,
  pub email: String,
  pub token: String,
}

#[derive(Clone)]
pub enum Identity {
  Remote(RemoteIdentity),
  Memory(MemoryIdentity),
}

impl Identity {
  /// Remote provider if IDENTITY_API_KEY is present, otherwise the in-memory one.
  pub fn from_env() -> Self {
    match RemoteIdentity::from_env() {
      Some(r) => {
        info!(target: "identity", base_url = %r.base_url, "Remote identity provider enabled.");
        Identity::Remote(r)
      }
      None => {
        warn!(target: "identity", "IDENTITY_API_KEY not set; using in-memory identity provider (development only).");
        Identity::Memory(MemoryIdentity::default())
      }
    }
  }

  pub async fn sign_up(&self, email: &str, password: &str) -> Result<Account, AuthError> {
    match self {
      Identity::Remote(r) => r.call("accounts:signUp", email, password).await,
      Identity::Memory(m) => m.sign_up(email, password).await,
    }
  }

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Account, AuthError> {
    match self {
      Identity::Remote(r) => r.call("accounts:signInWithPassword", email, password).await,
      Identity::Memory(m) => m.sign_in(email, password).await,
    }
  }
}

#[derive(Clone)]
pub struct RemoteIdentity {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
  email: &'a str,
  password: &'a str,
  return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
  id_token: String,
  local_id: String,
  #[serde(default)]
  email: Option<String>,
}

impl RemoteIdentity {
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("IDENTITY_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("IDENTITY_BASE_URL")
      .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".into());
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .ok()?;
    Some(Self { client, api_key, base_url })
  }

  #[instrument(level = "info", skip(self, email, password), fields(%endpoint))]
  async fn call(&self, endpoint: &str, email: &str, password: &str) -> Result<Account, AuthError> {
    let url = format!("{}/{}?key={}", self.base_url, endpoint, self.api_key);
    let res = self.client.post(&url)
      .header(USER_AGENT, "skillstream-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&PasswordRequest { email, password, return_secure_token: true })
      .send().await
      // The request URL carries the API key, so the reqwest error text is not surfaced.
      .map_err(|e| {
        warn!(target: "identity", timeout = e.is_timeout(), connect = e.is_connect(), "Identity provider unreachable");
        AuthError::Provider("Identity provider unreachable. Please try again.".into())
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let code = extract_provider_code(&body).unwrap_or_else(|| format!("Identity provider HTTP {}", status));
      warn!(target: "identity", %status, %code, "Identity provider rejected request");
      return Err(AuthError::from_provider_code(&code));
    }

    let body: PasswordResponse = res.json().await
      .map_err(|_| AuthError::Provider("Malformed identity provider response".into()))?;
    Ok(Account {
      uid: body.local_id,
      email: body.email.unwrap_or_else(|| email.to_string()),
      token: body.id_token,
    })
  }
}

/// `{"error": {"message": "EMAIL_EXISTS", ...}}`
fn extract_provider_code(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[derive(Clone)]
struct MemoryAccount {
  uid: String,
  email: String,
  password: String,
}

/// In-process stand-in for the identity collaborator.
#[derive(Clone, Default)]
pub struct MemoryIdentity {
  accounts: Arc<RwLock<HashMap<String, MemoryAccount>>>,
}

impl MemoryIdentity {
  async fn sign_up(&self, email: &str, password: &str) -> Result<Account, AuthError> {
    if !crate::util::looks_like_email(email) {
      return Err(AuthError::InvalidEmail);
    }
    if password.chars().count() < 6 {
      return Err(AuthError::WeakPassword);
    }
    let key = email.trim().to_lowercase();
    let mut accounts = self.accounts.write().await;
    if accounts.contains_key(&key) {
      return Err(AuthError::EmailAlreadyRegistered);
    }
    let acct = MemoryAccount { uid: Uuid::new_v4().simple().to_string(), email: email.trim().to_string(), password: password.to_string() };
    accounts.insert(key, acct.clone());
    Ok(Account { uid: acct.uid, email: acct.email, token: Uuid::new_v4().to_string() })
  }

  async fn sign_in(&self, email: &str, password: &str) -> Result<Account, AuthError> {
    let key = email.trim().to_lowercase();
    let accounts = self.accounts.read().await;
    match accounts.get(&key) {
      Some(a) if a.password == password => {
        Ok(Account { uid: a.uid.clone(), email: a.email.clone(), token: Uuid::new_v4().to_string() })
      }
      _ => Err(AuthError::InvalidCredentials),
    }
  }
}
