//! Session state backed by an external identity provider.
//!
//! [`AuthContext`] is created once at startup. It follows the provider's
//! current-user stream in a background task and hands out read-only
//! snapshots; sign-in and sign-out go through its action methods only.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    backend::{NewUser, WebsiteBackend},
    models::{SessionUser, SignUpProfile},
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    EmailExists,
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// The user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderUser, AuthError>;
    async fn sign_up_with_password(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<ProviderUser, AuthError>;
    /// Signs in with an ID token obtained from a federated provider (Google).
    async fn sign_in_with_federated(&self, id_token: &str) -> Result<ProviderUser, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    fn subscribe(&self) -> watch::Receiver<Option<ProviderUser>>;
}

fn check_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AuthError::Rejected("a valid email address is required".into()));
    }
    if password.is_empty() {
        return Err(AuthError::Rejected("password is required".into()));
    }
    Ok(())
}

// --- Demo provider ---

struct DemoAccount {
    uid: String,
    password: String,
    display_name: Option<String>,
}

/// In-memory accounts for running without Firebase credentials.
pub struct DemoIdentityProvider {
    accounts: Mutex<HashMap<String, DemoAccount>>,
    current: watch::Sender<Option<ProviderUser>>,
}

impl Default for DemoIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoIdentityProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { accounts: Mutex::new(HashMap::new()), current }
    }

    fn publish(&self, user: ProviderUser) -> ProviderUser {
        self.current.send_replace(Some(user.clone()));
        user
    }
}

#[async_trait]
impl IdentityProvider for DemoIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderUser, AuthError> {
        check_credentials(email, password)?;
        let key = email.trim().to_lowercase();
        let user = {
            let accounts = self.accounts.lock();
            let account = accounts.get(&key).ok_or(AuthError::InvalidCredentials)?;
            if account.password != password {
                return Err(AuthError::InvalidCredentials);
            }
            ProviderUser {
                uid: account.uid.clone(),
                email: key,
                display_name: account.display_name.clone(),
                email_verified: true,
            }
        };
        Ok(self.publish(user))
    }

    async fn sign_up_with_password(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<ProviderUser, AuthError> {
        check_credentials(email, password)?;
        if password.len() < 6 {
            return Err(AuthError::Rejected("password should be at least 6 characters".into()));
        }
        let key = email.trim().to_lowercase();
        let user = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailExists);
            }
            let uid = Uuid::new_v4().simple().to_string();
            accounts.insert(key.clone(), DemoAccount {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
            });
            ProviderUser { uid, email: key, display_name: display_name.map(str::to_string), email_verified: false }
        };
        info!("📝 Demo account created for {}", user.email);
        Ok(self.publish(user))
    }

    async fn sign_in_with_federated(&self, id_token: &str) -> Result<ProviderUser, AuthError> {
        // Demo tokens are just the email address.
        let email = id_token.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AuthError::Rejected("demo federated token must be an email address".into()));
        }
        let uid = {
            let mut accounts = self.accounts.lock();
            accounts
                .entry(email.clone())
                .or_insert_with(|| DemoAccount {
                    uid: Uuid::new_v4().simple().to_string(),
                    password: Uuid::new_v4().to_string(),
                    display_name: None,
                })
                .uid
                .clone()
        };
        Ok(self.publish(ProviderUser { uid, email, display_name: None, email_verified: true }))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.current.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<ProviderUser>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
impl DemoIdentityProvider {
    /// Drops the session as if the provider had expired it.
    pub fn revoke(&self) {
        self.current.send_replace(None);
    }
}

// --- Firebase provider ---

/// Firebase Identity Toolkit over its REST API.
pub struct FirebaseIdentityProvider {
    client: Client,
    api_key: String,
    base_url: String,
    id_token: Mutex<Option<String>>,
    current: watch::Sender<Option<ProviderUser>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetail {
    message: String,
}

fn map_firebase_error(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<FirebaseErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| format!("status={status} body={body}"));
    let code = message.split(':').next().unwrap_or_default().trim().to_string();
    match code.as_str() {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailExists,
        "WEAK_PASSWORD" | "INVALID_EMAIL" | "MISSING_PASSWORD" | "INVALID_IDP_RESPONSE" => {
            AuthError::Rejected(message)
        }
        _ => AuthError::Provider(message),
    }
}

impl FirebaseIdentityProvider {
    pub fn new(api_key: String, base_url: String) -> Self {
        let (current, _) = watch::channel(None);
        Self { client: Client::new(), api_key, base_url, id_token: Mutex::new(None), current }
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, AuthError> {
        let url = format!("{}/accounts:{}?key={}", self.base_url.trim_end_matches('/'), method, self.api_key);
        debug!("🔗 Identity toolkit call accounts:{}", method);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| AuthError::Provider(e.to_string()))?;
        if !status.is_success() {
            return Err(map_firebase_error(status.as_u16(), &text));
        }
        serde_json::from_str(&text).map_err(|e| AuthError::Provider(format!("parse error: {e}")))
    }

    async fn establish(&self, token: TokenResponse) -> Result<ProviderUser, AuthError> {
        let (email_verified, display_name) = match token.email_verified {
            Some(verified) => (verified, token.display_name.clone()),
            None => {
                let lookup: LookupResponse = self.call("lookup", json!({ "idToken": token.id_token })).await?;
                let found = lookup.users.into_iter().next();
                (
                    found.as_ref().map_or(false, |u| u.email_verified),
                    token.display_name.clone().or_else(|| found.and_then(|u| u.display_name)),
                )
            }
        };
        let user = ProviderUser {
            uid: token.local_id,
            email: token.email.unwrap_or_default(),
            display_name: display_name.filter(|n| !n.is_empty()),
            email_verified,
        };
        *self.id_token.lock() = Some(token.id_token);
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<ProviderUser, AuthError> {
        check_credentials(email, password)?;
        let token: TokenResponse = self
            .call("signInWithPassword", json!({ "email": email, "password": password, "returnSecureToken": true }))
            .await?;
        self.establish(token).await
    }

    async fn sign_up_with_password(&self, email: &str, password: &str, display_name: Option<&str>) -> Result<ProviderUser, AuthError> {
        check_credentials(email, password)?;
        let mut body = json!({ "email": email, "password": password, "returnSecureToken": true });
        if let Some(name) = display_name {
            body["displayName"] = json!(name);
        }
        let token: TokenResponse = self.call("signUp", body).await?;
        let verification: Result<Value, AuthError> = self
            .call("sendOobCode", json!({ "requestType": "VERIFY_EMAIL", "idToken": token.id_token }))
            .await;
        if let Err(e) = verification {
            warn!("⚠️ Could not send verification email to {}: {}", email, e);
        }
        self.establish(TokenResponse { email_verified: Some(false), ..token }).await
    }

    async fn sign_in_with_federated(&self, id_token: &str) -> Result<ProviderUser, AuthError> {
        let token: TokenResponse = self
            .call(
                "signInWithIdp",
                json!({
                    "postBody": format!("id_token={id_token}&providerId=google.com"),
                    "requestUri": "http://localhost",
                    "returnIdpCredential": true,
                    "returnSecureToken": true
                }),
            )
            .await?;
        self.establish(token).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.id_token.lock().take();
        self.current.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<ProviderUser>> {
        self.current.subscribe()
    }
}

// --- Session context ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user: Option<SessionUser>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub loading: bool,
}

struct SessionState {
    user: Option<SessionUser>,
    loading: bool,
}

/// Applies a provider update. A known uid keeps its session id; a new one gets a fresh id.
fn apply(state: &RwLock<SessionState>, user: Option<ProviderUser>) -> Option<SessionUser> {
    let mut state = state.write();
    let previous = state.user.take();
    state.loading = false;
    state.user = user.map(|u| {
        let id = match previous {
            Some(existing) if existing.uid == u.uid => existing.id,
            _ => Utc::now().timestamp_millis(),
        };
        SessionUser { id, uid: u.uid, email: u.email, display_name: u.display_name, email_verified: u.email_verified }
    });
    state.user.clone()
}

pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn WebsiteBackend>,
    state: Arc<RwLock<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthContext {
    /// Subscribes to the provider's user stream. Must be called inside a tokio runtime.
    pub fn start(provider: Arc<dyn IdentityProvider>, backend: Arc<dyn WebsiteBackend>) -> Self {
        let state = Arc::new(RwLock::new(SessionState { user: None, loading: true }));
        let mut rx = provider.subscribe();
        let listener_state = state.clone();
        let listener = tokio::spawn(async move {
            loop {
                let user = rx.borrow_and_update().clone();
                let applied = apply(&listener_state, user);
                debug!(signed_in = applied.is_some(), "session updated from identity provider");
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        Self { provider, backend, state, listener: Mutex::new(Some(listener)) }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        let (first_name, last_name) = match state.user.as_ref().and_then(|u| u.display_name.as_deref()) {
            Some(name) => split_display_name(name),
            None => (state.user.as_ref().map(|_| "User".to_string()), None),
        };
        SessionSnapshot { user: state.user.clone(), first_name, last_name, loading: state.loading }
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.state.read().user.clone()
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        let user = self.provider.sign_in_with_password(email, password).await?;
        info!("🔐 Signed in {}", user.email);
        self.established(user)
    }

    /// Creates the account, then registers the profile with the backend. The registration is best effort.
    pub async fn sign_up_with_password(&self, email: &str, password: &str, profile: Option<&SignUpProfile>) -> Result<SessionUser, AuthError> {
        let display_name = profile
            .map(|p| format!("{} {}", p.first_name.trim(), p.last_name.trim()).trim().to_string())
            .filter(|n| !n.is_empty());
        let user = self.provider.sign_up_with_password(email, password, display_name.as_deref()).await?;
        info!("📝 Signed up {}", user.email);
        if let Some(profile) = profile {
            let record = NewUser::new(&user.email, &user.uid, profile);
            if let Err(e) = self.backend.create_user(&record).await {
                warn!("⚠️ Failed to create user in database: {}", e);
            }
        }
        self.established(user)
    }

    pub async fn sign_in_with_federated(&self, id_token: &str) -> Result<SessionUser, AuthError> {
        let user = self.provider.sign_in_with_federated(id_token).await?;
        info!("🔐 Signed in {} with Google", user.email);
        self.established(user)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        apply(&self.state, None);
        info!("👋 Signed out");
        Ok(())
    }

    /// Stops following the provider. The last snapshot stays readable.
    pub fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
            debug!("auth context listener stopped");
        }
    }

    fn established(&self, user: ProviderUser) -> Result<SessionUser, AuthError> {
        apply(&self.state, Some(user)).ok_or_else(|| AuthError::Provider("session was not established".into()))
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn split_display_name(name: &str) -> (Option<String>, Option<String>) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or("User").to_string();
    let last = parts.next().map(str::to_string);
    (Some(first), last)
}
