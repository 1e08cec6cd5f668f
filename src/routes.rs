use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::{
    admin::{self, AdminQuery, CsvRecord, DashboardStats, WebsiteView},
    auth::{AuthContext, SessionSnapshot},
    backend::WebsiteBackend,
    contact::{self, ContactForm},
    error::WizardError,
    models::{Notification, NotificationLevel, SessionUser, SignUpProfile},
    orchestrator::{Orchestrator, WizardStatus},
    presenter::ResultPresenter,
    request::{FieldUpdate, GenerationRequest},
    templates::{self, TemplateDescriptor},
};

#[derive(Clone)]
pub struct AppState {
    pub wizard: Orchestrator,
    pub auth: Arc<AuthContext>,
    pub backend: Arc<dyn WebsiteBackend>,
    pub presenter: Arc<ResultPresenter>,
    pub admin_email: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/templates", get(list_templates))
        .route("/api/session", get(session))
        .route("/api/session/sign-in", post(sign_in))
        .route("/api/session/sign-up", post(sign_up))
        .route("/api/session/federated", post(sign_in_federated))
        .route("/api/session/sign-out", post(sign_out))
        .route("/api/wizard", get(wizard_status))
        .route("/api/wizard/template", post(select_template))
        .route("/api/wizard/fields", post(update_field))
        .route("/api/wizard/submit", post(submit))
        .route("/api/wizard/dismiss", post(dismiss))
        .route("/api/wizard/acknowledge", post(acknowledge))
        .route("/api/wizard/preview", get(open_preview))
        .route("/api/wizard/download", get(download))
        .route("/api/notifications", get(notifications))
        .route("/api/contact", post(send_contact))
        .route("/api/admin/stats", get(admin_stats))
        .route("/api/admin/users", get(admin_users))
        .route("/api/admin/users/export", get(export_users))
        .route("/api/admin/websites", get(admin_websites))
        .route("/api/admin/websites/export", get(export_websites))
        .route("/api/admin/messages", get(admin_messages))
        .route("/api/admin/messages/export", get(export_messages))
        .with_state(state)
}

pub async fn list_templates() -> Json<&'static [TemplateDescriptor]> {
    Json(templates::list_templates())
}

// --- Session ---

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SignUpBody {
    fn profile(&self) -> Option<SignUpProfile> {
        if self.first_name.is_none() && self.last_name.is_none() {
            return None;
        }
        Some(SignUpProfile {
            first_name: self.first_name.clone().unwrap_or_default(),
            last_name: self.last_name.clone().unwrap_or_default(),
            phone: self.phone.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedBody {
    pub id_token: String,
}

pub async fn session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.auth.snapshot())
}

pub async fn sign_in(State(state): State<AppState>, Json(body): Json<Credentials>) -> Result<Json<SessionUser>, WizardError> {
    Ok(Json(state.auth.sign_in_with_password(&body.email, &body.password).await?))
}

pub async fn sign_up(State(state): State<AppState>, Json(body): Json<SignUpBody>) -> Result<Json<SessionUser>, WizardError> {
    let profile = body.profile();
    let user = state
        .auth
        .sign_up_with_password(&body.email, &body.password, profile.as_ref())
        .await?;
    Ok(Json(user))
}

pub async fn sign_in_federated(State(state): State<AppState>, Json(body): Json<FederatedBody>) -> Result<Json<SessionUser>, WizardError> {
    Ok(Json(state.auth.sign_in_with_federated(&body.id_token).await?))
}

pub async fn sign_out(State(state): State<AppState>) -> Result<StatusCode, WizardError> {
    state.auth.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Wizard ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateChoice {
    pub template_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub value: String,
}

pub async fn wizard_status(State(state): State<AppState>) -> Json<WizardStatus> {
    Json(state.wizard.status())
}

pub async fn select_template(State(state): State<AppState>, Json(body): Json<TemplateChoice>) -> Result<Json<WizardStatus>, WizardError> {
    state.wizard.select_template(&body.template_id)?;
    Ok(Json(state.wizard.status()))
}

pub async fn update_field(State(state): State<AppState>, Json(body): Json<FieldChange>) -> Result<Json<GenerationRequest>, WizardError> {
    let update = FieldUpdate::parse(&body.field, &body.value)?;
    Ok(Json(state.wizard.update_field(update)))
}

/// Starts an attempt and returns right away; progress is polled through `GET /api/wizard`.
pub async fn submit(State(state): State<AppState>) -> Result<(StatusCode, Json<WizardStatus>), WizardError> {
    let user = state.auth.current_user();
    let attempt = state.wizard.begin(user.as_ref())?;
    let id = attempt.id();
    tokio::spawn(async move {
        if let Err(e) = attempt.run().await {
            debug!(attempt = %id, "attempt ended without a website: {}", e);
        }
    });
    Ok((StatusCode::ACCEPTED, Json(state.wizard.status())))
}

pub async fn dismiss(State(state): State<AppState>) -> Json<WizardStatus> {
    state.wizard.dismiss();
    Json(state.wizard.status())
}

pub async fn acknowledge(State(state): State<AppState>) -> Json<WizardStatus> {
    state.wizard.acknowledge();
    Json(state.wizard.status())
}

pub async fn open_preview(State(state): State<AppState>) -> Result<Redirect, WizardError> {
    let done = state.wizard.result().ok_or(WizardError::NoResult)?;
    let url = state.presenter.open_preview(&done.website)?;
    Ok(Redirect::to(url.as_str()))
}

pub async fn download(State(state): State<AppState>) -> Result<Response, WizardError> {
    let done = state.wizard.result().ok_or(WizardError::NoResult)?;
    match state.presenter.download(&done.website, &done.business_name).await {
        Ok(archive) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
            let disposition = format!("attachment; filename=\"{}\"", archive.file_name);
            let disposition = HeaderValue::from_str(&disposition)
                .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"website-source.zip\""));
            headers.insert(header::CONTENT_DISPOSITION, disposition);
            Ok((StatusCode::OK, headers, archive.bytes).into_response())
        }
        Err(notification) => {
            let reason = notification.description.clone();
            state.wizard.notify(notification);
            Err(WizardError::Download(reason))
        }
    }
}

pub async fn notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.wizard.drain_notifications())
}

pub async fn send_contact(State(state): State<AppState>, Json(form): Json<ContactForm>) -> Result<(StatusCode, Json<Notification>), WizardError> {
    let notification = contact::send_message(state.backend.as_ref(), &form).await?;
    let status = match notification.level {
        NotificationLevel::Info => StatusCode::OK,
        NotificationLevel::Destructive => StatusCode::BAD_GATEWAY,
    };
    Ok((status, Json(notification)))
}

// --- Admin ---

fn require_admin(state: &AppState) -> Result<(), WizardError> {
    let user = state.auth.current_user();
    if admin::is_admin(user.as_ref(), &state.admin_email) {
        Ok(())
    } else {
        Err(WizardError::Forbidden)
    }
}

fn csv_response<T: CsvRecord>(rows: &[T], file_name: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    (StatusCode::OK, headers, admin::to_csv(rows)).into_response()
}

pub async fn admin_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, WizardError> {
    require_admin(&state)?;
    let (users, websites, messages) = tokio::try_join!(
        state.backend.list_users(),
        state.backend.list_websites(),
        state.backend.list_messages()
    )?;
    Ok(Json(DashboardStats::compute(&users, &websites, &messages)))
}

pub async fn admin_users(State(state): State<AppState>, Query(query): Query<AdminQuery>) -> Result<Response, WizardError> {
    require_admin(&state)?;
    let users = state.backend.list_users().await?;
    Ok(Json(admin::filter_users(&users, &query)).into_response())
}

pub async fn export_users(State(state): State<AppState>, Query(query): Query<AdminQuery>) -> Result<Response, WizardError> {
    require_admin(&state)?;
    let users = state.backend.list_users().await?;
    Ok(csv_response(&admin::filter_users(&users, &query), "users.csv"))
}

pub async fn admin_websites(State(state): State<AppState>, Query(query): Query<AdminQuery>) -> Result<Json<Vec<WebsiteView>>, WizardError> {
    require_admin(&state)?;
    let websites = state.backend.list_websites().await?;
    let views = admin::filter_websites(&websites, &query).into_iter().map(WebsiteView::from).collect();
    Ok(Json(views))
}

pub async fn export_websites(State(state): State<AppState>, Query(query): Query<AdminQuery>) -> Result<Response, WizardError> {
    require_admin(&state)?;
    let websites = state.backend.list_websites().await?;
    Ok(csv_response(&admin::filter_websites(&websites, &query), "websites.csv"))
}

pub async fn admin_messages(State(state): State<AppState>, Query(query): Query<AdminQuery>) -> Result<Response, WizardError> {
    require_admin(&state)?;
    let messages = state.backend.list_messages().await?;
    Ok(Json(admin::filter_messages(&messages, &query)).into_response())
}

pub async fn export_messages(State(state): State<AppState>, Query(query): Query<AdminQuery>) -> Result<Response, WizardError> {
    require_admin(&state)?;
    let messages = state.backend.list_messages().await?;
    Ok(csv_response(&admin::filter_messages(&messages, &query), "messages.csv"))
}
