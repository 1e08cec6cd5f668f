use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{auth::AuthError, backend::BackendError, request::RequiredField};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("missing required fields: {}", RequiredField::join(.missing))]
    Validation { missing: Vec<RequiredField> },
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("a website is already being generated")]
    AlreadyGenerating,
    #[error("generation attempt was abandoned")]
    Abandoned,
    #[error("the wizard has been shut down")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("no generated website available")]
    NoResult,
    #[error("admin access required")]
    Forbidden,
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("download failed: {0}")]
    Download(String),
    #[error("config: {0}")]
    Config(String),
}

impl WizardError {
    fn code(&self) -> &'static str {
        match self {
            WizardError::Validation { .. } | WizardError::InvalidField { .. } => "validation",
            WizardError::UnknownTemplate(_) => "unknown_template",
            WizardError::AuthenticationRequired => "authentication_required",
            WizardError::AlreadyGenerating => "already_generating",
            WizardError::Abandoned => "abandoned",
            WizardError::Closed => "closed",
            WizardError::Transport(_) => "transport",
            WizardError::MalformedResponse(_) => "malformed_response",
            WizardError::NoResult => "no_result",
            WizardError::Forbidden => "forbidden",
            WizardError::Auth(_) => "auth",
            WizardError::Download(_) => "download",
            WizardError::Config(_) => "config",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            WizardError::Validation { .. }
            | WizardError::InvalidField { .. }
            | WizardError::UnknownTemplate(_) => StatusCode::BAD_REQUEST,
            WizardError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            WizardError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            WizardError::Auth(AuthError::EmailExists) => StatusCode::CONFLICT,
            WizardError::Auth(AuthError::Rejected(_)) => StatusCode::BAD_REQUEST,
            WizardError::Auth(_) => StatusCode::BAD_GATEWAY,
            WizardError::AlreadyGenerating | WizardError::Abandoned => StatusCode::CONFLICT,
            WizardError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            WizardError::NoResult => StatusCode::NOT_FOUND,
            WizardError::Forbidden => StatusCode::FORBIDDEN,
            WizardError::Transport(_)
            | WizardError::MalformedResponse(_)
            | WizardError::Download(_) => StatusCode::BAD_GATEWAY,
            WizardError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BackendError> for WizardError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Malformed(msg) => WizardError::MalformedResponse(msg),
            other => WizardError::Transport(other.to_string()),
        }
    }
}

impl IntoResponse for WizardError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.code(), "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
