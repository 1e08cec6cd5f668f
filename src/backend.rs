use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    contact::ContactForm,
    models::{ContactMessage, GeneratePayload, SignUpProfile, UserRecord, WebsiteRecord},
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("status={status} body={body}")] Status { status: u16, body: String },
    #[error("malformed response: {0}")] Malformed(String),
}

/// What the generate endpoint returns once it has a usable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRecord {
    pub id: i64,
    pub name: Option<String>,
}

/// Registration body for `POST /api/users`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
    pub address: &'a str,
    pub firebase_uid: &'a str,
    pub email_verified: bool,
}

impl<'a> NewUser<'a> {
    pub fn new(email: &'a str, uid: &'a str, profile: &'a SignUpProfile) -> Self {
        Self {
            email,
            first_name: &profile.first_name,
            last_name: &profile.last_name,
            phone: &profile.phone,
            address: &profile.address,
            firebase_uid: uid,
            email_verified: false,
        }
    }
}

#[async_trait]
pub trait WebsiteBackend: Send + Sync {
    async fn generate(&self, payload: &GeneratePayload) -> Result<GeneratedRecord, BackendError>;
    async fn download_archive(&self, download_path: &str) -> Result<Bytes, BackendError>;
    async fn create_user(&self, user: &NewUser<'_>) -> Result<(), BackendError>;
    async fn submit_contact(&self, form: &ContactForm) -> Result<(), BackendError>;
    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError>;
    async fn list_websites(&self) -> Result<Vec<WebsiteRecord>, BackendError>;
    async fn list_messages(&self) -> Result<Vec<ContactMessage>, BackendError>;
    /// Absolute URL of a backend path, used for redirects to the preview page.
    fn resolve(&self, path: &str) -> Result<Url, BackendError>;
}

pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Http(format!("bad path {path}: {e}")))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ Backend error response {}: {}", status, body);
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.url(path)?;
        info!("🔗 GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        let text = Self::check(response)
            .await?
            .text()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| BackendError::Malformed(format!("{path}: {e}")))
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, BackendError> {
        let url = self.url(path)?;
        info!("🔗 POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        Self::check(response).await
    }
}

#[async_trait]
impl WebsiteBackend for HttpBackend {
    async fn generate(&self, payload: &GeneratePayload) -> Result<GeneratedRecord, BackendError> {
        info!("🚀 Requesting website generation for {:?} ({})", payload.business_name, payload.template);
        let response = self.post_json("/api/websites/generate", payload).await?;
        let text = response.text().await.map_err(|e| BackendError::Http(e.to_string()))?;
        let record = parse_generate_response(&text)?;
        info!("✅ Backend generated website id={}", record.id);
        Ok(record)
    }

    async fn download_archive(&self, download_path: &str) -> Result<Bytes, BackendError> {
        let url = self.url(download_path)?;
        info!("📦 Downloading archive from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;
        Self::check(response)
            .await?
            .bytes()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))
    }

    async fn create_user(&self, user: &NewUser<'_>) -> Result<(), BackendError> {
        self.post_json("/api/users", user).await.map(|_| ())
    }

    async fn submit_contact(&self, form: &ContactForm) -> Result<(), BackendError> {
        self.post_json("/api/contact", form).await.map(|_| ())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        self.get_json("/api/admin/users").await
    }

    async fn list_websites(&self) -> Result<Vec<WebsiteRecord>, BackendError> {
        self.get_json("/api/admin/websites").await
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, BackendError> {
        self.get_json("/api/admin/messages").await
    }

    fn resolve(&self, path: &str) -> Result<Url, BackendError> {
        self.url(path)
    }
}

// --- Response Parsing Helpers ---

#[serde_as]
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
}

/// Accepts numeric or numeric-string ids; anything without a positive id is malformed.
fn parse_generate_response(text: &str) -> Result<GeneratedRecord, BackendError> {
    let parsed: GenerateResponse = serde_json::from_str(text)
        .map_err(|e| BackendError::Malformed(format!("parse error: {e}")))?;
    match parsed.id {
        Some(id) if id > 0 => Ok(GeneratedRecord { id, name: parsed.name.filter(|n| !n.trim().is_empty()) }),
        Some(id) => Err(BackendError::Malformed(format!("unusable website id {id}"))),
        None => Err(BackendError::Malformed("response has no website id".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::{get, post}, Json, Router};
    use serde_json::{json, Value};

    #[test]
    fn parses_numeric_and_string_ids() {
        assert_eq!(
            parse_generate_response(r#"{"id":42,"name":"Acme Site","html":"..."}"#).expect("ok"),
            GeneratedRecord { id: 42, name: Some("Acme Site".into()) }
        );
        assert_eq!(parse_generate_response(r#"{"id":"17"}"#).expect("ok").id, 17);
    }

    #[test]
    fn missing_or_zero_id_is_malformed() {
        assert!(matches!(parse_generate_response(r#"{"name":"x"}"#), Err(BackendError::Malformed(_))));
        assert!(matches!(parse_generate_response(r#"{"id":0}"#), Err(BackendError::Malformed(_))));
        assert!(matches!(parse_generate_response(r#"{"id":null}"#), Err(BackendError::Malformed(_))));
        assert!(matches!(parse_generate_response("<html>"), Err(BackendError::Malformed(_))));
    }

    async fn spawn_fake(app: Router) -> HttpBackend {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        let base = Url::parse(&format!("http://{addr}")).expect("url");
        HttpBackend::new(base, Duration::from_secs(5)).expect("client")
    }

    fn payload() -> GeneratePayload {
        GeneratePayload {
            template: "business".into(),
            business_name: "Acme".into(),
            description: "A shop".into(),
            contact_email: String::new(),
            phone: String::new(),
            address: String::new(),
            color_scheme: "professional".into(),
            user_id: 7,
            name: "Acme Website".into(),
        }
    }

    #[tokio::test]
    async fn generate_posts_payload_and_reads_id() {
        let app = Router::new().route(
            "/api/websites/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["userId"], 7);
                assert_eq!(body["name"], "Acme Website");
                Json(json!({ "id": 99, "name": "Acme Website" }))
            }),
        );
        let backend = spawn_fake(app).await;
        let record = backend.generate(&payload()).await.expect("generate");
        assert_eq!(record.id, 99);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let app = Router::new().route(
            "/api/websites/generate",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let backend = spawn_fake(app).await;
        let err = backend.generate(&payload()).await.expect_err("should fail");
        assert!(matches!(err, BackendError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn admin_lists_and_archive_download() {
        let app = Router::new()
            .route(
                "/api/admin/users",
                get(|| async { Json(json!([{ "id": 1, "email": "a@b.c", "firstName": "Ann" }])) }),
            )
            .route("/api/websites/5/download", get(|| async { vec![0x50u8, 0x4b, 0x03, 0x04] }));
        let backend = spawn_fake(app).await;

        let users = backend.list_users().await.expect("users");
        assert_eq!(users[0].first_name, "Ann");

        let bytes = backend.download_archive("/api/websites/5/download").await.expect("bytes");
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let backend = HttpBackend::new(Url::parse("http://127.0.0.1:1").expect("url"), Duration::from_secs(2))
            .expect("client");
        let err = backend.list_messages().await.expect_err("should fail");
        assert!(matches!(err, BackendError::Http(_)));
    }
}
