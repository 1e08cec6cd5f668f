//! In-process fakes shared by the unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::Url;
use tokio::sync::Notify;

use crate::{
    backend::{BackendError, GeneratedRecord, NewUser, WebsiteBackend},
    contact::ContactForm,
    models::{ContactMessage, GeneratePayload, SessionUser, UserRecord, WebsiteRecord},
};

#[derive(Debug, Clone)]
pub enum GenerateScript {
    Ok { id: i64, name: Option<String> },
    Status(u16),
    Malformed,
    Transport,
}

pub struct FakeBackend {
    script: Mutex<GenerateScript>,
    gate: Mutex<Option<Arc<Notify>>>,
    generate_calls: Mutex<Vec<GeneratePayload>>,
    archive: Mutex<Option<Bytes>>,
    contact: Mutex<Vec<ContactForm>>,
    contact_fails: Mutex<bool>,
    created_users: Mutex<Vec<String>>,
    create_user_fails: Mutex<bool>,
    pub users: Mutex<Vec<UserRecord>>,
    pub websites: Mutex<Vec<WebsiteRecord>>,
    pub messages: Mutex<Vec<ContactMessage>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(GenerateScript::Ok { id: 99, name: Some("Acme Website".into()) }),
            gate: Mutex::new(None),
            generate_calls: Mutex::new(Vec::new()),
            archive: Mutex::new(Some(Bytes::from_static(b"PK\x03\x04fake"))),
            contact: Mutex::new(Vec::new()),
            contact_fails: Mutex::new(false),
            created_users: Mutex::new(Vec::new()),
            create_user_fails: Mutex::new(false),
            users: Mutex::new(Vec::new()),
            websites: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, script: GenerateScript) {
        *self.script.lock() = script;
    }

    /// Holds every generate call until the returned notify fires.
    pub fn hold_generate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock() = Some(notify.clone());
        notify
    }

    pub fn generate_calls(&self) -> Vec<GeneratePayload> {
        self.generate_calls.lock().clone()
    }

    pub fn remove_archive(&self) {
        *self.archive.lock() = None;
    }

    pub fn contact_messages(&self) -> Vec<ContactForm> {
        self.contact.lock().clone()
    }

    pub fn fail_contact(&self) {
        *self.contact_fails.lock() = true;
    }

    pub fn created_users(&self) -> Vec<String> {
        self.created_users.lock().clone()
    }

    pub fn fail_create_user(&self) {
        *self.create_user_fails.lock() = true;
    }
}

#[async_trait]
impl WebsiteBackend for FakeBackend {
    async fn generate(&self, payload: &GeneratePayload) -> Result<GeneratedRecord, BackendError> {
        self.generate_calls.lock().push(payload.clone());
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let script = self.script.lock().clone();
        match script {
            GenerateScript::Ok { id, name } => Ok(GeneratedRecord { id, name }),
            GenerateScript::Status(status) => Err(BackendError::Status { status, body: "error".into() }),
            GenerateScript::Malformed => Err(BackendError::Malformed("response has no website id".into())),
            GenerateScript::Transport => Err(BackendError::Http("connection refused".into())),
        }
    }

    async fn download_archive(&self, _download_path: &str) -> Result<Bytes, BackendError> {
        self.archive
            .lock()
            .clone()
            .ok_or(BackendError::Status { status: 404, body: "gone".into() })
    }

    async fn create_user(&self, user: &NewUser<'_>) -> Result<(), BackendError> {
        if *self.create_user_fails.lock() {
            return Err(BackendError::Status { status: 500, body: "db down".into() });
        }
        self.created_users.lock().push(user.email.to_string());
        Ok(())
    }

    async fn submit_contact(&self, form: &ContactForm) -> Result<(), BackendError> {
        if *self.contact_fails.lock() {
            return Err(BackendError::Http("connection reset".into()));
        }
        self.contact.lock().push(form.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        Ok(self.users.lock().clone())
    }

    async fn list_websites(&self) -> Result<Vec<WebsiteRecord>, BackendError> {
        Ok(self.websites.lock().clone())
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, BackendError> {
        Ok(self.messages.lock().clone())
    }

    fn resolve(&self, path: &str) -> Result<Url, BackendError> {
        Url::parse("http://backend.test")
            .and_then(|base| base.join(path))
            .map_err(|e| BackendError::Http(e.to_string()))
    }
}

pub fn user(id: i64) -> SessionUser {
    SessionUser {
        id,
        uid: format!("uid-{id}"),
        email: format!("user{id}@example.com"),
        display_name: Some("Test User".into()),
        email_verified: true,
    }
}
