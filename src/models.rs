use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

/// The signed-in user as the rest of the service sees it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgress {
    pub step_index: usize,
    pub message: String,
    pub percent: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWebsite {
    pub id: i64,
    pub name: String,
    pub preview_url: String,
    pub download_url: String,
}

impl GeneratedWebsite {
    /// Preview and download paths are a contract the backend has to keep; they are not returned by it.
    pub fn from_backend(id: i64, name: String) -> Self {
        Self {
            id,
            name,
            preview_url: format!("/api/websites/{id}/preview"),
            download_url: format!("/api/websites/{id}/download"),
        }
    }
}

/// Body of `POST /api/websites/generate`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayload {
    pub template: String,
    pub business_name: String,
    pub description: String,
    pub contact_email: String,
    pub phone: String,
    pub address: String,
    pub color_scheme: String,
    pub user_id: i64,
    pub name: String,
}

// --- Backend records (admin dashboard) ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub firebase_uid: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteRecord {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub color_scheme: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Profile captured at sign-up and registered with the backend.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignUpProfile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

// --- Notifications ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Destructive,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn info(title: &str, description: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Info, title: title.to_string(), description: description.into(), raised_at: Utc::now() }
    }

    pub fn destructive(title: &str, description: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Destructive, title: title.to_string(), description: description.into(), raised_at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_templated_from_the_backend_id() {
        let site = GeneratedWebsite::from_backend(42, "Acme Site".into());
        assert!(site.preview_url.ends_with("/api/websites/42/preview"));
        assert!(site.download_url.ends_with("/api/websites/42/download"));
    }

    #[test]
    fn payload_uses_camel_case_keys() {
        let payload = GeneratePayload {
            template: "business".into(),
            business_name: "Acme".into(),
            description: "A shop".into(),
            contact_email: String::new(),
            phone: String::new(),
            address: String::new(),
            color_scheme: "professional".into(),
            user_id: 7,
            name: "Acme Website".into(),
        };
        let value = serde_json::to_value(&payload).expect("json");
        assert_eq!(value["businessName"], "Acme");
        assert_eq!(value["colorScheme"], "professional");
        assert_eq!(value["userId"], 7);
    }

    #[test]
    fn admin_records_tolerate_sparse_rows() {
        let user: UserRecord = serde_json::from_value(serde_json::json!({
            "id": 1,
            "email": "a@b.c",
            "emailVerified": true,
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .expect("user");
        assert!(user.email_verified);
        assert_eq!(user.first_name, "");
        assert!(user.created_at.is_some());
    }
}
