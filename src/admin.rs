//! Admin dashboard: search, filters, stats and CSV export over backend records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::{ContactMessage, SessionUser, UserRecord, WebsiteRecord},
    templates,
};

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatusFilter {
    #[default]
    All,
    Verified,
    Unverified,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct AdminQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: UserStatusFilter,
    /// Template id, or `all`.
    #[serde(default)]
    pub template: Option<String>,
}

impl AdminQuery {
    fn template_filter(&self) -> Option<&str> {
        self.template.as_deref().filter(|t| !t.is_empty() && *t != "all")
    }
}

pub fn is_admin(user: Option<&SessionUser>, admin_email: &str) -> bool {
    user.is_some_and(|u| u.email.eq_ignore_ascii_case(admin_email))
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

pub fn filter_users(users: &[UserRecord], query: &AdminQuery) -> Vec<UserRecord> {
    let needle = query.search.to_lowercase();
    users
        .iter()
        .filter(|u| {
            contains(&u.email, &needle) || contains(&u.first_name, &needle) || contains(&u.last_name, &needle)
        })
        .filter(|u| match query.status {
            UserStatusFilter::All => true,
            UserStatusFilter::Verified => u.email_verified,
            UserStatusFilter::Unverified => !u.email_verified,
        })
        .cloned()
        .collect()
}

pub fn filter_websites(websites: &[WebsiteRecord], query: &AdminQuery) -> Vec<WebsiteRecord> {
    let needle = query.search.to_lowercase();
    let template = query.template_filter();
    websites
        .iter()
        .filter(|w| contains(&w.name, &needle) || contains(&w.business_name, &needle))
        .filter(|w| template.map_or(true, |t| w.template == t))
        .cloned()
        .collect()
}

pub fn filter_messages(messages: &[ContactMessage], query: &AdminQuery) -> Vec<ContactMessage> {
    let needle = query.search.to_lowercase();
    messages
        .iter()
        .filter(|m| {
            contains(&m.email, &needle)
                || contains(&m.first_name, &needle)
                || contains(&m.last_name, &needle)
                || contains(&m.subject, &needle)
        })
        .cloned()
        .collect()
}

/// Website row as the dashboard shows it, with the template's display label.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteView {
    #[serde(flatten)]
    pub record: WebsiteRecord,
    pub template_name: &'static str,
}

impl From<WebsiteRecord> for WebsiteView {
    fn from(record: WebsiteRecord) -> Self {
        let template_name = templates::display_name_or_placeholder(&record.template);
        Self { record, template_name }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub websites_created: usize,
    pub contact_messages: usize,
    pub verified_users: usize,
}

impl DashboardStats {
    pub fn compute(users: &[UserRecord], websites: &[WebsiteRecord], messages: &[ContactMessage]) -> Self {
        Self {
            total_users: users.len(),
            websites_created: websites.len(),
            contact_messages: messages.len(),
            verified_users: users.iter().filter(|u| u.email_verified).count(),
        }
    }
}

// --- CSV export ---

pub trait CsvRecord {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: &Option<DateTime<Utc>>) -> String {
    value.map(|d| d.to_rfc3339()).unwrap_or_default()
}

impl CsvRecord for UserRecord {
    fn headers() -> &'static [&'static str] {
        &["id", "email", "firstName", "lastName", "phone", "address", "firebaseUid", "emailVerified", "createdAt"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.email.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            opt(&self.phone),
            opt(&self.address),
            self.firebase_uid.clone(),
            self.email_verified.to_string(),
            date(&self.created_at),
        ]
    }
}

impl CsvRecord for WebsiteRecord {
    fn headers() -> &'static [&'static str] {
        &["id", "userId", "name", "template", "description", "businessName", "contactEmail", "colorScheme", "previewUrl", "createdAt"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.user_id.map(|id| id.to_string()).unwrap_or_default(),
            self.name.clone(),
            self.template.clone(),
            self.description.clone(),
            self.business_name.clone(),
            opt(&self.contact_email),
            opt(&self.color_scheme),
            opt(&self.preview_url),
            date(&self.created_at),
        ]
    }
}

impl CsvRecord for ContactMessage {
    fn headers() -> &'static [&'static str] {
        &["id", "firstName", "lastName", "email", "subject", "message", "createdAt"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
            self.subject.clone(),
            self.message.clone(),
            date(&self.created_at),
        ]
    }
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// Header line plus one fully quoted line per row. No rows, no output.
pub fn to_csv<T: CsvRecord>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(T::headers().join(","));
    for row in rows {
        lines.push(row.cells().iter().map(|c| quote(c)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}
