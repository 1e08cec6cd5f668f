use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    backend::WebsiteBackend,
    error::WizardError,
    models::Notification,
};

pub const DEFAULT_SUBJECT: &str = "General Inquiry";

pub const SUBJECTS: [&str; 5] = [
    "General Inquiry",
    "Technical Support",
    "Billing Question",
    "Feature Request",
    "Partnership",
];

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), WizardError> {
        let required = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("message", &self.message),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(WizardError::InvalidField { field: field.to_string(), reason: "required".into() });
        }
        if !self.email.contains('@') {
            return Err(WizardError::InvalidField { field: "email".into(), reason: "not an email address".into() });
        }
        if !SUBJECTS.contains(&self.subject.as_str()) {
            return Err(WizardError::InvalidField {
                field: "subject".into(),
                reason: format!("unknown subject {:?}", self.subject),
            });
        }
        Ok(())
    }
}

/// Forwards the form; the returned notification is what the visitor sees either way.
pub async fn send_message(backend: &dyn WebsiteBackend, form: &ContactForm) -> Result<Notification, WizardError> {
    form.validate()?;
    match backend.submit_contact(form).await {
        Ok(()) => {
            info!("✉️ Contact message from {} sent ({})", form.email, form.subject);
            Ok(Notification::info("Message Sent!", "We'll get back to you as soon as possible."))
        }
        Err(e) => {
            error!("❌ Contact message failed: {}", e);
            Ok(Notification::destructive(
                "Failed to Send",
                "There was an error sending your message. Please try again.",
            ))
        }
    }
}
