//! Generation request draft: field updates and validation.
//!
//! Everything here is a pure transformation over in-memory state; the
//! orchestrator owns the draft and decides when it is submitted.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::WizardError, models::{GeneratePayload, SessionUser}, templates};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Professional,
    Modern,
    Vibrant,
    Elegant,
    Natural,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Professional => "professional",
            ColorScheme::Modern => "modern",
            ColorScheme::Vibrant => "vibrant",
            ColorScheme::Elegant => "elegant",
            ColorScheme::Natural => "natural",
        }
    }
}

impl FromStr for ColorScheme {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(ColorScheme::Professional),
            "modern" => Ok(ColorScheme::Modern),
            "vibrant" => Ok(ColorScheme::Vibrant),
            "elegant" => Ok(ColorScheme::Elegant),
            "natural" => Ok(ColorScheme::Natural),
            other => Err(WizardError::InvalidField {
                field: "colorScheme".into(),
                reason: format!("unknown color scheme {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub template_id: Option<String>,
    pub business_name: String,
    pub description: String,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub color_scheme: ColorScheme,
}

/// One typed form edit. Optional fields are cleared by an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    TemplateId(String),
    BusinessName(String),
    Description(String),
    ContactEmail(String),
    Phone(String),
    Address(String),
    ColorScheme(ColorScheme),
}

impl FieldUpdate {
    /// Maps a wire field name (`businessName`, `colorScheme`, ...) onto a typed update.
    pub fn parse(name: &str, value: &str) -> Result<Self, WizardError> {
        let update = match name {
            "templateId" | "template" => FieldUpdate::TemplateId(value.to_string()),
            "businessName" => FieldUpdate::BusinessName(value.to_string()),
            "description" => FieldUpdate::Description(value.to_string()),
            "contactEmail" => FieldUpdate::ContactEmail(value.to_string()),
            "phone" => FieldUpdate::Phone(value.to_string()),
            "address" => FieldUpdate::Address(value.to_string()),
            "colorScheme" => FieldUpdate::ColorScheme(value.parse()?),
            other => {
                return Err(WizardError::InvalidField {
                    field: other.to_string(),
                    reason: "unknown field".into(),
                })
            }
        };
        Ok(update)
    }
}

fn optional(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

/// Last write wins per field; the prior state is consumed.
pub fn update_field(mut request: GenerationRequest, update: FieldUpdate) -> GenerationRequest {
    match update {
        FieldUpdate::TemplateId(id) => request.template_id = optional(id),
        FieldUpdate::BusinessName(v) => request.business_name = v,
        FieldUpdate::Description(v) => request.description = v,
        FieldUpdate::ContactEmail(v) => request.contact_email = optional(v),
        FieldUpdate::Phone(v) => request.phone = optional(v),
        FieldUpdate::Address(v) => request.address = optional(v),
        FieldUpdate::ColorScheme(scheme) => request.color_scheme = scheme,
    }
    request
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RequiredField {
    TemplateId,
    BusinessName,
    Description,
}

impl RequiredField {
    pub fn wire_name(&self) -> &'static str {
        match self {
            RequiredField::TemplateId => "templateId",
            RequiredField::BusinessName => "businessName",
            RequiredField::Description => "description",
        }
    }

    pub fn join(fields: &[RequiredField]) -> String {
        fields.iter().map(|f| f.wire_name()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Ok,
    Failed { missing_fields: BTreeSet<RequiredField> },
}

impl ValidationResult {
    pub fn into_result(self) -> Result<(), WizardError> {
        match self {
            ValidationResult::Ok => Ok(()),
            ValidationResult::Failed { missing_fields } => Err(WizardError::Validation {
                missing: missing_fields.into_iter().collect(),
            }),
        }
    }
}

pub fn validate(request: &GenerationRequest) -> ValidationResult {
    let mut missing = BTreeSet::new();
    if request.template_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        missing.insert(RequiredField::TemplateId);
    }
    if request.business_name.trim().is_empty() {
        missing.insert(RequiredField::BusinessName);
    }
    if request.description.trim().is_empty() {
        missing.insert(RequiredField::Description);
    }
    if missing.is_empty() {
        ValidationResult::Ok
    } else {
        ValidationResult::Failed { missing_fields: missing }
    }
}

/// Builds the backend payload. Callers validate first; a missing template is still rejected here.
pub fn to_payload(request: &GenerationRequest, user: &SessionUser) -> Result<GeneratePayload, WizardError> {
    let template = request
        .template_id
        .clone()
        .ok_or(WizardError::Validation { missing: vec![RequiredField::TemplateId] })?;
    if templates::get(&template).is_none() {
        return Err(WizardError::UnknownTemplate(template));
    }
    let business_name = request.business_name.trim().to_string();
    Ok(GeneratePayload {
        template,
        name: format!("{business_name} Website"),
        business_name,
        description: request.description.trim().to_string(),
        contact_email: request.contact_email.clone().unwrap_or_default(),
        phone: request.phone.clone().unwrap_or_default(),
        address: request.address.clone().unwrap_or_default(),
        color_scheme: request.color_scheme.as_str().to_string(),
        user_id: user.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled() -> GenerationRequest {
        [
            FieldUpdate::TemplateId("business".into()),
            FieldUpdate::BusinessName("Acme".into()),
            FieldUpdate::Description("A shop".into()),
        ]
        .into_iter()
        .fold(GenerationRequest::default(), update_field)
    }

    fn user() -> SessionUser {
        SessionUser {
            id: 7,
            uid: "uid-7".into(),
            email: "owner@acme.test".into(),
            display_name: None,
            email_verified: true,
        }
    }

    #[test]
    fn last_write_wins() {
        let request = update_field(filled(), FieldUpdate::BusinessName("Acme Two".into()));
        assert_eq!(request.business_name, "Acme Two");
        assert_eq!(request.description, "A shop");
    }

    #[test]
    fn empty_optional_value_clears_field() {
        let request = update_field(filled(), FieldUpdate::Phone("555".into()));
        assert_eq!(request.phone.as_deref(), Some("555"));
        let request = update_field(request, FieldUpdate::Phone(String::new()));
        assert_eq!(request.phone, None);
    }

    #[test]
    fn wire_names_parse() {
        assert_eq!(
            FieldUpdate::parse("colorScheme", "Vibrant").expect("parse"),
            FieldUpdate::ColorScheme(ColorScheme::Vibrant)
        );
        assert!(matches!(
            FieldUpdate::parse("colorScheme", "neon"),
            Err(WizardError::InvalidField { .. })
        ));
        assert!(matches!(
            FieldUpdate::parse("favouriteColour", "x"),
            Err(WizardError::InvalidField { .. })
        ));
    }

    #[test]
    fn complete_request_validates() {
        assert_eq!(validate(&filled()), ValidationResult::Ok);
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let result = validate(&GenerationRequest::default());
        let expected: BTreeSet<_> = [
            RequiredField::TemplateId,
            RequiredField::BusinessName,
            RequiredField::Description,
        ]
        .into_iter()
        .collect();
        assert_eq!(result, ValidationResult::Failed { missing_fields: expected });
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let request = update_field(filled(), FieldUpdate::Description("   ".into()));
        let result = validate(&request);
        assert!(matches!(result, ValidationResult::Failed { .. }));
        assert_eq!(validate(&request), result);
    }

    #[test]
    fn payload_carries_user_and_derived_name() {
        let request = update_field(filled(), FieldUpdate::ColorScheme(ColorScheme::Elegant));
        let payload = to_payload(&request, &user()).expect("payload");
        assert_eq!(payload.template, "business");
        assert_eq!(payload.name, "Acme Website");
        assert_eq!(payload.user_id, 7);
        assert_eq!(payload.color_scheme, "elegant");
        assert_eq!(payload.contact_email, "");
    }

    #[test]
    fn payload_rejects_unknown_template() {
        let request = update_field(filled(), FieldUpdate::TemplateId("blog".into()));
        assert!(matches!(to_payload(&request, &user()), Err(WizardError::UnknownTemplate(_))));
    }
}
