use serde::Serialize;

/// Label shown when a template id is not in the catalog.
pub const UNKNOWN_TEMPLATE_LABEL: &str = "Unknown Template";

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    pub popular: bool,
}

static TEMPLATES: [TemplateDescriptor; 5] = [
    TemplateDescriptor {
        id: "business",
        display_name: "Business Template",
        description: "Professional corporate websites with contact forms, service pages, and portfolio sections.",
        tags: &["Corporate", "Professional", "Services"],
        popular: true,
    },
    TemplateDescriptor {
        id: "minimalist",
        display_name: "Minimalist Template",
        description: "Clean, elegant designs perfect for portfolios, resumes, and personal websites.",
        tags: &["Clean", "Portfolio", "Resume"],
        popular: false,
    },
    TemplateDescriptor {
        id: "crypto",
        display_name: "Crypto Template",
        description: "Cryptocurrency platforms with calculators, policies, and trading interfaces.",
        tags: &["Crypto", "Calculator", "Trading"],
        popular: false,
    },
    TemplateDescriptor {
        id: "ecommerce",
        display_name: "E-commerce Template",
        description: "Full-featured online stores with product catalogs, shopping carts, and admin panels.",
        tags: &["Store", "Shopping", "Admin"],
        popular: false,
    },
    TemplateDescriptor {
        id: "chat",
        display_name: "Chat Template",
        description: "Real-time messaging platforms with user authentication and admin management.",
        tags: &["Messaging", "Real-time", "Social"],
        popular: false,
    },
];

pub fn list_templates() -> &'static [TemplateDescriptor] {
    &TEMPLATES
}

pub fn get(id: &str) -> Option<&'static TemplateDescriptor> {
    TEMPLATES.iter().find(|t| t.id == id)
}

pub fn display_name(id: &str) -> Option<&'static str> {
    get(id).map(|t| t.display_name)
}

pub fn display_name_or_placeholder(id: &str) -> &'static str {
    display_name(id).unwrap_or(UNKNOWN_TEMPLATE_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn listing_is_stable_across_calls() {
        let first: Vec<_> = list_templates().iter().map(|t| t.id).collect();
        let second: Vec<_> = list_templates().iter().map(|t| t.id).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["business", "minimalist", "crypto", "ecommerce", "chat"]);
    }

    #[test]
    fn display_names_resolve() {
        assert_eq!(display_name("crypto"), Some("Crypto Template"));
        assert_eq!(display_name("ecommerce"), Some("E-commerce Template"));
    }

    #[test]
    fn unknown_id_is_absent_and_falls_back() {
        assert_eq!(display_name("blog"), None);
        assert_eq!(display_name_or_placeholder("blog"), UNKNOWN_TEMPLATE_LABEL);
    }
}
