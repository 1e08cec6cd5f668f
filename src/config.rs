use std::time::Duration;

use reqwest::Url;

use crate::error::WizardError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_FIREBASE_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@nazcraft.com";

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub backend_url: Url,
    /// `None` runs the in-memory demo identity provider.
    pub firebase_api_key: Option<String>,
    pub firebase_api_base: String,
    pub admin_email: String,
    pub progress_interval: Duration,
    pub backend_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, WizardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so tests don't have to touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WizardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT);

        let raw_backend = lookup("BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url = Url::parse(&raw_backend)
            .map_err(|e| WizardError::Config(format!("BACKEND_URL {raw_backend:?}: {e}")))?;

        let firebase_api_key = lookup("FIREBASE_API_KEY").filter(|v| !v.trim().is_empty());
        let firebase_api_base = lookup("FIREBASE_API_BASE")
            .unwrap_or_else(|| DEFAULT_FIREBASE_API_BASE.to_string());
        let admin_email = lookup("ADMIN_EMAIL")
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string());

        let progress_interval = lookup("PROGRESS_INTERVAL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(1));
        let backend_timeout = lookup("BACKEND_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        Ok(Self {
            port,
            backend_url,
            firebase_api_key,
            firebase_api_base,
            admin_email,
            progress_interval,
            backend_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, WizardError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let settings = settings_from(&[]).expect("settings");
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.backend_url.as_str(), "http://localhost:5000/");
        assert!(settings.firebase_api_key.is_none());
        assert_eq!(settings.admin_email, DEFAULT_ADMIN_EMAIL);
        assert_eq!(settings.progress_interval, Duration::from_secs(1));
    }

    #[test]
    fn overrides_are_read_and_normalized() {
        let settings = settings_from(&[
            ("PORT", "9090"),
            ("BACKEND_URL", "https://api.example.com"),
            ("FIREBASE_API_KEY", "abc"),
            ("ADMIN_EMAIL", " Boss@Example.com "),
            ("PROGRESS_INTERVAL_MS", "250"),
        ])
        .expect("settings");
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.backend_url.host_str(), Some("api.example.com"));
        assert_eq!(settings.firebase_api_key.as_deref(), Some("abc"));
        assert_eq!(settings.admin_email, "boss@example.com");
        assert_eq!(settings.progress_interval, Duration::from_millis(250));
    }

    #[test]
    fn blank_firebase_key_means_demo_mode() {
        let settings = settings_from(&[("FIREBASE_API_KEY", "  ")]).expect("settings");
        assert!(settings.firebase_api_key.is_none());
    }

    #[test]
    fn invalid_backend_url_is_rejected() {
        let err = settings_from(&[("BACKEND_URL", "not a url")]).expect_err("should fail");
        assert!(matches!(err, WizardError::Config(_)));
    }

    #[test]
    fn garbage_numbers_fall_back_to_defaults() {
        let settings = settings_from(&[("PORT", "eighty"), ("PROGRESS_INTERVAL_MS", "0")])
            .expect("settings");
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.progress_interval, Duration::from_secs(1));
    }
}
