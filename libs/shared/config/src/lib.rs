use std::env;
use tracing::warn;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SENDGRID_BASE_URL: &str = "https://api.sendgrid.com/v3";
pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com/2010-04-01";
pub const DEFAULT_REMINDER_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_API_PORT: u16 = 3000;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub sendgrid_api_key: String,
    pub sendgrid_base_url: String,
    pub email_from: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_whatsapp_from: String,
    pub twilio_base_url: String,
    pub reminder_window_days: i64,
    pub api_port: u16,
}

fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn with_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using default", name);
        default.to_string()
    })
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} is not a valid value ({}), using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .unwrap_or_else(|_| {
                warn!("GEMINI_API_KEY not set, AI features will return placeholders");
                String::new()
            });

        let config = Self {
            supabase_url: required("SUPABASE_URL"),
            supabase_anon_key: required("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_service_role_key: required("SUPABASE_SERVICE_ROLE_KEY"),
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET"),
            gemini_api_key,
            gemini_base_url: with_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            gemini_model: with_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            sendgrid_api_key: required("SENDGRID_API_KEY"),
            sendgrid_base_url: with_default("SENDGRID_BASE_URL", DEFAULT_SENDGRID_BASE_URL),
            email_from: required("EMAIL_FROM"),
            twilio_account_sid: required("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: required("TWILIO_AUTH_TOKEN"),
            twilio_whatsapp_from: required("TWILIO_WHATSAPP_FROM"),
            twilio_base_url: with_default("TWILIO_BASE_URL", DEFAULT_TWILIO_BASE_URL),
            reminder_window_days: parsed_or("REMINDER_WINDOW_DAYS", DEFAULT_REMINDER_WINDOW_DAYS),
            api_port: parsed_or("API_PORT", DEFAULT_API_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.is_data_backend_configured() && !self.supabase_jwt_secret.is_empty()
    }

    /// Without a data backend the practice cell falls back to the in-memory repository.
    pub fn is_data_backend_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_ai_configured(&self) -> bool {
        !self.gemini_api_key.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.sendgrid_api_key.is_empty() && !self.email_from.is_empty()
    }

    pub fn is_whatsapp_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_whatsapp_from.is_empty()
    }

    pub fn is_reminder_source_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_role_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_unconfigured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert!(!config.is_data_backend_configured());
        assert!(!config.is_ai_configured());
        assert!(!config.is_email_configured());
        assert!(!config.is_whatsapp_configured());
    }

    #[test]
    fn test_data_backend_does_not_need_jwt_secret() {
        let config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_data_backend_configured());
        assert!(!config.is_configured());
    }

    #[test]
    fn test_whatsapp_requires_all_credentials() {
        let config = AppConfig {
            twilio_account_sid: "AC123".to_string(),
            twilio_auth_token: "token".to_string(),
            ..AppConfig::default()
        };
        assert!(!config.is_whatsapp_configured());
    }
}
