use chrono::{FixedOffset, Offset, Utc};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub storage_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub app_url: String,
    pub conference_name: String,
    pub timezone: FixedOffset,
    pub session_ttl_hours: i64,
    pub whatsapp: WhatsAppConfig,
    pub mail_from_address: String,
    pub mail_from_name: String,
}

/// Settings for the outbound WhatsApp gateway.
#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub manual_mode: bool,
    pub country_code: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://confdesk.db?mode=rwc".to_string());

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let storage_folder = base_dir.join(
            std::env::var("STORAGE_FOLDER").unwrap_or_else(|_| "storage/public".to_string()),
        );

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_var("PORT", "5001", "u16 port")?;
        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

        let offset_hours: i32 = parse_var("TIMEZONE_OFFSET_HOURS", "7", "hour offset")?;
        let timezone = FixedOffset::east_opt(offset_hours * 3600).ok_or(ConfigError::Invalid {
            name: "TIMEZONE_OFFSET_HOURS",
            expected: "hour offset between -23 and 23",
        })?;
        let session_ttl_hours: i64 = parse_var("SESSION_TTL_HOURS", "168", "number of hours")?;

        let conference_name = std::env::var("CONFERENCE_NAME")
            .unwrap_or_else(|_| "PIT IAGI-GEOSEA 2026".to_string());

        let whatsapp = WhatsAppConfig {
            api_key: std::env::var("FLOWKIRIM_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: std::env::var("WHATSAPP_BASE_URL")
                .unwrap_or_else(|_| "https://api.flowkirim.com".to_string()),
            manual_mode: std::env::var("WHATSAPP_MANUAL_MODE")
                .map(|value| parse_flag(&value))
                .unwrap_or(true),
            country_code: std::env::var("WHATSAPP_COUNTRY_CODE")
                .unwrap_or_else(|_| "62".to_string()),
        };

        let mail_from_address = std::env::var("MAIL_FROM_ADDRESS")
            .unwrap_or_else(|_| "no-reply@iagi-geosea2026.org".to_string());
        let mail_from_name =
            std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| conference_name.clone());

        Ok(Self {
            database_url,
            storage_folder,
            host,
            port,
            app_url,
            conference_name,
            timezone,
            session_ttl_hours,
            whatsapp,
            mail_from_address,
            mail_from_name,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let conference_name = "PIT IAGI-GEOSEA 2026".to_string();
        Self {
            database_url: "sqlite://confdesk.db?mode=rwc".to_string(),
            storage_folder: PathBuf::from("storage/public"),
            host: "0.0.0.0".to_string(),
            port: 5001,
            app_url: "http://localhost:5001".to_string(),
            timezone: FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix()),
            session_ttl_hours: 168,
            whatsapp: WhatsAppConfig {
                api_key: None,
                base_url: "https://api.flowkirim.com".to_string(),
                manual_mode: true,
                country_code: "62".to_string(),
            },
            mail_from_address: "no-reply@iagi-geosea2026.org".to_string(),
            mail_from_name: conference_name.clone(),
            conference_name,
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, expected })
}

/// Reads boolean-ish environment values the way `.env` files usually spell them.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
