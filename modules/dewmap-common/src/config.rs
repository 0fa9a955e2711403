use std::env;
use std::str::FromStr;

use tracing::info;

use crate::error::DewmapError;

/// Page sizes the moderation view offers.
pub const ADMIN_PAGE_SIZES: [u32; 3] = [25, 50, 100];

/// Upper bound the server enforces on `?limit=`.
pub const ADMIN_PAGE_SIZE_MAX: u32 = 200;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub http_timeout_secs: u64,

    // Admin
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            http_timeout_secs: 30,
            admin_username: None,
            admin_password: None,
            admin_page_size: ADMIN_PAGE_SIZES[0],
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, DewmapError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` is this over the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DewmapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("DEWMAP_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let http_timeout_secs =
            parse_or(&lookup, "DEWMAP_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?;

        let admin_page_size =
            parse_or(&lookup, "DEWMAP_ADMIN_PAGE_SIZE", defaults.admin_page_size)?;
        if admin_page_size == 0 || admin_page_size > ADMIN_PAGE_SIZE_MAX {
            return Err(DewmapError::Config(format!(
                "DEWMAP_ADMIN_PAGE_SIZE must be between 1 and {ADMIN_PAGE_SIZE_MAX}, got {admin_page_size}"
            )));
        }

        Ok(Self {
            api_base_url,
            http_timeout_secs,
            admin_username: lookup("DEWMAP_ADMIN_USERNAME").filter(|v| !v.is_empty()),
            admin_password: lookup("DEWMAP_ADMIN_PASSWORD").filter(|v| !v.is_empty()),
            admin_page_size,
        })
    }

    pub fn has_admin_credentials(&self) -> bool {
        self.admin_username.is_some() && self.admin_password.is_some()
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        let password = match self.admin_password {
            Some(_) => "<redacted>",
            None => "<unset>",
        };
        info!(
            api_base_url = self.api_base_url.as_str(),
            http_timeout_secs = self.http_timeout_secs,
            admin_username = self.admin_username.as_deref().unwrap_or("<unset>"),
            admin_password = password,
            admin_page_size = self.admin_page_size,
            "Loaded config"
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, DewmapError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|err| DewmapError::Config(format!("invalid {key}: {err}"))),
        _ => Ok(default),
    }
}
