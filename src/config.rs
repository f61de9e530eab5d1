use anyhow::Result;

use crate::database::Database;
use crate::models::is_valid_date_format;

pub const API_URL_KEY: &str = "api_url";
pub const DATE_FORMAT_KEY: &str = "date_format";

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
// Month/day/year without padding, as en-US calendars show it.
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

pub const API_URL_ENV: &str = "TASKPAD_API_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub date_format: String,
}

impl Settings {
    /// Resolves settings: command-line flag, then environment, then the
    /// stored config, then the built-in default.
    pub fn load(db: &Database, api_url_flag: Option<&str>) -> Result<Self> {
        let env_api_url = std::env::var(API_URL_ENV).ok().filter(|v| !v.is_empty());
        let api_url = match (api_url_flag, env_api_url) {
            (Some(flag), _) => flag.to_string(),
            (None, Some(env)) => env,
            (None, None) => db
                .get_config(API_URL_KEY)?
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        };
        let date_format = match db.get_config(DATE_FORMAT_KEY)? {
            Some(format) if is_valid_date_format(&format) => format,
            Some(format) => {
                log::warn!("ignoring unusable date_format {:?}", format);
                DEFAULT_DATE_FORMAT.to_string()
            }
            None => DEFAULT_DATE_FORMAT.to_string(),
        };

        Ok(Settings {
            api_url,
            date_format,
        })
    }
}
