//! Run configuration.
//!
//! Static settings (locations, field keys, fetch limits) live in a JSON file
//! at `<config_dir>/salesheet/config.json`, overridable with
//! `SALESHEET_CONFIG`. Secrets and the destination spreadsheet come from the
//! environment so the file can be committed without them. A minimal config:
//!
//! ```json
//! {
//!   "locations": [
//!     {"id": "ve9EPM428h8vShlRW1KT", "name": "Salem", "api_key_env": "HL_API_KEY_SALEM"}
//!   ]
//! }
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

pub const APP_NAME: &str = "salesheet";
const CONFIG_FILE: &str = "config.json";

/// Environment variable naming the config file path.
pub const ENV_CONFIG: &str = "SALESHEET_CONFIG";
/// Destination spreadsheet id (required).
pub const ENV_SPREADSHEET_ID: &str = "SALESHEET_SPREADSHEET_ID";
/// Google service-account key JSON, inline (required).
pub const ENV_SERVICE_ACCOUNT: &str = "GOOGLE_SERVICE_ACCOUNT";
/// Recency window override, in days.
pub const ENV_DAYS_BACK: &str = "SALESHEET_DAYS_BACK";
/// CRM key used for every location under the shared credential strategy.
pub const ENV_SHARED_API_KEY: &str = "SALESHEET_API_KEY";

const DEFAULT_DAYS_BACK: i64 = 60;

/// Largest accepted recency window, in days. Bounds the duration
/// arithmetic in `window_start`.
const MAX_DAYS_BACK: i64 = 3650;

fn default_sheet_tab() -> String {
    "Raw Data".to_string()
}

fn default_sale_tag() -> String {
    "sale".to_string()
}

fn default_days_back() -> i64 {
    DEFAULT_DAYS_BACK
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tab whose body rows this job owns. Row 1 (headers) is never touched.
    #[serde(default = "default_sheet_tab")]
    pub sheet_tab: String,
    /// Contacts must carry this tag (case-insensitive) to be exported.
    #[serde(default = "default_sale_tag")]
    pub sale_tag: String,
    /// Optional server-side search term forwarded to the listing endpoint.
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub credentials: CredentialStrategy,
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
    #[serde(default)]
    pub field_keys: FieldKeys,
    #[serde(default)]
    pub fetch: FetchLimits,
    #[serde(default = "default_days_back")]
    pub days_back: i64,

    // Populated from the environment by load(), never from the file.
    #[serde(skip)]
    pub spreadsheet_id: String,
    #[serde(skip)]
    pub service_account_json: String,
    #[serde(skip)]
    pub shared_api_key: Option<String>,
}

/// One CRM sub-account feeding the dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    pub id: String,
    /// Label written to the row's location column.
    pub name: String,
    /// Environment variable holding this location's API key
    /// (per-location strategy only).
    #[serde(default)]
    pub api_key_env: Option<String>,
}

/// How locations map to CRM credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialStrategy {
    /// Each location names its own key variable.
    #[default]
    PerLocation,
    /// One key covers every location.
    Shared,
}

/// Custom-field keys the dashboard columns resolve through.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldKeys {
    pub tour_team_member: String,
    pub sale_team_member: String,
    pub same_day_sale: String,
    pub day_one_booked: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            tour_team_member: "tour_team_member".to_string(),
            sale_team_member: "sale_team_member".to_string(),
            same_day_sale: "same_day_sale".to_string(),
            day_one_booked: "day_one_booked".to_string(),
        }
    }
}

/// Pagination guard rails, tunable per deployment.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FetchLimits {
    /// Unconditional cap on pages accepted per location.
    pub max_pages: u32,
    /// Already-seen contacts tolerated on one page before the fetch is
    /// treated as stalled.
    pub dup_threshold: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_pages: 500,
            dup_threshold: 50,
        }
    }
}

impl Config {
    /// Load configuration from disk and the environment, failing fast on
    /// anything that would make the run meaningless.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_json(&contents)?;

        config.spreadsheet_id = env::var(ENV_SPREADSHEET_ID)
            .with_context(|| format!("{} is not set", ENV_SPREADSHEET_ID))?;
        config.service_account_json = env::var(ENV_SERVICE_ACCOUNT)
            .with_context(|| format!("{} is not set", ENV_SERVICE_ACCOUNT))?;
        if let Ok(raw) = env::var(ENV_DAYS_BACK) {
            config.days_back = raw
                .parse()
                .with_context(|| format!("{} must be a whole number of days", ENV_DAYS_BACK))?;
        }
        if config.credentials == CredentialStrategy::Shared {
            config.shared_api_key = env::var(ENV_SHARED_API_KEY).ok().filter(|k| !k.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
    }

    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = env::var(ENV_CONFIG) {
            return Ok(PathBuf::from(path));
        }
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            bail!("{} is not set", ENV_SPREADSHEET_ID);
        }
        if self.service_account_json.trim().is_empty() {
            bail!("{} is not set", ENV_SERVICE_ACCOUNT);
        }
        if self.locations.is_empty() {
            bail!("No locations configured; nothing to fetch");
        }
        if !(1..=MAX_DAYS_BACK).contains(&self.days_back) {
            bail!("days_back must be between 1 and {}", MAX_DAYS_BACK);
        }
        if self.fetch.max_pages == 0 {
            bail!("fetch.max_pages must be at least 1");
        }
        if self.credentials == CredentialStrategy::Shared && self.shared_api_key.is_none() {
            bail!("{} is not set (shared credential strategy)", ENV_SHARED_API_KEY);
        }
        Ok(())
    }

    /// The credential covering one location, if any. Per-location keys are
    /// read from the environment at call time; a missing key is the caller's
    /// cue to skip the location.
    pub fn resolve_api_key(&self, location: &LocationConfig) -> Option<String> {
        match self.credentials {
            CredentialStrategy::Shared => self.shared_api_key.clone(),
            CredentialStrategy::PerLocation => location
                .api_key_env
                .as_deref()
                .and_then(|name| env::var(name).ok())
                .filter(|key| !key.is_empty()),
        }
    }

    /// Start of the recency window: contacts added on or after this instant
    /// are exported.
    pub fn window_start(&self) -> DateTime<Utc> {
        Utc::now() - Duration::days(self.days_back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secrets(mut config: Config) -> Config {
        config.spreadsheet_id = "sheet-id".to_string();
        config.service_account_json = "{}".to_string();
        config
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::from_json(
            r#"{"locations": [{"id": "loc1", "name": "Salem", "api_key_env": "HL_KEY_SALEM"}]}"#,
        )
        .expect("config should parse");

        assert_eq!(config.sheet_tab, "Raw Data");
        assert_eq!(config.sale_tag, "sale");
        assert_eq!(config.days_back, 60);
        assert_eq!(config.credentials, CredentialStrategy::PerLocation);
        assert_eq!(config.fetch.max_pages, 500);
        assert_eq!(config.fetch.dup_threshold, 50);
        assert_eq!(config.field_keys.sale_team_member, "sale_team_member");
        assert_eq!(config.locations.len(), 1);
    }

    #[test]
    fn test_full_config_overrides() {
        let config = Config::from_json(
            r#"{
                "sheet_tab": "Raw Data 2",
                "sale_tag": "closed-won",
                "search_query": "gym",
                "credentials": "shared",
                "days_back": 14,
                "fetch": {"max_pages": 20, "dup_threshold": 5},
                "field_keys": {"sale_team_member": "contact.sale_rep"},
                "locations": [
                    {"id": "a", "name": "Salem"},
                    {"id": "b", "name": "Keizer"}
                ]
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.sheet_tab, "Raw Data 2");
        assert_eq!(config.sale_tag, "closed-won");
        assert_eq!(config.search_query.as_deref(), Some("gym"));
        assert_eq!(config.credentials, CredentialStrategy::Shared);
        assert_eq!(config.days_back, 14);
        assert_eq!(config.fetch.max_pages, 20);
        assert_eq!(config.field_keys.sale_team_member, "contact.sale_rep");
        // Keys the file does not name keep their defaults.
        assert_eq!(config.field_keys.tour_team_member, "tour_team_member");
    }

    #[test]
    fn test_empty_locations_rejected() {
        let config = with_secrets(Config::from_json(r#"{"locations": []}"#).expect("should parse"));
        let err = config.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("No locations"));
    }

    #[test]
    fn test_shared_strategy_requires_key() {
        let mut config = with_secrets(
            Config::from_json(
                r#"{"credentials": "shared", "locations": [{"id": "a", "name": "Salem"}]}"#,
            )
            .expect("should parse"),
        );
        assert!(config.validate().is_err());

        config.shared_api_key = Some("pit-123".to_string());
        config.validate().expect("validation should pass");
    }

    #[test]
    fn test_shared_key_covers_every_location() {
        let mut config = with_secrets(
            Config::from_json(
                r#"{"credentials": "shared", "locations": [{"id": "a", "name": "Salem"}]}"#,
            )
            .expect("should parse"),
        );
        config.shared_api_key = Some("pit-123".to_string());
        assert_eq!(
            config.resolve_api_key(&config.locations[0]).as_deref(),
            Some("pit-123")
        );
    }

    #[test]
    fn test_per_location_without_env_name_resolves_none() {
        let config = with_secrets(
            Config::from_json(r#"{"locations": [{"id": "a", "name": "Salem"}]}"#)
                .expect("should parse"),
        );
        assert_eq!(config.resolve_api_key(&config.locations[0]), None);
    }

    #[test]
    fn test_nonpositive_days_back_rejected() {
        let config = with_secrets(
            Config::from_json(r#"{"days_back": 0, "locations": [{"id": "a", "name": "Salem"}]}"#)
                .expect("should parse"),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_days_back_rejected() {
        let config = with_secrets(
            Config::from_json(
                r#"{"days_back": 100000, "locations": [{"id": "a", "name": "Salem"}]}"#,
            )
            .expect("should parse"),
        );
        let err = config.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("days_back"));
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let config = with_secrets(
            Config::from_json(
                r#"{"fetch": {"max_pages": 0}, "locations": [{"id": "a", "name": "Salem"}]}"#,
            )
            .expect("should parse"),
        );
        let err = config.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("max_pages"));
    }
}
