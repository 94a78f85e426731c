use crate::utils::error::{IntakeError, Result};
use crate::utils::logger::filter_directive;
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntakeConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub agreement: AgreementConfig,
    #[serde(default)]
    pub draft: DraftConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementConfig {
    #[serde(default = "default_agreement_version")]
    pub version: String,
    /// Distance from the end of the text that still counts as read.
    #[serde(default = "default_scroll_tolerance")]
    pub scroll_tolerance: f64,
    #[serde(default = "default_agreement_title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftConfig {
    pub directory: Option<PathBuf>,
    #[serde(default = "default_draft_key")]
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_min_query_len() -> usize {
    2
}

fn default_agreement_version() -> String {
    "v1".to_string()
}

fn default_scroll_tolerance() -> f64 {
    10.0
}

fn default_agreement_title() -> String {
    "Binding Mounting Agreement".to_string()
}

fn default_draft_key() -> String {
    "agreementData".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
        }
    }
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            version: default_agreement_version(),
            scroll_tolerance: default_scroll_tolerance(),
            title: default_agreement_title(),
        }
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            directory: None,
            key: default_draft_key(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl IntakeConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| IntakeError::Config {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| IntakeError::Config {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for IntakeConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_positive_number("api.timeout_seconds", self.api.timeout_seconds, 1)?;
        validate_positive_number("search.min_query_len", self.search.min_query_len as u64, 1)?;

        if !self.agreement.scroll_tolerance.is_finite() || self.agreement.scroll_tolerance < 0.0 {
            return Err(IntakeError::Config {
                field: "agreement.scroll_tolerance".to_string(),
                message: "Tolerance must be a non-negative number".to_string(),
            });
        }
        if self.agreement.version.trim().is_empty() {
            return Err(IntakeError::Config {
                field: "agreement.version".to_string(),
                message: "Agreement version cannot be empty".to_string(),
            });
        }
        if self.draft.key.trim().is_empty() {
            return Err(IntakeError::Config {
                field: "draft.key".to_string(),
                message: "Draft key cannot be empty".to_string(),
            });
        }
        filter_directive(&self.logging.level)?;
        Ok(())
    }
}
