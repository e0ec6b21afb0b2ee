//! TOML configuration of a run.
//!
//! Every field has a default, so an empty file (or none at all) reproduces the
//! reference sheet conventions with a 15-day window.
use crate::calibration::AlertSettings;
use crate::calibration::MatchRules;
use crate::calibration::DEFAULT_THRESHOLD_DAYS;
use crate::error::AlertError;
use crate::error::ResultMessage;
use glob::Pattern;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Subject used when the configuration names none.
pub const DEFAULT_SUBJECT: &str = "🔔 Alerta de calibraciones – Planta / VST2 / VST3";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No workbook source configured, set `source`, --source or EXCEL_URL")]
    MissingSource,

    #[error("Alert window must not be negative, got {0} days")]
    NegativeThreshold(i64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workbook path or URL
    pub source: Option<String>,
    /// Glob selecting the worksheet, first sheet when absent
    pub sheet: Option<String>,
    pub threshold_days: i64,
    pub rules: MatchRules,
    pub mail: MailSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: None,
            sheet: None,
            threshold_days: DEFAULT_THRESHOLD_DAYS,
            rules: MatchRules::default(),
            mail: MailSettings::default(),
        }
    }
}

/// Mail delivery settings. Credentials are never stored here, only the
/// names of the environment variables holding them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// From address, the SMTP username when absent
    pub sender: Option<String>,
    pub recipients: Vec<String>,
    pub subject: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username_env: String,
    pub password_env: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            sender: None,
            recipients: Vec::new(),
            subject: DEFAULT_SUBJECT.to_owned(),
            smtp_host: "smtp.gmail.com".to_owned(),
            smtp_port: 587,
            username_env: "SMTP_USER".to_owned(),
            password_env: "SMTP_PASS".to_owned(),
        }
    }
}

impl Config {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Config, AlertError> {
        let content = fs::read_to_string(path)
            .map_err(AlertError::from)
            .with_prefix(&format!("read config '{}'", path.display()))?;
        Self::parse(&content).with_prefix(&format!("parse config '{}'", path.display()))
    }

    pub fn parse(content: &str) -> Result<Config, AlertError> {
        Ok(toml::from_str(content)?)
    }

    /// The workbook source, or an error when none was configured.
    pub fn source(&self) -> Result<&str, AlertError> {
        match self.source.as_deref().map(str::trim) {
            Some(source) if !source.is_empty() => Ok(source),
            _ => Err(ConfigError::MissingSource.into()),
        }
    }

    /// Compiled worksheet pattern.
    pub fn sheet_pattern(&self) -> Result<Option<Pattern>, AlertError> {
        match &self.sheet {
            Some(sheet) => Ok(Some(Pattern::new(sheet)?)),
            None => Ok(None),
        }
    }

    /// Threshold and rules handed to the engine.
    pub fn alert_settings(&self) -> Result<AlertSettings, AlertError> {
        if self.threshold_days < 0 {
            return Err(ConfigError::NegativeThreshold(self.threshold_days).into());
        }
        Ok(AlertSettings {
            threshold_days: self.threshold_days,
            rules: self.rules.clone(),
        })
    }
}
