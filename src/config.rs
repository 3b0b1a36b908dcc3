use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PUSH_TTL: u32 = 3600;
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PARTICIPANT_DELIMITER: &str = "·";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    #[default]
    Badminton,
    Tennis,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub sport: Sport,
    pub push_ttl: u32,
    pub push_timeout: Duration,
    /// Separator between player names inside a team label.
    pub participant_delimiter: String,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            sport: Sport::Badminton,
            push_ttl: DEFAULT_PUSH_TTL,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
            participant_delimiter: DEFAULT_PARTICIPANT_DELIMITER.to_string(),
        }
    }
}

/// Optional settings file; every key may be overridden from the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub sport: Option<Sport>,
    pub push_ttl: Option<u32>,
    pub push_timeout_secs: Option<u64>,
    pub participant_delimiter: Option<String>,
    #[serde(default)]
    pub vapid: FileVapidConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileVapidConfig {
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub subject: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[source] toml::de::Error),
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::Parse)
    }
}
