use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bot::engine::EngineConfig;
use crate::bot::generator::GeneratorConfig;
use crate::bot::notify::RetryPolicy;
use crate::bot::repository::Limits;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Invalid regex pattern.
    InvalidRegex { pattern: String, source: regex::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::InvalidRegex { pattern, source } => {
                write!(f, "invalid regex pattern '{}': {}", pattern, source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Directory holding the JSON documents (tokens, bot_data, stats, ...).
    data_dir: Option<String>,
    /// Directory for bot_logs.log.
    log_dir: Option<String>,
    /// Append-only log of notifications that could not be delivered.
    error_log: Option<String>,
    /// Where attachments are downloaded before forwarding.
    temp_dir: Option<String>,
    #[serde(default = "default_retry_attempts")]
    retry_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    retry_delay_secs: u64,
    /// Chance of trying the Markov model before falling back to random words.
    #[serde(default = "default_markov_ratio")]
    markov_ratio: f64,
    #[serde(default = "default_max_corpus_words")]
    max_corpus_words: usize,
    #[serde(default = "default_max_media")]
    max_media: usize,
    /// Extra greeting/farewell patterns on top of the built-in list.
    #[serde(default)]
    boilerplate_patterns: Vec<String>,
    /// How many recent messages to remember for delete/edit notices.
    #[serde(default = "default_recent_messages")]
    recent_messages: usize,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_markov_ratio() -> f64 {
    0.5
}

fn default_max_corpus_words() -> usize {
    1000
}

fn default_max_media() -> usize {
    50
}

fn default_recent_messages() -> usize {
    1000
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_dir: None,
            error_log: None,
            temp_dir: None,
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            markov_ratio: default_markov_ratio(),
            max_corpus_words: default_max_corpus_words(),
            max_media: default_max_media(),
            boilerplate_patterns: Vec::new(),
            recent_messages: default_recent_messages(),
        }
    }
}

pub struct Config {
    /// Path the config was loaded from (may not exist).
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub error_log: PathBuf,
    pub temp_dir: Option<PathBuf>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub markov_ratio: f64,
    pub max_corpus_words: usize,
    pub max_media: usize,
    pub boilerplate_patterns: Vec<Regex>,
    pub recent_messages: usize,
}

impl Config {
    /// Load config from `path`. A missing file means "all defaults".
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let file = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?
        } else {
            ConfigFile::default()
        };
        Self::from_file(config_path, file)
    }

    fn from_file(config_path: PathBuf, file: ConfigFile) -> Result<Self, ConfigError> {
        if file.retry_attempts == 0 {
            return Err(ConfigError::Validation("retry_attempts must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&file.markov_ratio) {
            return Err(ConfigError::Validation("markov_ratio must be between 0 and 1".into()));
        }
        if file.max_corpus_words == 0 || file.max_media == 0 {
            return Err(ConfigError::Validation(
                "max_corpus_words and max_media must be positive".into(),
            ));
        }

        let boilerplate_patterns = file
            .boilerplate_patterns
            .into_iter()
            .map(|p| Regex::new(&p).map_err(|e| ConfigError::InvalidRegex { pattern: p, source: e }))
            .collect::<Result<Vec<_>, _>>()?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config"));
        let log_dir = file
            .log_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let error_log = file
            .error_log
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("error_log.txt"));

        Ok(Self {
            config_path,
            data_dir,
            log_dir,
            error_log,
            temp_dir: file.temp_dir.map(PathBuf::from),
            retry_attempts: file.retry_attempts,
            retry_delay: Duration::from_secs(file.retry_delay_secs),
            markov_ratio: file.markov_ratio,
            max_corpus_words: file.max_corpus_words,
            max_media: file.max_media,
            boilerplate_patterns,
            recent_messages: file.recent_messages,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_delay)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_corpus_words: self.max_corpus_words,
            max_media: self.max_media,
        }
    }

    pub fn generator(&self) -> GeneratorConfig {
        GeneratorConfig {
            markov_ratio: self.markov_ratio,
            ..GeneratorConfig::default()
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            generator: self.generator(),
            temp_dir: self.temp_dir.clone(),
        }
    }
}
