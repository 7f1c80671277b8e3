use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Largest page the search connection will serve.
pub const MAX_PAGE_SIZE: usize = 100;

const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "TOKEN"];

/// Run configuration, read once at startup from `stats.toml` (optional) and the
/// environment, then handed to each component by reference.
#[derive(Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub token: Option<String>,
    pub endpoint: String,
    pub target_count: usize,
    pub page_size: usize,
    pub timeout_secs: u64,
    pub page_delay_ms: u64,
    pub detail_delay_ms: u64,
    pub artifact_path: PathBuf,
    pub report_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: "https://api.github.com/graphql".to_string(),
            target_count: 1000,
            page_size: MAX_PAGE_SIZE,
            timeout_secs: 30,
            page_delay_ms: 100,
            detail_delay_ms: 50,
            artifact_path: PathBuf::from("repo_metrics.csv"),
            report_path: PathBuf::from("report.md"),
        }
    }
}

impl Config {
    pub const FILE: &'static str = "stats.toml";

    pub fn load() -> Result<Self> {
        // a missing .env is fine, the token may come from the real environment
        let _ = dotenvy::dotenv();
        let config = match fs::read_to_string(Self::FILE) {
            Ok(contents) => Self::parse(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(err.into()),
        };
        let env_token = TOKEN_VARS.iter().find_map(|var| env::var(var).ok());
        Ok(config.with_env_token(env_token))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str::<Config>(contents)?)
    }

    /// The environment overrides a token from the config file.
    pub fn with_env_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
        self
    }

    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no GitHub token, set {} or `token` in {}",
                    TOKEN_VARS.join(" or "),
                    Self::FILE
                ))
            })
    }

    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}
