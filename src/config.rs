use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::providers::github::RunStatus;

/// Configuration file structure for runcost.
///
/// Holds the settings a scheduled collection job would otherwise repeat on
/// every command line. Command-line flags override every value here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// Page size for list endpoints (1..=100)
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Repositories fetched concurrently
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    #[serde(default)]
    pub status: RunStatus,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File listing one `owner/name` per line
    pub repos_file: Option<PathBuf>,

    #[serde(default = "default_pause_every")]
    pub pause_every: usize,

    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,

    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Remaining-quota floor below which requests wait for the reset
    #[serde(default = "default_min_remaining")]
    pub min_remaining: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
            per_page: default_per_page(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            status: RunStatus::default(),
            output_dir: default_output_dir(),
            repos_file: None,
            pause_every: default_pause_every(),
            pause_secs: default_pause_secs(),
            progress_every: default_progress_every(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            min_remaining: default_min_remaining(),
        }
    }
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> usize {
    100
}

fn default_parallel() -> usize {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_pause_every() -> usize {
    10
}

fn default_pause_secs() -> u64 {
    1
}

fn default_progress_every() -> usize {
    25
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_min_remaining() -> u64 {
    50
}

const CANDIDATES: [&str; 4] = ["runcost.toml", "runcost.json", "runcost.yaml", "runcost.yml"];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./runcost.toml, ./runcost.json, ./runcost.yaml, ./runcost.yml
    /// 3. `<config dir>/runcost/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let user_config = dirs::config_dir().map(|dir| dir.join("runcost").join("config.toml"));
        Self::load_from_candidates(Path::new("."), user_config.as_deref())
    }

    fn load_from_candidates(dir: &Path, user_config: Option<&Path>) -> Result<Self> {
        let found = CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.exists())
            .or_else(|| user_config.filter(|path| path.exists()).map(Path::to_path_buf));

        match found {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        log::debug!("Loading configuration from {}", path.display());

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.fetch.parallel == 0 {
            bail!("fetch.parallel must be at least 1");
        }
        if !(1..=100).contains(&self.github.per_page) {
            bail!(
                "github.per-page must be between 1 and 100, got {}",
                self.github.per_page
            );
        }
        Ok(())
    }
}
