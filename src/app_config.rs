//! Application configuration: TOML file defaults merged under CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use harvester_core::catalog::{DEFAULT_API_HOST, DEFAULT_PAGE_LIMIT};
use harvester_core::download::{
    CONNECT_TIMEOUT_SECS, ClientSettings, DEFAULT_MAX_ATTEMPTS, DEFAULT_PACING, Pacer,
    READ_TIMEOUT_SECS, RetryPolicy,
};
use serde::Deserialize;

const DEFAULT_ASSET_LIST: &str = "sibi_book_list.csv";
const DEFAULT_FAILURE_LIST: &str = "sibi_failures.csv";
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 2_000;
const DEFAULT_RETRY_MIN_DELAY_MS: u64 = 2_000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
const DEFAULT_RETRY_MULTIPLIER: f32 = 2.0;
const DEFAULT_SOURCE_LANG: &str = "id";
const DEFAULT_TARGET_LANG: &str = "en";

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Directory that receives `books/`, `audiobooks/` and relative tables.
    pub output_dir: Option<PathBuf>,
    /// Asset table path (relative paths resolve under `output_dir`).
    pub asset_list: Option<PathBuf>,
    /// Failure table path (relative paths resolve under `output_dir`).
    pub failure_list: Option<PathBuf>,
    /// Catalog API base URL.
    pub api_host: Option<String>,
    /// Page size requested per catalog query.
    pub page_limit: Option<u32>,
    /// Pause after each attempted entry, in seconds.
    pub pacing_secs: Option<u64>,
    /// Attempts per network call, including the first.
    pub max_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub retry_min_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
    pub retry_multiplier: Option<f32>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    /// User-Agent header for every request.
    pub user_agent: Option<String>,
    /// Translate titles (disable to record titles unchanged).
    pub translate: Option<bool>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("page_limit", self.page_limit, 1..=10_000)?;
        validate_range("pacing_secs", self.pacing_secs, 0..=3_600)?;
        validate_range("max_attempts", self.max_attempts, 1..=10)?;
        validate_range("retry_base_delay_ms", self.retry_base_delay_ms, 0..=600_000)?;
        validate_range("retry_min_delay_ms", self.retry_min_delay_ms, 0..=600_000)?;
        validate_range("retry_max_delay_ms", self.retry_max_delay_ms, 0..=600_000)?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1..=3_600)?;
        validate_range("read_timeout_secs", self.read_timeout_secs, 1..=3_600)?;

        if let (Some(min), Some(max)) = (self.retry_min_delay_ms, self.retry_max_delay_ms)
            && min > max
        {
            bail!(
                "Invalid config values: `retry_min_delay_ms` ({min}) exceeds `retry_max_delay_ms` ({max})"
            );
        }

        if let Some(multiplier) = self.retry_multiplier
            && !(multiplier.is_finite() && (1.0..=10.0).contains(&multiplier))
        {
            bail!(
                "Invalid config value for `retry_multiplier`: {multiplier}. Expected range: 1.0..=10.0"
            );
        }

        if let Some(api_host) = &self.api_host {
            let parsed = url::Url::parse(api_host)
                .with_context(|| format!("Invalid config value for `api_host`: {api_host}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Invalid config value for `api_host`: {api_host}. Expected an http(s) URL");
            }
        }

        if let Some(user_agent) = &self.user_agent
            && (user_agent.trim().is_empty() || user_agent.chars().any(char::is_control))
        {
            bail!("Invalid config value for `user_agent`: must be non-empty printable text");
        }

        for (field, value) in [
            ("source_lang", &self.source_lang),
            ("target_lang", &self.target_lang),
        ] {
            if let Some(lang) = value
                && (lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-'))
            {
                bail!("Invalid config value for `{field}`: {lang:?}. Expected a language code");
            }
        }

        Ok(())
    }
}

fn validate_range<T>(field: &str, value: Option<T>, range: std::ops::RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `explicit`, or at the default path if present.
///
/// An explicit path must exist; a missing default file means no file config.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }

    match resolve_default_config_path() {
        Some(path) if path.is_file() => read_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    pub output_dir: PathBuf,
    pub asset_list: PathBuf,
    pub failure_list: PathBuf,
    pub api_host: String,
    pub page_limit: u32,
    pub pacing: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_min_delay: Duration,
    pub retry_max_delay: Duration,
    pub retry_multiplier: f32,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
    pub translate: bool,
    pub source_lang: String,
    pub target_lang: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            asset_list: PathBuf::from(DEFAULT_ASSET_LIST),
            failure_list: PathBuf::from(DEFAULT_FAILURE_LIST),
            api_host: DEFAULT_API_HOST.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            pacing: DEFAULT_PACING,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            retry_min_delay: Duration::from_millis(DEFAULT_RETRY_MIN_DELAY_MS),
            retry_max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            retry_multiplier: DEFAULT_RETRY_MULTIPLIER,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: ClientSettings::default().user_agent,
            translate: true,
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
        }
    }
}

impl HarvestConfig {
    /// Built-in defaults overlaid with any values from `file`.
    #[must_use]
    pub fn from_file(file: Option<&FileConfig>) -> Self {
        let mut config = Self::default();
        let Some(file) = file else {
            return config;
        };

        if let Some(output_dir) = &file.output_dir {
            config.output_dir.clone_from(output_dir);
        }
        if let Some(asset_list) = &file.asset_list {
            config.asset_list.clone_from(asset_list);
        }
        if let Some(failure_list) = &file.failure_list {
            config.failure_list.clone_from(failure_list);
        }
        if let Some(api_host) = &file.api_host {
            config.api_host.clone_from(api_host);
        }
        if let Some(user_agent) = &file.user_agent {
            config.user_agent.clone_from(user_agent);
        }
        if let Some(source_lang) = &file.source_lang {
            config.source_lang.clone_from(source_lang);
        }
        if let Some(target_lang) = &file.target_lang {
            config.target_lang.clone_from(target_lang);
        }
        config.page_limit = file.page_limit.unwrap_or(config.page_limit);
        config.pacing = file.pacing_secs.map_or(config.pacing, Duration::from_secs);
        config.max_attempts = file.max_attempts.unwrap_or(config.max_attempts);
        config.retry_base_delay = file
            .retry_base_delay_ms
            .map_or(config.retry_base_delay, Duration::from_millis);
        config.retry_min_delay = file
            .retry_min_delay_ms
            .map_or(config.retry_min_delay, Duration::from_millis);
        config.retry_max_delay = file
            .retry_max_delay_ms
            .map_or(config.retry_max_delay, Duration::from_millis);
        config.retry_multiplier = file.retry_multiplier.unwrap_or(config.retry_multiplier);
        config.connect_timeout = file
            .connect_timeout_secs
            .map_or(config.connect_timeout, Duration::from_secs);
        config.read_timeout = file
            .read_timeout_secs
            .map_or(config.read_timeout, Duration::from_secs);
        config.translate = file.translate.unwrap_or(config.translate);
        config
    }

    /// Asset table location; relative paths resolve under the output dir.
    #[must_use]
    pub fn asset_path(&self) -> PathBuf {
        self.output_dir.join(&self.asset_list)
    }

    /// Failure table location; relative paths resolve under the output dir.
    #[must_use]
    pub fn failure_path(&self) -> PathBuf {
        self.output_dir.join(&self.failure_list)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.retry_base_delay,
            self.retry_min_delay,
            self.retry_max_delay,
            self.retry_multiplier,
        )
    }

    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            user_agent: self.user_agent.clone(),
        }
    }

    #[must_use]
    pub fn pacer(&self) -> Pacer {
        Pacer::new(self.pacing)
    }
}
