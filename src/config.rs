use clap::Args;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Result;

pub const DEFAULT_BASE_URL: &str = "https://api.apify.com/v2";
pub const DEFAULT_MAX_RETRIES: u32 = 8;
pub const DEFAULT_MIN_DELAY_BETWEEN_RETRIES_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 360;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Connection flags shared by every CLI command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Config file path
    #[arg(short, long, env = "APIFY_CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// API token, sent as the `token` query parameter
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Retries for network errors, 429 and 5xx responses
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,
}

/// Settings for [`crate::ApifyClient`].
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub max_retries: u32,
    pub min_delay_between_retries_ms: u64,
    pub timeout_secs: u64,
    /// Pause between status polls of a run that is still going.
    pub poll_interval_ms: u64,
    /// Query parameters added to every request.
    #[serde(default)]
    pub default_query: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay_between_retries_ms: DEFAULT_MIN_DELAY_BETWEEN_RETRIES_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_query: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Defaults pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_min_delay_between_retries_ms(mut self, ms: u64) -> Self {
        self.min_delay_between_retries_ms = ms;
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn with_default_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_query.insert(key.into(), value.into());
        self
    }

    /// Load from defaults, `APIFY_CONFIG_FILE` and `APIFY_*` variables.
    pub fn from_env() -> Result<Self> {
        let args = ConnectionArgs {
            config: std::env::var("APIFY_CONFIG_FILE").ok(),
            ..ConnectionArgs::default()
        };
        Self::load(&args)
    }

    /// Load configuration.
    ///
    /// Priority: CLI flag > `APIFY_*` env var > config file > defaults.
    /// Nested keys use `__`, e.g. `APIFY_DEFAULT_QUERY__CLIENT=cli`.
    pub fn load(args: &ConnectionArgs) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("max_retries", DEFAULT_MAX_RETRIES)?
            .set_default("min_delay_between_retries_ms", DEFAULT_MIN_DELAY_BETWEEN_RETRIES_MS)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("poll_interval_ms", DEFAULT_POLL_INTERVAL_MS)?;

        if let Some(path) = &args.config {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("APIFY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(base_url) = &args.base_url {
            builder = builder.set_override("base_url", base_url.as_str())?;
        }
        if let Some(token) = &args.token {
            builder = builder.set_override("token", token.as_str())?;
        }
        if let Some(max_retries) = args.max_retries {
            builder = builder.set_override("max_retries", max_retries)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_delay_between_retries(&self) -> Duration {
        Duration::from_millis(self.min_delay_between_retries_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Query pairs sent with every request: the token first, then `default_query`.
    pub fn default_query_pairs(&self) -> Vec<(String, String)> {
        self.token
            .iter()
            .map(|token| ("token".to_string(), token.clone()))
            .chain(
                self.default_query
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            )
            .collect()
    }
}
