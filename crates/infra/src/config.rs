//! Worker configuration loaded from environment variables.

use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

pub const ENV_PROMOTION_TAG_PREFIX: &str = "PROMOLINK_PROMOTION_TAG_PREFIX";
pub const ENV_PRODUCT_TAG_PREFIX: &str = "PROMOLINK_PRODUCT_TAG_PREFIX";
pub const ENV_CACHE_FAILURE: &str = "PROMOLINK_CACHE_FAILURE";
pub const ENV_SKIP_UNCHANGED: &str = "PROMOLINK_SKIP_UNCHANGED";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({expected})")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// What to do when the batched cache invalidation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheFailurePolicy {
    /// Log a warning and finish the job; stale entries expire on their own.
    #[default]
    Log,
    /// Fail the job so the host queue redelivers it.
    Fatal,
}

impl FromStr for CacheFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "fatal" => Ok(Self::Fatal),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_CACHE_FAILURE,
                value: s.to_string(),
                expected: "log | fatal",
            }),
        }
    }
}

/// Detach worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DetachConfig {
    /// Prefix of the promotion-level cache tag.
    pub promotion_tag_prefix: String,
    /// Prefix of per-product cache tags.
    pub product_tag_prefix: String,
    pub cache_failure: CacheFailurePolicy,
    /// Skip saving products that never referenced the promotion.
    pub skip_unchanged: bool,
}

impl Default for DetachConfig {
    fn default() -> Self {
        Self {
            promotion_tag_prefix: "promotion:".to_string(),
            product_tag_prefix: "product:".to_string(),
            cache_failure: CacheFailurePolicy::Log,
            skip_unchanged: false,
        }
    }
}

impl DetachConfig {
    /// Load from process environment, falling back to defaults on bad values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults on bad values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::try_from_lookup(&lookup).unwrap_or_else(|e| {
            warn!(error = %e, "invalid detach configuration; using defaults");
            Self::default()
        })
    }

    /// Strict variant of `from_lookup`: any unparseable value is an error.
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prefix) = lookup(ENV_PROMOTION_TAG_PREFIX) {
            config.promotion_tag_prefix = prefix;
        }
        if let Some(prefix) = lookup(ENV_PRODUCT_TAG_PREFIX) {
            config.product_tag_prefix = prefix;
        }
        if let Some(raw) = lookup(ENV_CACHE_FAILURE) {
            config.cache_failure = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_SKIP_UNCHANGED) {
            config.skip_unchanged = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_SKIP_UNCHANGED,
                value: raw.clone(),
                expected: "true | false",
            })?;
        }

        Ok(config)
    }

    pub fn with_cache_failure(mut self, policy: CacheFailurePolicy) -> Self {
        self.cache_failure = policy;
        self
    }

    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
