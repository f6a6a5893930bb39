//! Runtime configuration for the hybrid searcher.
//!
//! Layers, lowest precedence first:
//!
//! 1. [`HybridConfig::default`]
//! 2. a TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. `HYBRID_*` environment variables (a `.env` file is honoured)
//! 4. command-line flags, applied by the binary
//!
//! The resulting value is passed to the searcher at construction; nothing in
//! the request path reads the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::search::fusion::FusionWeights;
use crate::search::vector::DEFAULT_VECTOR_TIMEOUT;

pub const ENV_SEMANTIC_ENABLED: &str = "HYBRID_SEMANTIC_ENABLED";
pub const ENV_VECTOR_TIMEOUT_MS: &str = "HYBRID_VECTOR_TIMEOUT_MS";
pub const ENV_VECTOR_WEIGHT: &str = "HYBRID_VECTOR_WEIGHT";
pub const ENV_LEXICAL_WEIGHT: &str = "HYBRID_LEXICAL_WEIGHT";
pub const ENV_CANDIDATE_MULTIPLIER: &str = "HYBRID_CANDIDATE_MULTIPLIER";
pub const ENV_MAX_LIMIT: &str = "HYBRID_MAX_LIMIT";
pub const ENV_MAX_QUERY_CHARS: &str = "HYBRID_MAX_QUERY_CHARS";

/// Upper bound on `max_limit * candidate_multiplier`, the most candidates
/// either path is ever asked for.
pub const MAX_FETCH_LIMIT: usize = 10_000;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid fusion weights (vector={vector}, lexical={lexical}): weights must be finite, non-negative and not both zero")]
    InvalidWeights { vector: f32, lexical: f32 },

    #[error("vector timeout must be greater than zero")]
    ZeroTimeout,

    #[error("{0} must be at least 1")]
    ZeroValue(&'static str),

    #[error(
        "max_limit ({max_limit}) * candidate_multiplier ({multiplier}) exceeds {} candidates per path",
        MAX_FETCH_LIMIT
    )]
    FetchLimitTooLarge { max_limit: usize, multiplier: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridConfig {
    /// Whether the semantic path is attempted at all.
    pub semantic_enabled: bool,
    /// Budget for embedding plus vector lookup.
    pub vector_timeout: Duration,
    pub weights: FusionWeights,
    /// Each path fetches `limit * candidate_multiplier` before fusion.
    pub candidate_multiplier: usize,
    pub max_limit: usize,
    pub max_query_chars: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            semantic_enabled: false,
            vector_timeout: DEFAULT_VECTOR_TIMEOUT,
            weights: FusionWeights::default(),
            candidate_multiplier: 2,
            max_limit: 100,
            max_query_chars: 2048,
        }
    }
}

/// On-disk shape; every key is optional and overrides the layer below.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    semantic_enabled: Option<bool>,
    vector_timeout_ms: Option<u64>,
    vector_weight: Option<f32>,
    lexical_weight: Option<f32>,
    candidate_multiplier: Option<usize>,
    max_limit: Option<usize>,
    max_query_chars: Option<usize>,
}

impl HybridConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Full layering: defaults, then `path` (or the default config file if it
    /// exists), then the environment. Validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        match path {
            Some(path) => cfg.apply_file(path)?,
            None => {
                if let Some(default_path) = default_config_path()
                    && default_path.is_file()
                {
                    cfg.apply_file(&default_path)?;
                }
            }
        }

        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(enabled) = file.semantic_enabled {
            self.semantic_enabled = enabled;
        }
        if let Some(ms) = file.vector_timeout_ms {
            self.vector_timeout = Duration::from_millis(ms);
        }
        if let Some(weight) = file.vector_weight {
            self.weights.vector = weight;
        }
        if let Some(weight) = file.lexical_weight {
            self.weights.lexical = weight;
        }
        if let Some(multiplier) = file.candidate_multiplier {
            self.candidate_multiplier = multiplier;
        }
        if let Some(max) = file.max_limit {
            self.max_limit = max;
        }
        if let Some(max) = file.max_query_chars {
            self.max_query_chars = max;
        }

        debug!(path = %path.display(), "loaded config file");
        Ok(())
    }

    /// Override fields from `HYBRID_*` variables. Unparsable values are
    /// ignored with a warning.
    pub fn apply_env(&mut self) {
        if let Some(enabled) = env_parsed(ENV_SEMANTIC_ENABLED, parse_bool) {
            self.semantic_enabled = enabled;
        }

        if let Some(ms) = env_parsed(ENV_VECTOR_TIMEOUT_MS, |v| v.parse::<u64>().ok()) {
            self.vector_timeout = Duration::from_millis(ms);
        }

        if let Some(weight) = env_parsed(ENV_VECTOR_WEIGHT, |v| v.parse::<f32>().ok()) {
            self.weights.vector = weight;
        }

        if let Some(weight) = env_parsed(ENV_LEXICAL_WEIGHT, |v| v.parse::<f32>().ok()) {
            self.weights.lexical = weight;
        }

        if let Some(multiplier) = env_parsed(ENV_CANDIDATE_MULTIPLIER, |v| v.parse::<usize>().ok()) {
            self.candidate_multiplier = multiplier;
        }

        if let Some(max) = env_parsed(ENV_MAX_LIMIT, |v| v.parse::<usize>().ok()) {
            self.max_limit = max;
        }

        if let Some(max) = env_parsed(ENV_MAX_QUERY_CHARS, |v| v.parse::<usize>().ok()) {
            self.max_query_chars = max;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.weights.is_valid() {
            return Err(ConfigError::InvalidWeights {
                vector: self.weights.vector,
                lexical: self.weights.lexical,
            });
        }
        if self.vector_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.candidate_multiplier == 0 {
            return Err(ConfigError::ZeroValue("candidate_multiplier"));
        }
        if self.max_limit == 0 {
            return Err(ConfigError::ZeroValue("max_limit"));
        }
        if self.max_query_chars == 0 {
            return Err(ConfigError::ZeroValue("max_query_chars"));
        }
        if self
            .max_limit
            .checked_mul(self.candidate_multiplier)
            .is_none_or(|fetch| fetch > MAX_FETCH_LIMIT)
        {
            return Err(ConfigError::FetchLimitTooLarge {
                max_limit: self.max_limit,
                multiplier: self.candidate_multiplier,
            });
        }
        Ok(())
    }

    /// Per-path over-fetch for a request of `limit` results, capped at
    /// [`MAX_FETCH_LIMIT`].
    pub fn fetch_limit(&self, limit: usize) -> usize {
        limit
            .saturating_mul(self.candidate_multiplier.max(1))
            .min(MAX_FETCH_LIMIT)
    }
}

/// `<config_dir>/config.toml` for this application, if a home dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hybrid-retrieval", "hybrid-retrieval")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn env_parsed<T>(key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let val = dotenvy::var(key).ok()?;
    let parsed = parse(val.trim());
    if parsed.is_none() {
        warn!(key, value = %val, "ignoring unparsable environment override");
    }
    parsed
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
