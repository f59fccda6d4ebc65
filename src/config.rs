//! Process-wide configuration (§6 "Configuration"), loaded once at startup.
//!
//! Grounded on `inputlayer::config`: `figment` layering a base TOML file,
//! an optional local-override TOML file, and environment variables, into
//! one struct tree with `Default` impls for every nested config.

use crate::evaluators::FainderMode;
use crate::executor::ExecutorMode;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub evaluators: EvaluatorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query cache sizing (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_query_cache_size")]
    pub query_cache_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { query_cache_size: default_query_cache_size() }
    }
}

fn default_query_cache_size() -> usize {
    10_000
}

/// Which executor mode and worker-pool size to use absent an explicit
/// per-call override (§6 `default_executor_mode`, `worker_pool_size`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_executor_mode")]
    pub default_executor_mode: ExecutorMode,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            default_executor_mode: default_executor_mode(),
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

fn default_executor_mode() -> ExecutorMode {
    ExecutorMode::Prefilter
}

fn default_worker_pool_size() -> usize {
    4
}

/// Per-evaluator knobs (§6 `default_fainder_mode`, `keyword_max_results`,
/// `keyword_min_score`, plus the `max_column_name_neighbors` bound from
/// the resolved Open Question on `k`'s upper bound).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorsConfig {
    #[serde(default = "default_fainder_mode")]
    pub default_fainder_mode: FainderMode,
    #[serde(default = "default_keyword_max_results")]
    pub keyword_max_results: usize,
    #[serde(default = "default_keyword_min_score")]
    pub keyword_min_score: f64,
    #[serde(default = "default_max_column_name_neighbors")]
    pub max_column_name_neighbors: u32,
}

impl Default for EvaluatorsConfig {
    fn default() -> Self {
        EvaluatorsConfig {
            default_fainder_mode: default_fainder_mode(),
            keyword_max_results: default_keyword_max_results(),
            keyword_min_score: default_keyword_min_score(),
            max_column_name_neighbors: default_max_column_name_neighbors(),
        }
    }
}

fn default_fainder_mode() -> FainderMode {
    FainderMode::FullPrecision
}

fn default_keyword_max_results() -> usize {
    100
}

fn default_keyword_min_score() -> f64 {
    0.0
}

fn default_max_column_name_neighbors() -> u32 {
    256
}

/// Structured-logging configuration (ambient stack, carried per §B
/// regardless of any feature Non-goal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads `config.toml`, then `config.local.toml` if present, then
    /// `ENGINE_`-prefixed environment variables, each layer overriding the
    /// last.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("ENGINE_").split("__"))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new().merge(Toml::file(path)).merge(Env::prefixed("ENGINE_").split("__")).extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache: CacheConfig::default(),
            executor: ExecutorConfig::default(),
            evaluators: EvaluatorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
