use crate::backend::{make_sink_from_config, parse_dsn, BackendBuildError, DsnError};
use crate::context::EnvLocation;
use crate::env::{
    env_opt, ARC_COMMIT_DSN_ENV, ARC_COMMIT_TOKEN_ENV, ARC_DEBOUNCE_MS_ENV, ARC_MAX_BATCH_AGE_MS_ENV,
    ARC_MAX_BATCH_SIZE_ENV, ARC_STDOUT_ENV,
};
use crate::layer::ArcLayer;
use crate::logger::{self, ArcLogger};
use crate::normalize::Normalizer;
use crate::queue::QueueConfig;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Logger configuration.
///
/// **Fields**
/// - `commit_dsn`: where batches go, see [`parse_dsn`].
/// - `commit_token`: optional bearer token for the commit endpoint.
/// - `queue`: debounce interval and optional batch caps.
/// - `layer_level`: least severe `tracing` level forwarded as an arc.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to [`ArcLayer`] and events are also printed.
#[derive(Clone, Debug)]
pub struct ArcConfig {
    pub commit_dsn: String,
    pub commit_token: Option<String>,
    pub queue: QueueConfig,
    pub layer_level: Level,
    pub enable_stdout: bool,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            commit_dsn: "noop://".to_string(),
            commit_token: None,
            queue: QueueConfig::default(),
            layer_level: Level::WARN,
            enable_stdout: true,
        }
    }
}

impl ArcConfig {
    /// Defaults overridden by whichever `ARC_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_opt)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ArcConfig::default();

        if let Some(dsn) = lookup(ARC_COMMIT_DSN_ENV) {
            config.commit_dsn = dsn;
        }
        config.commit_token = lookup(ARC_COMMIT_TOKEN_ENV);
        if let Some(ms) = lookup(ARC_DEBOUNCE_MS_ENV) {
            config.queue.debounce = Duration::from_millis(parse_number(ARC_DEBOUNCE_MS_ENV, &ms)?);
        }
        if let Some(size) = lookup(ARC_MAX_BATCH_SIZE_ENV) {
            config.queue.max_batch_size = Some(parse_number(ARC_MAX_BATCH_SIZE_ENV, &size)? as usize);
        }
        if let Some(ms) = lookup(ARC_MAX_BATCH_AGE_MS_ENV) {
            config.queue.max_batch_age = Some(Duration::from_millis(parse_number(ARC_MAX_BATCH_AGE_MS_ENV, &ms)?));
        }
        if let Some(flag) = lookup(ARC_STDOUT_ENV) {
            config.enable_stdout = parse_flag(ARC_STDOUT_ENV, &flag)?;
        }

        Ok(config)
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}

/// Invalid `ARC_*` environment value.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be true or false, got {value:?}")]
    InvalidFlag { key: &'static str, value: String },
}

/// Error type returned by the initialization helpers.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dsn(#[from] DsnError),

    #[error(transparent)]
    Backend(#[from] BackendBuildError),

    #[error("global tracing subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("global arc logger already set")]
    LoggerAlreadySet,
}

/// Install `logger` as the global arc logger and a global `tracing`
/// subscriber forwarding events through [`ArcLayer`].
///
/// **Parameters**
/// - `logger`: the [`ArcLogger`] receiving both direct calls and
///   forwarded `tracing` events.
/// - `config`: only `layer_level` and `enable_stdout` are read here.
///
/// **Effects**
///
/// This installs a [`Registry`] combined with [`ArcLayer`] as the global
/// default subscriber, so every `tracing` event at or above
/// `layer_level` in the process also becomes an arc.
pub fn init_tracing_with_config(logger: ArcLogger, config: &ArcConfig) -> Result<(), InitError> {
    let layer = ArcLayer::new(logger.clone(), config.layer_level);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    logger::set_global(logger).map_err(|_| InitError::LoggerAlreadySet)
}

/// Equivalent to [`init_tracing_with_config`] with [`ArcConfig::default`].
pub fn init_tracing(logger: ArcLogger) -> Result<(), InitError> {
    init_tracing_with_config(logger, &ArcConfig::default())
}

/// Build a logger entirely from `ARC_*` environment variables, install
/// it globally and return a handle to it.
///
/// Must be called from within a Tokio runtime. The page URL is read from
/// `ARC_CONTEXT_URL` for every arc.
pub fn init_from_env() -> Result<ArcLogger, InitError> {
    let config = ArcConfig::from_env()?;
    let backend = parse_dsn(&config.commit_dsn)?.with_token(config.commit_token.clone());
    let sink = make_sink_from_config(&backend)?;

    let (logger, _handle) = ArcLogger::spawn(sink, Normalizer::new(Arc::new(EnvLocation)), config.queue.clone());
    init_tracing_with_config(logger.clone(), &config)?;
    Ok(logger)
}
