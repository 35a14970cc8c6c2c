use std::sync::Arc;

use crate::noop_sink::NoopSink;
use crate::sink::CommitSink;

/// Supported commit endpoint kinds that can be selected via DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Noop,
}

/// Commit endpoint configuration built from a DSN.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Selected sink implementation.
    pub kind: BackendKind,
    /// Raw DSN that was used to construct this config.
    pub dsn: String,
    /// Bearer token for endpoints that need one.
    pub token: Option<String>,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, dsn: impl Into<String>) -> Self {
        BackendConfig {
            kind,
            dsn: dsn.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Parse a DSN string and infer the sink kind from its scheme.
///
/// Examples:
/// - "https://telemetry.local/arcs"
/// - "http://127.0.0.1:8080/arcs"
/// - "noop://"
pub fn parse_dsn(dsn: &str) -> Result<BackendConfig, DsnError> {
    let lower = dsn.trim().to_ascii_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(BackendConfig::new(BackendKind::Http, dsn.trim()))
    } else if lower.starts_with("noop://") {
        Ok(BackendConfig::new(BackendKind::Noop, dsn.trim()))
    } else {
        Err(DsnError::UnknownScheme(dsn.to_string()))
    }
}

/// Error type returned when parsing a DSN.
#[derive(thiserror::Error, Debug)]
pub enum DsnError {
    #[error("unknown or unsupported DSN scheme: {0}")]
    UnknownScheme(String),
}

/// Error type returned when building a sink from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error("http feature is not enabled")]
    HttpFeatureDisabled,
}

/// Create a concrete [`CommitSink`] from a [`BackendConfig`].
///
/// This is the main entry point for applications that select the commit
/// endpoint with a single DSN string instead of constructing sinks
/// manually.
pub fn make_sink_from_config(cfg: &BackendConfig) -> Result<Arc<dyn CommitSink>, BackendBuildError> {
    match cfg.kind {
        BackendKind::Http => {
            #[cfg(feature = "http")]
            {
                use crate::http::{HttpCommitConfig, HttpCommitSink};

                let mut config = HttpCommitConfig::new(cfg.dsn.clone());
                config.bearer_token = cfg.token.clone();
                Ok(Arc::new(HttpCommitSink::new(config)) as Arc<dyn CommitSink>)
            }

            #[cfg(not(feature = "http"))]
            {
                let _ = cfg;
                Err(BackendBuildError::HttpFeatureDisabled)
            }
        }
        BackendKind::Noop => Ok(Arc::new(NoopSink) as Arc<dyn CommitSink>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_selects_kind() {
        assert_eq!(parse_dsn("HTTPS://telemetry.local/arcs").unwrap().kind, BackendKind::Http);
        assert_eq!(parse_dsn(" http://127.0.0.1:8080/arcs ").unwrap().dsn, "http://127.0.0.1:8080/arcs");
        assert_eq!(parse_dsn("noop://").unwrap().kind, BackendKind::Noop);
        assert!(matches!(parse_dsn("kafka://broker/topic"), Err(DsnError::UnknownScheme(_))));
    }

    #[test]
    fn noop_builds_without_features() {
        let cfg = parse_dsn("noop://").unwrap();
        assert!(make_sink_from_config(&cfg).is_ok());
    }
}
