use crate::env::{env_or, ARC_CONTEXT_URL_ENV};
use std::sync::{Arc, RwLock};

/// Source of the "current page" URL stamped into every arc's
/// `details._url`.
pub trait ContextLocation: Send + Sync {
    fn current_url(&self) -> String;
}

/// A location that only changes when the host application says so,
/// e.g. on navigation.
#[derive(Clone, Debug, Default)]
pub struct StaticLocation {
    url: Arc<RwLock<String>>,
}

impl StaticLocation {
    pub fn new(url: impl Into<String>) -> Self {
        StaticLocation {
            url: Arc::new(RwLock::new(url.into())),
        }
    }

    /// Replace the URL reported for subsequent arcs.
    pub fn set(&self, url: impl Into<String>) {
        match self.url.write() {
            Ok(mut guard) => *guard = url.into(),
            Err(poisoned) => *poisoned.into_inner() = url.into(),
        }
    }
}

impl ContextLocation for StaticLocation {
    fn current_url(&self) -> String {
        match self.url.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Reads `ARC_CONTEXT_URL` on every call; empty when unset.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvLocation;

impl ContextLocation for EnvLocation {
    fn current_url(&self) -> String {
        env_or(ARC_CONTEXT_URL_ENV, "")
    }
}
