//! Store configuration, fixed when the store is built.

use std::env;

/// Namespace used when neither the environment nor the executable name
/// yields one.
pub const FALLBACK_SERVICE: &str = "com.keysafe.defaultService";

/// Environment variable overriding the default service.
pub const DEFAULT_SERVICE_ENV: &str = "KEYSAFE_DEFAULT_SERVICE";

/// How an update reaches the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum UpdateStrategy {
    /// Delete whatever matches the record's identity, then create it anew.
    /// Previous metadata is discarded.
    #[default]
    Replace,
    /// Update the matching item in place and create it if nothing matched.
    /// Metadata the record does not specify is left as stored.
    InPlace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub default_service: String,
    pub update_strategy: UpdateStrategy,
}

impl Config {
    /// Resolve the default service from `KEYSAFE_DEFAULT_SERVICE`, then the
    /// running executable's name, then [`FALLBACK_SERVICE`].
    pub fn detect() -> Self {
        let default_service = env::var(DEFAULT_SERVICE_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(executable_service)
            .unwrap_or_else(|| FALLBACK_SERVICE.to_string());
        tracing::debug!(service = %default_service, "resolved default service");
        Self {
            default_service,
            update_strategy: UpdateStrategy::default(),
        }
    }

    pub fn with_default_service(mut self, service: impl Into<String>) -> Self {
        self.default_service = service.into();
        self
    }

    pub fn with_update_strategy(mut self, update_strategy: UpdateStrategy) -> Self {
        self.update_strategy = update_strategy;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_service: FALLBACK_SERVICE.to_string(),
            update_strategy: UpdateStrategy::default(),
        }
    }
}

fn executable_service() -> Option<String> {
    let exe = env::current_exe().ok()?;
    let stem = exe.file_stem()?.to_str()?;
    (!stem.is_empty()).then(|| format!("{stem}.keysafe"))
}
