//! Development vs. production mode selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable that carries the mode flag.
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// How the server wires its request pipeline.
///
/// Decided once at startup and never changed afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Requests go to the live dev server.
    Development,
    /// Requests go to the built output root.
    #[default]
    Production,
}

impl ServerMode {
    /// Map a raw mode value to a mode. Only `development` selects
    /// development; anything else, including an absent value, is production.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("development") => ServerMode::Development,
            _ => ServerMode::Production,
        }
    }

    /// Read [`MODE_ENV_VAR`] from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }

    pub fn is_production(self) -> bool {
        self == ServerMode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerMode::Development => "development",
            ServerMode::Production => "production",
        }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
