use crate::error::StartupError;
use crate::mode::ServerMode;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the listening port.
pub const PORT_ENV_VAR: &str = "PORT";

/// Prefix for every other environment override, e.g. `SPA_SERVE__OUTPUT_DIR`.
pub const ENV_PREFIX: &str = "SPA_SERVE";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Serving mode, normally taken from `NODE_ENV`
    #[serde(default)]
    pub mode: ServerMode,

    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the built application
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Shell document, relative to `output_dir`
    #[serde(default = "default_entry_document")]
    pub entry_document: String,

    /// Document served with 404 when the shell cannot be sent
    #[serde(default = "default_not_found_document")]
    pub not_found_document: String,

    /// Paths under this prefix belong to the API router
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Program and arguments run when the entry document is missing
    #[serde(default = "default_build_command")]
    pub build_command: Vec<String>,

    /// Scheme for www redirects when no `X-Forwarded-Proto` is present
    #[serde(default = "default_canonical_scheme")]
    pub canonical_scheme: String,

    /// Upstream for development mode
    #[serde(default = "default_dev_server_url")]
    pub dev_server_url: String,

    /// Shut the process down after an unhandled request error
    #[serde(default)]
    pub fail_fast_on_request_error: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::default(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            output_dir: default_output_dir(),
            entry_document: default_entry_document(),
            not_found_document: default_not_found_document(),
            api_prefix: default_api_prefix(),
            build_command: default_build_command(),
            canonical_scheme: default_canonical_scheme(),
            dev_server_url: default_dev_server_url(),
            fail_fast_on_request_error: false,
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `spa-serve.toml`, `SPA_SERVE__*` variables,
    /// `NODE_ENV` and `PORT`.
    pub fn load() -> Result<Self, StartupError> {
        Self::load_with(
            None,
            ServerMode::from_env(),
            std::env::var(PORT_ENV_VAR).ok(),
        )
    }

    /// Same as [`ServerConfig::load`] with the file path, mode and port
    /// supplied by the caller.
    pub fn load_with(
        file: Option<&Path>,
        mode: ServerMode,
        port: Option<String>,
    ) -> Result<Self, StartupError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("spa-serve").required(false),
        };

        let builder = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("build_command")
                    .try_parsing(true),
            )
            .set_override("mode", mode.as_str())?
            .set_override_option("port", port)?;

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the router cannot work with.
    pub fn validate(&self) -> Result<(), StartupError> {
        if !self.api_prefix.starts_with('/') || self.api_prefix.trim_end_matches('/').is_empty() {
            return Err(StartupError::InvalidConfig(format!(
                "api_prefix must start with '/' and name a segment, got {:?}",
                self.api_prefix
            )));
        }
        for (field, name) in [
            ("entry_document", &self.entry_document),
            ("not_found_document", &self.not_found_document),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
                return Err(StartupError::InvalidConfig(format!(
                    "{field} must be a plain file name, got {name:?}"
                )));
            }
        }
        if self.build_command.is_empty() {
            return Err(StartupError::InvalidConfig(
                "build_command must name a program".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, StartupError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|err| StartupError::InvalidConfig(format!("invalid bind address: {err}")))
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API prefix without a trailing slash.
    pub fn normalized_api_prefix(&self) -> &str {
        self.api_prefix.trim_end_matches('/')
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist/public")
}

fn default_entry_document() -> String {
    "index.html".to_string()
}

fn default_not_found_document() -> String {
    "404.html".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_build_command() -> Vec<String> {
    ["npm", "run", "build"].map(String::from).to_vec()
}

fn default_canonical_scheme() -> String {
    "https".to_string()
}

fn default_dev_server_url() -> String {
    "http://127.0.0.1:5173".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.mode, ServerMode::Production);
        assert_eq!(cfg.entry_document, "index.html");
        assert_eq!(cfg.api_prefix, "/api");
        assert!(!cfg.fail_fast_on_request_error);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 5000);
        assert!(addr.ip().is_unspecified());
    }

    #[test]
    fn port_and_mode_overrides_win() {
        let cfg = ServerConfig::load_with(
            None,
            ServerMode::Development,
            Some("8123".to_string()),
        )
        .unwrap();
        assert_eq!(cfg.port, 8123);
        assert_eq!(cfg.mode, ServerMode::Development);
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let result = ServerConfig::load_with(None, ServerMode::Production, Some("http".into()));
        assert!(matches!(result, Err(StartupError::Config(_))));
    }

    #[test]
    fn file_values_are_read() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "output_dir = \"build\"\napi_prefix = \"/backend\"\nbuild_command = [\"make\", \"web\"]"
        )
        .unwrap();

        let cfg = ServerConfig::load_with(Some(file.path()), ServerMode::Production, None).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("build"));
        assert_eq!(cfg.api_prefix, "/backend");
        assert_eq!(cfg.build_command, vec!["make", "web"]);
        assert_eq!(cfg.port, 5000);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let cfg = ServerConfig {
            api_prefix: "api".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ServerConfig {
            entry_document: "../index.html".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ServerConfig {
            build_command: Vec::new(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn trailing_slash_on_prefix_is_ignored() {
        let cfg = ServerConfig {
            api_prefix: "/api/".into(),
            ..Default::default()
        };
        assert_eq!(cfg.normalized_api_prefix(), "/api");
    }
}
