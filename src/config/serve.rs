//! `[serve]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[serve]` section in vizbuilder.toml - development server settings.
///
/// # Example
/// ```toml
/// [serve]
/// interface = "0.0.0.0"  # Listen on all interfaces
/// port = 3000
/// grace_ms = 500         # drain period before exit/reload
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    #[serde(default = "defaults::serve::interface")]
    #[educe(Default = defaults::serve::interface())]
    pub interface: String,

    /// HTTP port number (default: 3456).
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,

    /// Milliseconds to let in-flight requests finish after an interrupt.
    #[serde(default = "defaults::serve::grace_ms")]
    #[educe(Default = defaults::serve::grace_ms())]
    pub grace_ms: u64,
}

impl ServeConfig {
    pub const fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::super::ProjectConfig;

    #[test]
    fn test_serve_config() {
        let config = r#"
            [serve]
            interface = "0.0.0.0"
            port = 8080
            grace_ms = 1000
        "#;
        let config: ProjectConfig = toml::from_str(config).unwrap();

        assert_eq!(config.serve.interface, "0.0.0.0");
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.grace().as_millis(), 1000);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config: ProjectConfig = toml::from_str("").unwrap();

        assert_eq!(config.serve.interface, "127.0.0.1");
        assert_eq!(config.serve.port, 3456);
        assert_eq!(config.serve.grace_ms, 250);
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [serve]
            unknown_field = "should_fail"
        "#;
        let result: Result<ProjectConfig, _> = toml::from_str(config);

        assert!(result.is_err());
    }

    #[test]
    fn test_serve_config_partial_override() {
        let config = r#"
            [serve]
            port = 3000
        "#;
        let config: ProjectConfig = toml::from_str(config).unwrap();

        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.interface, "127.0.0.1");
    }
}
