//! Load and validate runtime settings (`compose.toml`).
use std::{
    env,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::error;

use crate::{compose::MountOptions, lib::errors::ConfigError};

pub mod mount;
pub mod server;
pub mod telemetry;

pub use mount::{parse_mount_section, RawMountSection};
pub use server::{
    parse_server_section, RawServerSection, ServerSection, DEFAULT_HOST, DEFAULT_PORT,
};

pub const SETTINGS_ENV_KEY: &str = "MCP_COMPOSE_SETTINGS";
pub const DEFAULT_SETTINGS_PATH: &str = "compose.toml";

/// Top-level settings container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposeSettings {
    pub server: ServerSection,
    pub mount: MountOptions,
    /// `None` when no settings file was found and defaults apply.
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawComposeSettings {
    server: Option<RawServerSection>,
    mount: Option<RawMountSection>,
}

impl ComposeSettings {
    /// Resolve settings in the order: CLI override → `MCP_COMPOSE_SETTINGS` → `compose.toml`.
    ///
    /// Explicit paths must exist; a missing default file falls back to built-in defaults.
    pub fn resolve(override_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = override_path {
            return Self::load_from_path(path);
        }
        Self::load_from_env_or_default()
    }

    /// Prefer `MCP_COMPOSE_SETTINGS` if set; otherwise read `compose.toml` when present.
    pub fn load_from_env_or_default() -> Result<Self, ConfigError> {
        let (path, from_env) = match env::var(SETTINGS_ENV_KEY) {
            Ok(value) if !value.trim().is_empty() => (PathBuf::from(value), true),
            _ => (PathBuf::from(DEFAULT_SETTINGS_PATH), false),
        };

        telemetry::log_env_source(&path, from_env);
        if !from_env && !path.is_file() {
            let settings = Self::default();
            telemetry::log_loaded(&settings);
            return Ok(settings);
        }
        Self::load_from_path(path)
    }

    /// Load settings from a specific path.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        tracing::info!(
            target: "mcp_compose::config",
            path = %path.display(),
            "Starting settings load"
        );

        let source = config::File::from(path.clone()).format(config::FileFormat::Toml);
        let document = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|err| {
                let error = ConfigError::from_read_error(path.clone(), err);
                error!(
                    target: "mcp_compose::config",
                    path = %path.display(),
                    reason = %error,
                    "Failed to read settings file"
                );
                error
            })?;

        let raw: RawComposeSettings = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "mcp_compose::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse settings file"
            );
            error
        })?;

        let settings = Self::from_raw(raw, &path).map_err(|err| {
            error!(
                target: "mcp_compose::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate settings file"
            );
            err
        })?;

        telemetry::log_loaded(&settings);
        Ok(settings)
    }

    fn from_raw(raw: RawComposeSettings, path: &Path) -> Result<Self, ConfigError> {
        let server = parse_server_section(raw.server, path)?;
        let mount = parse_mount_section(raw.mount, path)?;

        Ok(Self {
            server,
            mount,
            source_path: Some(path.to_path_buf()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use crate::lib::errors::ConfigError;

    use super::ComposeSettings;

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn load_valid_settings() {
        let settings = ComposeSettings::load_from_path(fixture_path("compose_valid.toml"))
            .expect("compose_valid.toml should load");

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9100);
        assert!(!settings.mount.name_as_prefix);
        assert_eq!(settings.mount.max_concurrent, 4);
        assert!(settings.mount.fail_fast);
        assert_eq!(settings.mount.timeout, Duration::from_secs(45));
        assert_eq!(
            settings.source_path,
            Some(fixture_path("compose_valid.toml"))
        );
    }

    #[test]
    fn empty_settings_use_defaults() {
        let settings = ComposeSettings::load_from_path(fixture_path("compose_empty.toml"))
            .expect("empty settings should load");

        assert_eq!(settings.server.host, super::DEFAULT_HOST);
        assert_eq!(settings.server.port, super::DEFAULT_PORT);
        assert!(settings.mount.name_as_prefix);
        assert_eq!(settings.mount.max_concurrent, 10);
        assert!(!settings.mount.fail_fast);
    }

    #[test]
    fn invalid_port_returns_error() {
        let error = ComposeSettings::load_from_path(fixture_path("compose_invalid_port.toml"))
            .expect_err("should error for an invalid port");

        match error {
            ConfigError::InvalidField { field, .. } => assert_eq!(field, "server.port"),
            other => panic!("Unexpected error: {other:?}", other = other),
        }
    }

    #[test]
    fn zero_concurrency_returns_error() {
        let error =
            ComposeSettings::load_from_path(fixture_path("compose_zero_concurrency.toml"))
                .expect_err("should error for zero concurrency");

        match error {
            ConfigError::InvalidField { field, .. } => assert_eq!(field, "mount.max_concurrent"),
            other => panic!("Unexpected error: {other:?}", other = other),
        }
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let error = ComposeSettings::resolve(Some(fixture_path("does_not_exist.toml")))
            .expect_err("explicit path must exist");

        assert!(
            matches!(error, ConfigError::FileRead { .. }),
            "unexpected error: {error:?}"
        );
    }
}
