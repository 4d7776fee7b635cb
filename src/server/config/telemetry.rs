use tracing::{debug, info};

use super::{ComposeSettings, DEFAULT_SETTINGS_PATH, SETTINGS_ENV_KEY};

pub fn log_env_source(path: &std::path::Path, from_env: bool) {
    if from_env {
        info!(
            target: "mcp_compose::config",
            path = %path.display(),
            "Loading settings using MCP_COMPOSE_SETTINGS environment variable"
        );
    } else {
        debug!(
            target: "mcp_compose::config",
            path = %path.display(),
            env = SETTINGS_ENV_KEY,
            default = DEFAULT_SETTINGS_PATH,
            "MCP_COMPOSE_SETTINGS not set; using default compose.toml"
        );
    }
}

pub fn log_loaded(settings: &ComposeSettings) {
    info!(
        target: "mcp_compose::config",
        path = %settings
            .source_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<defaults>".into()),
        host = %settings.server.host,
        port = settings.server.port,
        name_as_prefix = settings.mount.name_as_prefix,
        max_concurrent = settings.mount.max_concurrent,
        fail_fast = settings.mount.fail_fast,
        timeout_secs = settings.mount.timeout.as_secs(),
        "Settings loaded successfully"
    );
}
