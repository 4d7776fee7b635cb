//! Editor-style MCP configuration (`mcp.json`, top-level `mcpServers`).
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::lib::errors::McpConfigError;

pub mod descriptor;

pub use descriptor::{LaunchPlan, RemoteServer, ServerDescriptor, StdioServer, TransportKind};

/// Top-level key holding the server map.
pub const MCP_SERVERS_KEY: &str = "mcpServers";

/// Parsed `mcp.json` document.
///
/// Servers are kept in name order, which is also the order they are mounted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, ServerDescriptor>,
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl McpConfig {
    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, McpConfigError> {
        info!(
            target: "mcp_compose::config",
            path = %path.display(),
            "Loading MCP server configuration"
        );
        let text = fs::read_to_string(path).map_err(|source| McpConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: McpConfig =
            serde_json::from_str(&text).map_err(|source| McpConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            })?;
        config.source_path = Some(path.to_path_buf());
        config.validate().map_err(|err| {
            error!(
                target: "mcp_compose::config",
                path = %path.display(),
                reason = %err,
                "Invalid MCP server configuration"
            );
            err
        })?;

        info!(
            target: "mcp_compose::config",
            path = %path.display(),
            servers = ?config.server_names(),
            "MCP server configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate an in-memory document.
    pub fn from_json_str(text: &str) -> Result<Self, McpConfigError> {
        let config: McpConfig = serde_json::from_str(text)
            .map_err(|source| McpConfigError::Parse { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration holding a single remote server, named after the URL host.
    pub fn single_remote(url: &str) -> Result<Self, McpConfigError> {
        let name = url::Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_else(|| "remote".to_string());
        let mut config = McpConfig::default();
        config
            .mcp_servers
            .insert(name, ServerDescriptor::remote(url));
        config.validate()?;
        Ok(config)
    }

    /// Keep only the named server.
    pub fn select(&self, name: &str) -> Result<Self, McpConfigError> {
        let descriptor =
            self.mcp_servers
                .get(name)
                .cloned()
                .ok_or_else(|| McpConfigError::UnknownServer {
                    name: name.to_string(),
                    available: self.server_names(),
                })?;
        let mut selected = McpConfig {
            mcp_servers: BTreeMap::new(),
            source_path: self.source_path.clone(),
        };
        selected.mcp_servers.insert(name.to_string(), descriptor);
        Ok(selected)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.mcp_servers.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mcp_servers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mcp_servers.len()
    }

    /// Directory relative `cwd` entries resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }

    /// Validate server names and every descriptor.
    pub fn validate(&self) -> Result<(), McpConfigError> {
        for (name, descriptor) in &self.mcp_servers {
            validate_server_name(name)?;
            descriptor.validate(name)?;
        }
        Ok(())
    }

    /// JSON Schema describing the configuration file.
    pub fn json_schema() -> Value {
        let schema = schemars::schema_for!(McpConfig);
        serde_json::to_value(schema).unwrap_or(Value::Null)
    }
}

/// Server names become tool prefixes and URI path segments.
pub fn validate_server_name(name: &str) -> Result<(), McpConfigError> {
    let message = if name.is_empty() {
        Some("server name cannot be empty")
    } else if name.chars().any(char::is_whitespace) {
        Some("server name cannot contain whitespace")
    } else if name.contains('/') {
        Some("server name cannot contain `/`")
    } else {
        None
    };
    match message {
        Some(message) => Err(McpConfigError::InvalidServer {
            name: name.to_string(),
            field: "name",
            message: message.to_string(),
        }),
        None => Ok(()),
    }
}
