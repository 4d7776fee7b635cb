use std::{io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use rmcp::model::ErrorData;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors that can occur while loading or validating the runtime settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the settings file.
    #[error("Failed to read settings file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Field failed validation.
    #[error("Settings file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Errors raised while reading or validating an `mcp.json` document.
#[derive(Debug, Error)]
pub enum McpConfigError {
    #[error("Failed to read MCP configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse MCP configuration{}: {source}", display_origin(.path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("Server `{name}` has invalid `{field}`: {message}")]
    InvalidServer {
        name: String,
        field: &'static str,
        message: String,
    },
    #[error("Server `{name}` is not defined (available: {})", .available.join(", "))]
    UnknownServer {
        name: String,
        available: Vec<String>,
    },
    #[error("Failed to expand `{value}` for server `{name}`: {message}")]
    Expand {
        name: String,
        value: String,
        message: String,
    },
}

fn display_origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

/// Failures while connecting an upstream server into the composite.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("Server `{name}` cannot be launched: {source}")]
    Launch {
        name: String,
        #[source]
        source: McpConfigError,
    },
    #[error("Failed to start server `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("Server `{name}` failed the MCP handshake: {message}")]
    Initialize { name: String, message: String },
    #[error("Server `{name}` did not finish mounting within {timeout_secs} seconds")]
    Timeout { name: String, timeout_secs: u64 },
    #[error("Failed to read the catalog of server `{name}`: {message}")]
    Catalog { name: String, message: String },
    #[error("Server `{name}` is already mounted")]
    Duplicate { name: String },
    #[error("Mount task aborted: {message}")]
    Task { message: String },
    #[error("All {} servers failed to mount", .failed.len())]
    AllMountsFailed { failed: Vec<String> },
}

impl MountError {
    /// Name of the server the failure belongs to, when it concerns a single server.
    pub fn server_name(&self) -> Option<&str> {
        match self {
            MountError::Launch { name, .. }
            | MountError::Spawn { name, .. }
            | MountError::Initialize { name, .. }
            | MountError::Timeout { name, .. }
            | MountError::Catalog { name, .. }
            | MountError::Duplicate { name } => Some(name),
            MountError::Task { .. } | MountError::AllMountsFailed { .. } => None,
        }
    }
}

/// Errors while editing an editor configuration file.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} must contain a JSON object (with an optional `{key}` object)")]
    NotAnObject { path: PathBuf, key: &'static str },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Structured error metadata returned by the composite server.
#[derive(Debug, Clone, Serialize)]
pub struct ToolErrorDescriptor {
    /// Error code.
    pub code: &'static str,
    /// User-facing message.
    pub message: &'static str,
    /// Recommended remediation.
    pub remediation: &'static str,
}

impl ToolErrorDescriptor {
    /// Simple constructor.
    pub const fn new(code: &'static str, message: &'static str, remediation: &'static str) -> Self {
        Self {
            code,
            message,
            remediation,
        }
    }

    /// Create a builder.
    pub fn builder(&self) -> ToolErrorDescriptorBuilder<'_> {
        ToolErrorDescriptorBuilder::new(self)
    }
}

/// JSON-RPC error category used when materializing `ErrorData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidParams,
    ResourceNotFound,
    Internal,
}

/// Builder for error data that fails if required fields are missing.
pub struct ToolErrorDescriptorBuilder<'a> {
    descriptor: &'a ToolErrorDescriptor,
    retryable: Option<bool>,
    category: Option<ErrorCategory>,
    details: Option<Value>,
    extra_fields: Map<String, Value>,
}

impl<'a> ToolErrorDescriptorBuilder<'a> {
    pub fn new(descriptor: &'a ToolErrorDescriptor) -> Self {
        Self {
            descriptor,
            retryable: None,
            category: None,
            details: None,
            extra_fields: Map::new(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_context_field(mut self, key: &str, value: Value) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }

    pub fn with_exit_code_value(mut self, exit_code: u8) -> Self {
        let numeric = Number::from(exit_code);
        self.extra_fields
            .insert("exit_code".into(), Value::Number(numeric));
        self
    }

    pub fn build(self) -> Result<ErrorData, ToolErrorBuilderError> {
        if self.descriptor.remediation.trim().is_empty() {
            return Err(ToolErrorBuilderError::MissingRemediation {
                code: self.descriptor.code,
            });
        }
        let retryable = self
            .retryable
            .ok_or(ToolErrorBuilderError::MissingRetryable {
                code: self.descriptor.code,
            })?;
        let category = self
            .category
            .ok_or(ToolErrorBuilderError::MissingCategory {
                code: self.descriptor.code,
            })?;

        let mut data = Map::new();
        data.insert("code".into(), Value::String(self.descriptor.code.into()));
        data.insert(
            "remediation".into(),
            Value::String(self.descriptor.remediation.into()),
        );
        data.insert("retryable".into(), Value::Bool(retryable));
        if let Some(details) = self.details {
            data.insert("details".into(), details);
        }
        for (key, value) in self.extra_fields {
            data.insert(key, value);
        }

        let data = Some(Value::Object(data));
        Ok(match category {
            ErrorCategory::InvalidParams => ErrorData::invalid_params(self.descriptor.message, data),
            ErrorCategory::ResourceNotFound => {
                ErrorData::resource_not_found(self.descriptor.message, data)
            }
            ErrorCategory::Internal => ErrorData::internal_error(self.descriptor.message, data),
        })
    }
}

/// Errors when required builder fields are missing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolErrorBuilderError {
    #[error("retryable is missing (code={code})")]
    MissingRetryable { code: &'static str },
    #[error("category is missing (code={code})")]
    MissingCategory { code: &'static str },
    #[error("remediation is empty (code={code})")]
    MissingRemediation { code: &'static str },
}

/// No mounted server exposes the requested tool.
pub const UNKNOWN_TOOL_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "UNKNOWN_TOOL",
    "No mounted server provides the requested tool",
    "Call tools/list and use one of the returned (prefixed) tool names.",
);

/// No mounted server exposes the requested prompt.
pub const UNKNOWN_PROMPT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "UNKNOWN_PROMPT",
    "No mounted server provides the requested prompt",
    "Call prompts/list and use one of the returned (prefixed) prompt names.",
);

/// No mounted server exposes the requested resource.
pub const UNKNOWN_RESOURCE_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "UNKNOWN_RESOURCE",
    "No mounted server provides the requested resource",
    "Call resources/list or resources/templates/list and use a returned URI.",
);

/// The upstream server failed to answer a forwarded request.
pub const UPSTREAM_REQUEST_FAILED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "UPSTREAM_REQUEST_FAILED",
    "The mounted server failed to handle the forwarded request",
    "Check the upstream server logs; restart mcp-compose if the server process exited.",
);

/// Standard error when executed without an MCP client.
pub const MCP_CLIENT_REQUIRED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "MCP_CLIENT_REQUIRED",
    "The stdio transport can only be driven by an MCP client",
    "Launch through an MCP client, or try `mcp-compose dev <server_spec>` to open the MCP Inspector.",
);

/// The composite server could not be assembled from the configuration.
pub const COMPOSE_MOUNT_FAILED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "COMPOSE_MOUNT_FAILED",
    "No configured MCP server could be mounted",
    "Run `mcp-compose inspect <server_spec>` to see per-server failures and fix mcp.json.",
);
