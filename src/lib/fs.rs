//! Editing `mcpServers` entries in editor configuration files.

use std::{
    env, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::{lib::errors::InstallError, mcp_config::MCP_SERVERS_KEY};

/// Environment variable name for user home directory.
const HOME_ENV: &str = "HOME";
/// Windows fallback for the home directory.
const USERPROFILE_ENV: &str = "USERPROFILE";
/// Cursor keeps its MCP configuration under this directory.
const CURSOR_DIR: &str = ".cursor";
const MCP_FILE_NAME: &str = "mcp.json";

/// Outcome of `install_server_entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryInstallStatus {
    Planned,
    Installed,
    SkippedExisting,
}

impl EntryInstallStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryInstallStatus::Planned => "planned",
            EntryInstallStatus::Installed => "installed",
            EntryInstallStatus::SkippedExisting => "skipped_existing",
        }
    }
}

/// Outcome of `remove_server_entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRemoveStatus {
    Removed,
    NotFound,
}

impl EntryRemoveStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryRemoveStatus::Removed => "removed",
            EntryRemoveStatus::NotFound => "not_found",
        }
    }
}

/// Resolve the user-wide Cursor configuration (`~/.cursor/mcp.json`).
pub fn resolve_cursor_config_path() -> Result<PathBuf, &'static str> {
    let home = [HOME_ENV, USERPROFILE_ENV]
        .iter()
        .filter_map(|key| env::var_os(key))
        .map(PathBuf::from)
        .find(|path| !path.as_os_str().is_empty())
        .ok_or("HOME is not set; pass --file or --workspace")?;
    Ok(home.join(CURSOR_DIR).join(MCP_FILE_NAME))
}

/// Workspace-local Cursor configuration (`<dir>/.cursor/mcp.json`).
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(CURSOR_DIR).join(MCP_FILE_NAME)
}

/// Add `name` to the `mcpServers` object of `path`, keeping every other key.
///
/// A missing file is created. An existing entry is kept unless `force` is set.
pub fn install_server_entry(
    path: &Path,
    name: &str,
    entry: Value,
    force: bool,
    dry_run: bool,
) -> Result<EntryInstallStatus, InstallError> {
    let mut document = read_document(path)?;
    let servers = servers_mut(&mut document, path)?;
    if servers.contains_key(name) && !force {
        return Ok(EntryInstallStatus::SkippedExisting);
    }
    if dry_run {
        return Ok(EntryInstallStatus::Planned);
    }

    servers.insert(name.to_string(), entry);
    write_document(path, &document)?;
    Ok(EntryInstallStatus::Installed)
}

/// Remove `name` from the `mcpServers` object of `path`.
///
/// A missing file or entry returns `NotFound` without error.
pub fn remove_server_entry(path: &Path, name: &str) -> Result<EntryRemoveStatus, InstallError> {
    if !path.exists() {
        return Ok(EntryRemoveStatus::NotFound);
    }
    let mut document = read_document(path)?;
    let servers = servers_mut(&mut document, path)?;
    if servers.remove(name).is_none() {
        return Ok(EntryRemoveStatus::NotFound);
    }
    write_document(path, &document)?;
    Ok(EntryRemoveStatus::Removed)
}

fn read_document(path: &Path) -> Result<Map<String, Value>, InstallError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(InstallError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(InstallError::NotAnObject {
            path: path.to_path_buf(),
            key: MCP_SERVERS_KEY,
        }),
        Err(source) => Err(InstallError::Parse {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn servers_mut<'a>(
    document: &'a mut Map<String, Value>,
    path: &Path,
) -> Result<&'a mut Map<String, Value>, InstallError> {
    document
        .entry(MCP_SERVERS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| InstallError::NotAnObject {
            path: path.to_path_buf(),
            key: MCP_SERVERS_KEY,
        })
}

/// Write through a temporary file in the same directory, then rename over `path`.
fn write_document(path: &Path, document: &Map<String, Value>) -> Result<(), InstallError> {
    let write_error = |source: io::Error| InstallError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(write_error)?;

    let mut rendered = serde_json::to_string_pretty(document)
        .map_err(|err| write_error(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    rendered.push('\n');

    let mut staged = NamedTempFile::new_in(&parent).map_err(write_error)?;
    staged.write_all(rendered.as_bytes()).map_err(write_error)?;
    staged.flush().map_err(write_error)?;
    staged
        .persist(path)
        .map_err(|err| write_error(err.error))?;
    Ok(())
}
