use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Committed JSON Schema of `mcp.json`, relative to the repository root.
pub const SCHEMA_PATH: &str = "docs/mcp.schema.json";

/// Walk up from the current directory to the workspace manifest.
pub fn repo_root() -> anyhow::Result<PathBuf> {
    let mut dir = env::current_dir()?;
    loop {
        if is_workspace_root(&dir) {
            return Ok(dir);
        }
        if !dir.pop() {
            anyhow::bail!("failed to find the mcp-compose workspace (no [workspace] Cargo.toml)");
        }
    }
}

fn is_workspace_root(dir: &Path) -> bool {
    fs::read_to_string(dir.join("Cargo.toml"))
        .map(|manifest| manifest.lines().any(|line| line.trim() == "[workspace]"))
        .unwrap_or(false)
}

pub fn schema_path(root: &Path) -> PathBuf {
    root.join(SCHEMA_PATH)
}

pub fn rel_from(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
