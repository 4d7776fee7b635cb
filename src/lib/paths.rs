//! Shared helpers reused across modules (path resolution and variable expansion).

use std::{
    env,
    path::{Path, PathBuf},
};

/// Returns true if the path is non-empty and absolute.
pub fn is_nonempty_absolute(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.is_absolute()
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Resolve `path` against the current working directory.
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if is_nonempty_absolute(path) {
        return Ok(path.to_path_buf());
    }
    Ok(env::current_dir()?.join(path))
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references using the process environment.
pub fn expand(value: &str) -> Result<String, String> {
    shellexpand::full(value)
        .map(|expanded| expanded.into_owned())
        .map_err(|err| err.to_string())
}
