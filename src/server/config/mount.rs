use std::{path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    compose::{MountOptions, DEFAULT_MAX_CONCURRENT, DEFAULT_MOUNT_TIMEOUT},
    lib::errors::ConfigError,
};

const MAX_CONCURRENT_LIMIT: usize = 256;
const MAX_TIMEOUT_SECS: u64 = 600;

/// `[mount]` settings controlling how configured servers are mounted.
#[derive(Debug, Deserialize, Default)]
pub struct RawMountSection {
    pub name_as_prefix: Option<bool>,
    pub max_concurrent: Option<usize>,
    pub fail_fast: Option<bool>,
    pub timeout_secs: Option<u64>,
}

pub fn parse_mount_section(
    raw: Option<RawMountSection>,
    path: &Path,
) -> Result<MountOptions, ConfigError> {
    let raw = raw.unwrap_or_default();

    let max_concurrent = raw.max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT);
    if !(1..=MAX_CONCURRENT_LIMIT).contains(&max_concurrent) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "mount.max_concurrent",
            message: format!("Specify a value between 1 and {MAX_CONCURRENT_LIMIT}"),
        });
    }

    let timeout_secs = raw
        .timeout_secs
        .unwrap_or_else(|| DEFAULT_MOUNT_TIMEOUT.as_secs());
    if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "mount.timeout_secs",
            message: format!("Specify a value between 1 and {MAX_TIMEOUT_SECS} seconds"),
        });
    }

    Ok(MountOptions {
        name_as_prefix: raw.name_as_prefix.unwrap_or(true),
        max_concurrent,
        fail_fast: raw.fail_fast.unwrap_or(false),
        timeout: Duration::from_secs(timeout_secs),
    })
}
