use crate::repo;
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

/// Regenerate the published `mcp.json` JSON Schema from `mcp-compose schema`.
pub fn run(out: Option<PathBuf>) -> Result<()> {
    let root = repo::repo_root()?;
    let out = out.unwrap_or_else(|| repo::schema_path(&root));

    let rendered = render(&root)?;
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&out, rendered).with_context(|| format!("failed to write {}", out.display()))?;
    eprintln!("wrote {}", repo::rel_from(&root, &out).display());
    Ok(())
}

/// Output of `cargo run -- schema` in `root`.
pub fn render(root: &Path) -> Result<Vec<u8>> {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--", "schema"])
        .current_dir(root)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .context("failed to run `cargo run -- schema`")?;
    if !output.status.success() {
        anyhow::bail!("`mcp-compose schema` failed (status {})", output.status);
    }
    Ok(output.stdout)
}
