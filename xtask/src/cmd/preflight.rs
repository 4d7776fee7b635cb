use crate::{cmd::schema, repo};
use anyhow::{Context, Result};
use std::{
    fs,
    path::Path,
    process::{Command, Stdio},
};

pub fn run() -> Result<()> {
    let root = repo::repo_root()?;
    run_step(&root, "cargo fetch", &["fetch"])?;
    run_step(&root, "cargo check --all-targets", &["check", "--all-targets"])?;
    run_step(&root, "cargo test --all", &["test", "--all"])?;
    run_step(&root, "cargo fmt -- --check", &["fmt", "--", "--check"])?;
    run_step(
        &root,
        "cargo clippy --all-targets -- -D warnings",
        &["clippy", "--all-targets", "--", "-D", "warnings"],
    )?;
    check_schema(&root)?;
    run_step(&root, "cargo build --release", &["build", "--release"])?;
    Ok(())
}

fn run_step(root: &Path, label: &str, args: &[&str]) -> Result<()> {
    eprintln!("==> {label}");
    let status = Command::new("cargo")
        .args(args)
        .current_dir(root)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("{label} failed (status {status})");
    }
    Ok(())
}

/// Fail when the committed schema no longer matches `mcp-compose schema`.
fn check_schema(root: &Path) -> Result<()> {
    let committed_path = repo::schema_path(root);
    eprintln!("==> {} is current", repo::SCHEMA_PATH);
    if !committed_path.is_file() {
        eprintln!(
            "    skipped: {} has not been generated (run `cargo run -p xtask -- schema`)",
            repo::SCHEMA_PATH
        );
        return Ok(());
    }
    let committed = fs::read(&committed_path)
        .with_context(|| format!("failed to read {}", committed_path.display()))?;
    let rendered = schema::render(root)?;
    if !same_document(&committed, &rendered) {
        anyhow::bail!(
            "{} is stale; run `cargo run -p xtask -- schema` and commit the result",
            repo::SCHEMA_PATH
        );
    }
    Ok(())
}

/// Byte comparison that ignores trailing whitespace.
fn same_document(committed: &[u8], rendered: &[u8]) -> bool {
    trim_end(committed) == trim_end(rendered)
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |index| index + 1);
    &bytes[..end]
}
