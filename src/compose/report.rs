//! Per-server mount outcomes and the summary logged after mounting.
use serde::Serialize;
use tracing::{info, warn};

use super::upstream::CatalogCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MountStatus {
    Mounted,
    Failed,
}

/// Result of mounting one configured server.
#[derive(Debug, Clone, Serialize)]
pub struct MountOutcome {
    pub name: String,
    pub status: MountStatus,
    pub prefix: Option<String>,
    pub transport: &'static str,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    #[serde(flatten)]
    pub counts: CatalogCounts,
}

impl MountOutcome {
    pub fn mounted(
        name: &str,
        prefix: Option<&str>,
        transport: &'static str,
        elapsed_ms: u64,
        counts: CatalogCounts,
    ) -> Self {
        Self {
            name: name.to_string(),
            status: MountStatus::Mounted,
            prefix: prefix.map(str::to_string),
            transport,
            elapsed_ms,
            error: None,
            counts,
        }
    }

    pub fn failed(name: &str, transport: &'static str, elapsed_ms: u64, error: String) -> Self {
        Self {
            name: name.to_string(),
            status: MountStatus::Failed,
            prefix: None,
            transport,
            elapsed_ms,
            error: Some(error),
            counts: CatalogCounts::default(),
        }
    }
}

/// Outcomes of one mounting pass, in configuration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MountReport {
    pub outcomes: Vec<MountOutcome>,
}

impl MountReport {
    pub fn push(&mut self, outcome: MountOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn succeeded(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == MountStatus::Mounted)
            .map(|outcome| outcome.name.clone())
            .collect()
    }

    /// `name: error` lines for every failed server.
    pub fn failures(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == MountStatus::Failed)
            .map(|outcome| {
                format!(
                    "{}: {}",
                    outcome.name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty()
            && self
                .outcomes
                .iter()
                .all(|outcome| outcome.status == MountStatus::Failed)
    }

    pub fn log_summary(&self) {
        let succeeded = self.succeeded();
        if !succeeded.is_empty() {
            info!(
                target: "mcp_compose::mount",
                count = succeeded.len(),
                servers = %succeeded.join(", "),
                "Successfully mounted servers"
            );
        }
        let failures = self.failures();
        if !failures.is_empty() {
            warn!(
                target: "mcp_compose::mount",
                count = failures.len(),
                failures = ?failures,
                "Failed to mount servers"
            );
        }
    }
}
