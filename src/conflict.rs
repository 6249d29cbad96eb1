//! Per-job overwrite/skip decisions for destination files that already exist.

use async_trait::async_trait;
use remfs_core::{path, ProtocolClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Answer offered to the user for one existing destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictChoice {
    Overwrite,
    Skip,
    OverwriteAll,
    SkipAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictMode {
    #[default]
    Undecided,
    OverwriteAll,
    SkipAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Proceed,
    Skip,
}

/// Asks the user what to do about an existing destination. `None` means the
/// prompt was dismissed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConflictPrompt: Send + Sync {
    async fn ask(&self, destination: &str) -> Option<ConflictChoice>;
}

/// Prompt that always gives the same answer, for non-interactive callers.
#[derive(Debug, Clone, Copy)]
pub struct FixedChoice(pub ConflictChoice);

#[async_trait]
impl ConflictPrompt for FixedChoice {
    async fn ask(&self, _destination: &str) -> Option<ConflictChoice> {
        Some(self.0)
    }
}

/// Conflict state for one transfer job. "All" answers latch for the rest of
/// the job and are never shared with other jobs.
pub struct ConflictResolver {
    prompt: Arc<dyn ConflictPrompt>,
    mode: ConflictMode,
}

impl ConflictResolver {
    pub fn new(prompt: Arc<dyn ConflictPrompt>) -> Self {
        Self {
            prompt,
            mode: ConflictMode::Undecided,
        }
    }

    pub fn mode(&self) -> ConflictMode {
        self.mode
    }

    /// Decide whether `destination` may be written. The existence check lists
    /// the parent; when that listing fails the copy proceeds.
    pub async fn resolve(&mut self, client: &dyn ProtocolClient, destination: &str) -> Resolution {
        let parent = path::parent(destination);
        let name = path::basename(destination);

        let exists = match client.list(&parent).await {
            Ok(entries) => entries.iter().any(|e| e.name == name),
            Err(e) => {
                tracing::debug!(%destination, error = %e, "conflict check listing failed; proceeding");
                return Resolution::Proceed;
            }
        };
        self.decide(destination, exists).await
    }

    /// Decide for a destination whose existence the caller already knows,
    /// e.g. a local file on download.
    pub async fn decide(&mut self, destination: &str, exists: bool) -> Resolution {
        if !exists {
            return Resolution::Proceed;
        }

        match self.mode {
            ConflictMode::OverwriteAll => return Resolution::Proceed,
            ConflictMode::SkipAll => return Resolution::Skip,
            ConflictMode::Undecided => {}
        }

        match self.prompt.ask(destination).await {
            Some(ConflictChoice::Overwrite) => Resolution::Proceed,
            Some(ConflictChoice::Skip) => Resolution::Skip,
            Some(ConflictChoice::OverwriteAll) => {
                self.mode = ConflictMode::OverwriteAll;
                Resolution::Proceed
            }
            Some(ConflictChoice::SkipAll) => {
                self.mode = ConflictMode::SkipAll;
                Resolution::Skip
            }
            None => {
                tracing::debug!(%destination, "conflict prompt dismissed; skipping");
                Resolution::Skip
            }
        }
    }
}
