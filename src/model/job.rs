use std::path::{Path, PathBuf};

use serde::Serialize;

/// Extension of every file the fetcher writes.
pub const ASSET_EXTENSION: &str = "png";

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct AssetJob {
    pub name: &'static str,
    pub prompt: &'static str,
}

impl AssetJob {
    pub const fn new(name: &'static str, prompt: &'static str) -> Self {
        Self { name, prompt }
    }

    /// `<name>.png`, derived from the name alone.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, ASSET_EXTENSION)
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.file_name())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Written { path: PathBuf },
    Failed { reason: String },
}

#[derive(Debug, Serialize, Clone)]
pub struct JobOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, JobStatus::Written { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// One entry per job, in input order.
    pub items: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn from_outcomes(items: Vec<JobOutcome>) -> Self {
        let succeeded = items.iter().filter(|o| o.is_written()).count();

        BatchReport {
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
            items,
        }
    }
}
