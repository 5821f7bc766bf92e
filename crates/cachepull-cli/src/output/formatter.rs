//! Output formatter trait for CLI results.

use crate::commands::inspect::ArchiveInspection;
use anyhow::Result;
use cachepull_core::RestoreOutcome;
use serde::Serialize;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the outcome of a restore run
    fn format_restore_result(&self, outcome: &RestoreOutcome) -> Result<()>;

    /// Format a local archive inspection
    fn format_inspection(&self, inspection: &ArchiveInspection) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Skipped,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn skipped(operation: impl Into<String>, reason: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: Status::Skipped,
            data: None,
            message: Some(reason.into()),
        }
    }
}
