//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use crate::commands::inspect::ArchiveInspection;
use anyhow::Result;
use cachepull_core::CacheItem;
use cachepull_core::GateDecision;
use cachepull_core::RestoreOutcome;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

#[derive(Debug, Serialize)]
struct GateOutput {
    proceeds: bool,
    mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive_stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_stack: Option<String>,
}

impl From<&GateDecision> for GateOutput {
    fn from(gate: &GateDecision) -> Self {
        let (archive_stack, current_stack) = match gate {
            GateDecision::Proceed => (None, None),
            GateDecision::ProceedWithMismatch { archive, current }
            | GateDecision::Abort { archive, current } => {
                (Some(archive.clone()), Some(current.clone()))
            }
        };
        Self {
            proceeds: gate.proceeds(),
            mismatch: gate.is_mismatch(),
            archive_stack,
            current_stack,
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_restore_result(&self, outcome: &RestoreOutcome) -> Result<()> {
        #[derive(Serialize)]
        struct SkippedOutput {
            item: CacheItem,
            reason: String,
        }

        #[derive(Serialize)]
        struct RestoreOutput {
            cache_info_path: String,
            extraction_root: String,
            encoding: &'static str,
            archive_bytes: u64,
            stack: GateOutput,
            entries_written: usize,
            files_extracted: usize,
            directories_created: usize,
            symlinks_created: usize,
            hardlinks_created: usize,
            placed: Vec<String>,
            skipped: Vec<SkippedOutput>,
            duration_ms: u128,
        }

        let report = match outcome {
            RestoreOutcome::NoCacheSource => {
                return Self::output(&JsonOutput::<()>::skipped(
                    "restore",
                    "no cache source configured",
                ));
            }
            RestoreOutcome::CacheNotInitialized { status } => {
                return Self::output(&JsonOutput::<()>::skipped(
                    "restore",
                    format!("build cache not initialised (http-code: {status})"),
                ));
            }
            RestoreOutcome::Restored(report) => report,
        };

        let data = RestoreOutput {
            cache_info_path: report.manifest_path.display().to_string(),
            extraction_root: report.extraction_root.display().to_string(),
            encoding: report.encoding.name(),
            archive_bytes: report.archive_bytes,
            stack: GateOutput::from(&report.stack),
            entries_written: report.extraction.entries_written,
            files_extracted: report.extraction.files_extracted,
            directories_created: report.extraction.directories_created,
            symlinks_created: report.extraction.symlinks_created,
            hardlinks_created: report.extraction.hardlinks_created,
            placed: report
                .placement
                .placed
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            skipped: report
                .placement
                .skipped
                .iter()
                .map(|s| SkippedOutput {
                    item: s.item.clone(),
                    reason: s.reason.clone(),
                })
                .collect(),
            duration_ms: report.duration.as_millis(),
        };

        Self::output(&JsonOutput::success("restore", data))
    }

    fn format_inspection(&self, inspection: &ArchiveInspection) -> Result<()> {
        #[derive(Serialize)]
        struct InspectOutput<'a> {
            archive: String,
            encoding: &'static str,
            first_entry: Option<String>,
            manifest: Option<&'a cachepull_core::CacheManifest>,
            gate: Option<GateOutput>,
        }

        let data = InspectOutput {
            archive: inspection.archive.display().to_string(),
            encoding: inspection.probe.encoding.name(),
            first_entry: inspection
                .probe
                .first_entry
                .as_ref()
                .map(|p| p.display().to_string()),
            manifest: inspection.manifest.as_ref(),
            gate: inspection.gate.as_ref().map(GateOutput::from),
        };

        Self::output(&JsonOutput::success("inspect", data))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_output_for_mismatch() {
        let gate = GateDecision::ProceedWithMismatch {
            archive: "osx".into(),
            current: "linux".into(),
        };
        let json = serde_json::to_value(GateOutput::from(&gate)).unwrap();
        assert_eq!(json["proceeds"], true);
        assert_eq!(json["mismatch"], true);
        assert_eq!(json["archive_stack"], "osx");
    }

    #[test]
    fn test_skipped_output_shape() {
        let output = JsonOutput::<()>::skipped("restore", "no cache source configured");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["operation"], "restore");
        assert!(json.get("data").is_none());
    }
}
