//! Extraction through the system `tar`.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;

use tracing::debug;
use tracing::info;

use super::Extractor;
use crate::ExtractionReport;
use crate::RestoreError;
use crate::Result;

/// Flags: extract, list entries, keep permission bits, keep absolute paths,
/// read from file.
const EXTRACT_FLAGS: &str = "-xvpPf";

/// Runs `tar -xvpPf <archive>` with the destination root as working
/// directory.
///
/// Absolute entries land at their recorded location; relative entries land
/// below the root. `tar` detects gzip on its own. Permission bits are
/// restored exactly as recorded, without applying the umask. The combined output is kept in memory and attached to the error
/// when `tar` fails.
#[derive(Debug, Clone)]
pub struct DelegatedExtractor {
    program: OsString,
    debug: bool,
}

impl DelegatedExtractor {
    /// Creates an extractor that runs `tar` from `PATH`.
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self {
            program: OsString::from("tar"),
            debug,
        }
    }

    /// Replaces the program that is run.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Returns `true` if `<program> --version` runs successfully.
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

impl Extractor for DelegatedExtractor {
    fn extract(&self, archive: &Path, dest_root: &Path) -> Result<ExtractionReport> {
        fs::create_dir_all(dest_root)?;
        let archive = std::path::absolute(archive)?;

        let command_line = format!(
            "{} {EXTRACT_FLAGS} {}",
            self.program.to_string_lossy(),
            archive.display()
        );
        if self.debug {
            info!(command = %command_line, cwd = %dest_root.display(), "running tar");
        } else {
            debug!(command = %command_line, cwd = %dest_root.display(), "running tar");
        }

        let output = Command::new(&self.program)
            .arg(EXTRACT_FLAGS)
            .arg(&archive)
            .current_dir(dest_root)
            .stdin(Stdio::null())
            .output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(RestoreError::ExtractionTool {
                command: command_line,
                output: combined.trim().to_string(),
            });
        }

        if self.debug {
            info!(output = %combined.trim(), "tar finished");
        }

        Ok(ExtractionReport {
            entries_written: count_listed_entries(&combined, &self.program.to_string_lossy()),
            ..ExtractionReport::default()
        })
    }

    fn name(&self) -> &'static str {
        "tar"
    }
}

/// Counts entry names in verbose `tar` output.
///
/// GNU tar lists bare names on stdout, bsdtar prefixes them with `x ` on
/// stderr. Diagnostics start with `<program>:` and are not entries.
fn count_listed_entries(output: &str, program: &str) -> usize {
    let diagnostic = format!("{program}:");
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(&diagnostic))
        .count()
}
