//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use crate::commands::inspect::ArchiveInspection;
use crate::progress::humanize_bytes;
use anyhow::Result;
use cachepull_core::GateDecision;
use cachepull_core::RestoreOutcome;
use cachepull_core::RestoreReport;
use console::Term;
use console::style;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn headline(&self, mark: &str, text: &str) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {text}", style(mark).green().bold()));
        } else {
            let _ = self.term.write_line(text);
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn describe_gate(gate: &GateDecision) -> String {
        match gate {
            GateDecision::Proceed => "compatible".to_string(),
            GateDecision::ProceedWithMismatch { archive, current } => {
                format!("mismatch ({archive} -> {current}), fallback allowed")
            }
            GateDecision::Abort { archive, current } => {
                format!("mismatch ({archive} -> {current}), restore would abort")
            }
        }
    }

    fn format_report(&self, report: &RestoreReport) {
        self.headline("✓", "Cache restored");
        self.line(&format!(
            "  Archive:   {} ({})",
            report.encoding,
            humanize_bytes(report.archive_bytes)
        ));
        self.line(&format!("  Stack:     {}", Self::describe_gate(&report.stack)));
        self.line(&format!(
            "  Entries:   {}",
            report.extraction.entries_written
        ));
        self.line(&format!(
            "  Placed:    {}",
            report.placement.placed_count()
        ));
        if !report.placement.is_complete() {
            self.line(&format!(
                "  Skipped:   {}",
                report.placement.skipped_count()
            ));
        }

        if self.verbose {
            self.line(&format!(
                "  Root:      {}",
                report.extraction_root.display()
            ));
            self.line(&format!("  Duration:  {:?}", report.duration));
            for skipped in &report.placement.skipped {
                self.line(&format!(
                    "    {} -> {}: {}",
                    skipped.item.relative_path_in_archive.display(),
                    skipped.item.destination_path.display(),
                    skipped.reason
                ));
            }
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_restore_result(&self, outcome: &RestoreOutcome) -> Result<()> {
        match outcome {
            RestoreOutcome::NoCacheSource => {
                if !self.quiet {
                    self.line("No cache source configured, nothing to restore");
                }
            }
            RestoreOutcome::CacheNotInitialized { status } => {
                if !self.quiet {
                    self.line(&format!(
                        "Build cache not initialised yet (http-code: {status}), nothing to restore"
                    ));
                }
            }
            RestoreOutcome::Restored(report) => {
                if !self.quiet {
                    self.format_report(report);
                }
                // Consumed by later build steps, printed even when quiet
                self.line(&format!(
                    "CACHE_INFO_PATH={}",
                    report.manifest_path.display()
                ));
            }
        }
        Ok(())
    }

    fn format_inspection(&self, inspection: &ArchiveInspection) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline("✓", &format!("Archive: {}", inspection.archive.display()));
        self.line(&format!("  Encoding:    {}", inspection.probe.encoding));
        match &inspection.probe.first_entry {
            Some(entry) => self.line(&format!("  First entry: {}", entry.display())),
            None => self.line("  First entry: (archive is empty)"),
        }

        let Some(manifest) = &inspection.manifest else {
            self.line("  Manifest:    not found");
            return Ok(());
        };
        self.line(&format!(
            "  Stack:       {}",
            manifest.stack_id.as_deref().unwrap_or("(not recorded)")
        ));
        if let Some(fingerprint) = &manifest.fingerprint {
            self.line(&format!("  Fingerprint: {fingerprint}"));
        }
        if manifest.has_contents() {
            self.line(&format!("  Items:       {}", manifest.contents.len()));
            if self.verbose {
                for item in &manifest.contents {
                    self.line(&format!(
                        "    {} -> {}",
                        item.relative_path_in_archive.display(),
                        item.destination_path.display()
                    ));
                }
            }
        } else {
            self.line("  Items:       none (entries carry their own paths)");
        }
        if let Some(gate) = &inspection.gate {
            self.line(&format!("  Gate:        {}", Self::describe_gate(gate)));
        }

        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            eprintln!("{} {message}", style("⚠").yellow().bold());
        } else {
            eprintln!("Warning: {message}");
        }
    }
}
