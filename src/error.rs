//! Error types with semantic recovery strategies.
//!
//! Configuration problems and visitor input problems are *data* (see
//! `config_validator::ErrorCode` and `submission::InvalidKind`); the
//! variants here are the faults of the tooling itself.

use std::io;
use std::path::{Path, PathBuf};

/// All possible errors while parsing tags, checking forms or persisting results.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    // ══════════════════════════════════════════════════════════════════════
    // RECOVERABLE: Skip this item and continue with others
    // ══════════════════════════════════════════════════════════════════════

    /// Bracket syntax could not be parsed. Render nothing, validate nothing.
    #[error("Malformed form-tag '{tag}': {reason}")]
    MalformedTag {
        tag: String,
        reason: &'static str,
    },

    /// Tag name does not match `[A-Za-z][0-9A-Za-z:._-]*`.
    #[error("Invalid tag name '{name}': {reason}")]
    InvalidName {
        name: String,
        reason: &'static str,
    },

    /// A single form definition failed to parse. Skip it, check the others.
    #[error("Form definition {path:?} could not be read: {message}")]
    FormParseFailed {
        path: PathBuf,
        message: String,
    },

    // ══════════════════════════════════════════════════════════════════════
    // NON-RECOVERABLE: Must abort the whole run
    // ══════════════════════════════════════════════════════════════════════

    /// Persisted configuration errors could not be read back.
    #[error("Error store not readable for form '{form_id}'")]
    StoreRead {
        form_id: String,
        #[source]
        source: io::Error,
    },

    /// Configuration errors could not be persisted.
    #[error("Error store not writable for form '{form_id}'")]
    StoreWrite {
        form_id: String,
        #[source]
        source: io::Error,
    },

    /// Persisted metadata exists but is not valid JSON.
    #[error("Error metadata for form '{form_id}' is corrupt")]
    StoreCorrupt {
        form_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Cannot read the forms directory.
    #[error("Forms directory not readable: {path:?}")]
    FormsDirNotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No form definitions found to check.
    #[error("No valid form definitions found in {path:?}")]
    NoForms {
        path: PathBuf,
    },

    // ══════════════════════════════════════════════════════════════════════
    // INTERNAL: Should never happen (indicates bug)
    // ══════════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FormError {
    /// Returns true if we can skip this item and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedTag { .. }
            | Self::InvalidName { .. }
            | Self::FormParseFailed { .. }
        )
    }

    /// Returns true if this indicates a bug in the checker.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Outcome of one form that was checked.
#[derive(Debug)]
pub struct FormReport {
    pub form_id: String,
    pub title: String,
    pub valid: bool,
    /// Section → rendered messages, in the order they were recorded.
    pub messages: Vec<(String, Vec<String>)>,
}

/// Result of a check run that may have partial failures.
#[derive(Debug)]
pub struct CheckResult {
    pub reports: Vec<FormReport>,
    pub failures: Vec<FormError>,
}

impl CheckResult {
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record_report(&mut self, report: FormReport) {
        self.reports.push(report);
    }

    pub fn record_failure(&mut self, error: FormError) {
        self.failures.push(error);
    }

    /// Returns Err if no form in `forms_dir` could be checked or if any
    /// non-recoverable error occurred.
    pub fn finalize(mut self, forms_dir: &Path) -> Result<CheckSummary, FormError> {
        if let Some(pos) = self.failures.iter().position(|e| !e.is_recoverable()) {
            return Err(self.failures.swap_remove(pos));
        }

        if self.reports.is_empty() && !self.failures.is_empty() {
            return Err(FormError::NoForms {
                path: forms_dir.to_path_buf(),
            });
        }

        Ok(CheckSummary {
            forms_checked: self.reports.len(),
            forms_skipped: self.failures.len(),
            reports: self.reports,
            warnings: self.failures,
        })
    }
}

impl Default for CheckResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a successful (possibly partial) check run.
#[derive(Debug)]
pub struct CheckSummary {
    pub forms_checked: usize,
    pub forms_skipped: usize,
    pub reports: Vec<FormReport>,
    pub warnings: Vec<FormError>,
}

impl CheckSummary {
    /// Number of checked forms that carry at least one configuration error.
    pub fn forms_with_errors(&self) -> usize {
        self.reports.iter().filter(|r| !r.valid).count()
    }

    pub fn print_report(&self) {
        for report in &self.reports {
            if report.valid {
                println!("✓ {} ({})", report.title, report.form_id);
                continue;
            }
            println!("✗ {} ({})", report.title, report.form_id);
            for (section, messages) in &report.messages {
                for message in messages {
                    println!("    {section}: {message}");
                }
            }
        }

        println!(
            "Checked {} forms, {} with configuration errors",
            self.forms_checked,
            self.forms_with_errors()
        );
        if self.forms_skipped > 0 {
            eprintln!("⚠ Skipped {} form definitions:", self.forms_skipped);
            for warn in &self.warnings {
                eprintln!("  - {}", warn);
            }
        }
    }
}
