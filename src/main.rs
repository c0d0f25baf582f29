//! Configuration checker entry point.
//!
//! Validates every application form definition in a directory, persists the
//! configuration errors per form and prints a report.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Utc};
use clap::Parser;
use rayon::prelude::*;

use weldpress::application::ApplicationForm;
use weldpress::config::Config;
use weldpress::config_validator::ConfigValidator;
use weldpress::error::{CheckResult, FormError, FormReport};
use weldpress::store::{ErrorStore, JsonFileStore};

#[derive(Debug, Parser)]
#[command(name = "weldpress", version, about = "Check form-tag application forms for configuration errors")]
struct Args {
    /// Directory containing application form definitions (*.json)
    #[arg(long)]
    forms_dir: Option<PathBuf>,

    /// Host name sender addresses must belong to
    #[arg(long)]
    site_domain: Option<String>,

    /// Directory where configuration errors are persisted
    #[arg(long)]
    errors_dir: Option<PathBuf>,

    /// Also check captcha messages
    #[arg(long)]
    captcha: bool,

    /// Timezone offset in hours for the report timestamp
    #[arg(long, allow_hyphen_values = true)]
    timezone: Option<i32>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::new().use_captcha(self.captcha);
        if let Some(dir) = self.forms_dir {
            config.errors_dir = dir.join(".errors");
            config.forms_dir = dir;
        }
        if let Some(dir) = self.errors_dir {
            config.errors_dir = dir;
        }
        if let Some(domain) = self.site_domain {
            config = config.site_domain(domain);
        }
        if let Some(hours) = self.timezone {
            config = config.timezone_offset(hours);
        }
        config
    }
}

fn main() -> Result<(), FormError> {
    let args = Args::parse();
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let config = args.into_config();

    let offset = FixedOffset::east_opt(config.timezone_offset_hours * 3600)
        .ok_or_else(|| FormError::Internal("Invalid timezone offset".to_string()))?;
    println!(
        "Checking forms in {} ({})",
        config.forms_dir.display(),
        Utc::now().with_timezone(&offset).format("%Y.%m.%d %H:%M")
    );

    let paths = discover_forms(&config.forms_dir)?;
    println!("Found {} form definitions.", paths.len());

    let store = JsonFileStore::new(&config.errors_dir);

    // Forms are independent: one validator per form, in parallel.
    let outcomes: Vec<_> = paths
        .par_iter()
        .map(|path| check_form(path, &store, &config))
        .collect();

    let mut result = CheckResult::new();
    for outcome in outcomes {
        match outcome {
            Ok(report) => result.record_report(report),
            Err(e) => {
                if e.is_recoverable() {
                    tracing::warn!(error = %e, "skipping form definition");
                }
                result.record_failure(e);
            }
        }
    }

    let duration = start_time.elapsed();

    match result.finalize(&config.forms_dir) {
        Ok(summary) => {
            summary.print_report();
            println!("Done! Checked in {duration:.2?}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Check failed: {}", e);
            Err(e)
        }
    }
}

/// Every `*.json` file in `dir`, sorted by path.
fn discover_forms(dir: &Path) -> Result<Vec<PathBuf>, FormError> {
    let entries = fs::read_dir(dir).map_err(|e| FormError::FormsDirNotReadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(FormError::NoForms {
            path: dir.to_path_buf(),
        });
    }
    Ok(paths)
}

/// Read, validate and persist one form.
fn check_form(path: &Path, store: &dyn ErrorStore, config: &Config) -> Result<FormReport, FormError> {
    let parse_failed = |message: String| FormError::FormParseFailed {
        path: path.to_path_buf(),
        message,
    };

    let text = fs::read_to_string(path).map_err(|e| parse_failed(format!("Failed to read file: {e}")))?;
    let mut form = ApplicationForm::from_json(&text).map_err(|e| parse_failed(e.to_string()))?;

    if form.id.is_empty() {
        form.id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| parse_failed("Invalid filename".to_string()))?
            .to_string();
    }

    let mut validator = ConfigValidator::new(&form, store, config);
    let valid = validator.validate()?;

    let messages = validator
        .collect_error_messages()
        .into_iter()
        .map(|(section, messages)| (section, messages.into_iter().map(|m| m.message).collect()))
        .collect();

    tracing::debug!(form = %form.id, valid, errors = validator.count_errors(), "checked form");

    Ok(FormReport {
        form_id: form.id.clone(),
        title: form.title.clone(),
        valid,
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_FORM: &str = r#"{
        "id": "contact",
        "title": "Contact",
        "form": "<label>Name [text* your-name]</label>",
        "mail": {
            "active": true,
            "subject": "Hello [your-name]",
            "sender": "Site <wordpress@example.com>",
            "recipient": "admin@example.com",
            "body": "From [your-name]"
        }
    }"#;

    #[test]
    fn checks_a_directory_of_forms() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("contact.json"), VALID_FORM).unwrap();
        fs::write(
            dir.path().join("broken.json"),
            r#"{"id": "broken", "mail": {"active": true, "sender": "nobody", "body": "x"}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let config = Config::new()
            .forms_dir(dir.path())
            .errors_dir(dir.path().join(".errors"))
            .site_domain("example.com");
        let store = JsonFileStore::new(&config.errors_dir);

        let paths = discover_forms(&config.forms_dir).unwrap();
        assert_eq!(paths.len(), 2);

        let reports: Vec<_> = paths
            .iter()
            .map(|p| check_form(p, &store, &config).unwrap())
            .collect();
        let broken = reports.iter().find(|r| r.form_id == "broken").unwrap();
        let contact = reports.iter().find(|r| r.form_id == "contact").unwrap();

        assert!(contact.valid);
        assert!(!store.path_for("contact").exists());
        assert!(!broken.valid);
        assert!(broken.messages.iter().any(|(section, _)| section == "mail.sender"));
        assert!(store.path_for("broken").exists());
    }

    #[test]
    fn unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_forms(&dir.path().join("missing")),
            Err(FormError::FormsDirNotReadable { .. })
        ));
        assert!(matches!(discover_forms(dir.path()), Err(FormError::NoForms { .. })));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ nope").unwrap();
        let err = check_form(&bad, &JsonFileStore::new(dir.path()), &Config::new()).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn missing_id_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.json");
        fs::write(&path, r#"{"title": "Feedback", "form": "[textarea message]"}"#).unwrap();
        let store = JsonFileStore::new(dir.path().join(".errors"));
        let report = check_form(&path, &store, &Config::new()).unwrap();
        assert_eq!(report.form_id, "feedback");
        assert!(report.valid);
    }
}
