//! Persistence of configuration errors, one record per form.
//!
//! Saving overwrites: an empty map deletes the record, anything else
//! replaces it entirely.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::config_validator::{ConfigError, ErrorArgs, ErrorCode, ErrorMap};
use crate::error::FormError;

/// Load/save interface keeping the validator free of storage concerns.
pub trait ErrorStore: Send + Sync {
    fn load(&self, form_id: &str) -> Result<ErrorMap, FormError>;
    fn save(&self, form_id: &str, errors: &ErrorMap) -> Result<(), FormError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ErrorMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record exists for `form_id`.
    pub fn contains(&self, form_id: &str) -> bool {
        self.records
            .lock()
            .map(|records| records.contains_key(form_id))
            .unwrap_or(false)
    }
}

impl ErrorStore for MemoryStore {
    fn load(&self, form_id: &str) -> Result<ErrorMap, FormError> {
        let records = self
            .records
            .lock()
            .map_err(|_| FormError::Internal("error store lock poisoned".to_string()))?;
        Ok(records.get(form_id).cloned().unwrap_or_default())
    }

    fn save(&self, form_id: &str, errors: &ErrorMap) -> Result<(), FormError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| FormError::Internal("error store lock poisoned".to_string()))?;
        if errors.is_empty() {
            records.remove(form_id);
        } else {
            records.insert(form_id.to_string(), errors.clone());
        }
        Ok(())
    }
}

/// One JSON file per form: `<dir>/<form_id>.config-errors.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File holding the record of `form_id`. Bytes outside
    /// `[A-Za-z0-9_-]` are written as `%XX`, so distinct ids never share a
    /// file.
    pub fn path_for(&self, form_id: &str) -> PathBuf {
        let mut stem = String::with_capacity(form_id.len());
        for b in form_id.bytes() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                stem.push(b as char);
            } else {
                stem.push_str(&format!("%{b:02X}"));
            }
        }
        self.dir.join(format!("{stem}.config-errors.json"))
    }
}

impl ErrorStore for JsonFileStore {
    fn load(&self, form_id: &str) -> Result<ErrorMap, FormError> {
        let path = self.path_for(form_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ErrorMap::new()),
            Err(source) => {
                return Err(FormError::StoreRead {
                    form_id: form_id.to_string(),
                    source,
                });
            }
        };

        let persisted: IndexMap<String, PersistedSection> =
            serde_json::from_str(&text).map_err(|source| FormError::StoreCorrupt {
                form_id: form_id.to_string(),
                source,
            })?;
        Ok(decode(persisted))
    }

    fn save(&self, form_id: &str, errors: &ErrorMap) -> Result<(), FormError> {
        let path = self.path_for(form_id);
        let write_err = |source| FormError::StoreWrite {
            form_id: form_id.to_string(),
            source,
        };

        if errors.is_empty() {
            return match fs::remove_file(&path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(write_err(e)),
                _ => Ok(()),
            };
        }

        let json = serde_json::to_string_pretty(errors)
            .map_err(|e| FormError::Internal(format!("cannot encode error metadata: {e}")))?;
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        fs::write(&path, json).map_err(write_err)?;
        tracing::debug!(form_id, path = %path.display(), "saved configuration errors");
        Ok(())
    }
}

/// A section as found on disk. Older records store a bare code per section.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PersistedSection {
    Entries(Vec<PersistedEntry>),
    Legacy(u32),
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct PersistedEntry {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    args: serde_json::Value,
}

/// Normalize persisted sections: empty sections and entries without a
/// code are dropped; legacy bare codes become one error.
fn decode(persisted: IndexMap<String, PersistedSection>) -> ErrorMap {
    let mut errors = ErrorMap::new();

    for (section, value) in persisted {
        let entries: Vec<ConfigError> = match value {
            PersistedSection::Legacy(0) | PersistedSection::Other(_) => Vec::new(),
            PersistedSection::Legacy(code) => vec![ConfigError::new(ErrorCode::from(code))],
            PersistedSection::Entries(entries) => entries
                .into_iter()
                .filter_map(|entry| {
                    let code = entry.code.filter(|c| *c != 0)?;
                    let args = serde_json::from_value::<ErrorArgs>(entry.args).unwrap_or_default();
                    Some(ConfigError {
                        code: ErrorCode::from(code),
                        args,
                    })
                })
                .collect(),
        };

        if !entries.is_empty() {
            errors.entry(section).or_default().extend(entries);
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ErrorMap {
        let mut errors = ErrorMap::new();
        errors.insert(
            "mail.subject".to_string(),
            vec![ConfigError::new(ErrorCode::MaybeEmpty)],
        );
        errors
    }

    #[test]
    fn memory_store_overwrites_and_deletes() {
        let store = MemoryStore::new();
        store.save("7", &sample()).unwrap();
        assert!(store.contains("7"));
        assert_eq!(store.load("7").unwrap(), sample());

        store.save("7", &ErrorMap::new()).unwrap();
        assert!(!store.contains("7"));
        assert!(store.load("7").unwrap().is_empty());
    }

    #[test]
    fn json_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.load("12").unwrap().is_empty());
        store.save("12", &sample()).unwrap();
        assert!(store.path_for("12").exists());
        assert_eq!(store.load("12").unwrap(), sample());

        store.save("12", &ErrorMap::new()).unwrap();
        assert!(!store.path_for("12").exists());
        store.save("12", &ErrorMap::new()).unwrap();
    }

    #[test]
    fn persisted_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save("1", &sample()).unwrap();

        let text = fs::read_to_string(store.path_for("1")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["mail.subject"][0]["code"], 101);
        assert_eq!(value["mail.subject"][0]["args"]["message"], "");
    }

    #[test]
    fn decodes_legacy_and_partial_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        fs::write(
            store.path_for("3"),
            r#"{
                "mail.sender": 102,
                "mail.body": [],
                "form.body": [{"args": {}}, {"code": 105, "args": ""}],
                "messages.x": [{"code": 104, "args": {"link": "http://l"}}],
                "junk": "nope"
            }"#,
        )
        .unwrap();

        let errors = store.load("3").unwrap();
        assert_eq!(
            errors.keys().collect::<Vec<_>>(),
            vec!["mail.sender", "form.body", "messages.x"]
        );
        assert_eq!(errors["mail.sender"][0].code, ErrorCode::InvalidSyntax);
        assert_eq!(errors["form.body"].len(), 1);
        assert_eq!(errors["form.body"][0].args, ErrorArgs::default());
        assert_eq!(errors["messages.x"][0].args.link, "http://l");
    }

    #[test]
    fn corrupt_records_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        fs::write(store.path_for("9"), "{ not json").unwrap();
        assert!(matches!(store.load("9"), Err(FormError::StoreCorrupt { .. })));
    }

    #[test]
    fn ids_are_made_file_safe() {
        let store = JsonFileStore::new("/tmp/x");
        assert_eq!(
            store.path_for("../etc/passwd"),
            PathBuf::from("/tmp/x/%2E%2E%2Fetc%2Fpasswd.config-errors.json")
        );
        assert_eq!(store.path_for("contact_1"), PathBuf::from("/tmp/x/contact_1.config-errors.json"));
    }

    #[test]
    fn similar_ids_keep_separate_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert_ne!(store.path_for("1.0"), store.path_for("1_0"));
        assert_ne!(store.path_for("a%2E"), store.path_for("a."));

        store.save("1.0", &sample()).unwrap();
        store.save("1_0", &ErrorMap::new()).unwrap();
        assert_eq!(store.load("1.0").unwrap(), sample());
        assert!(store.load("1_0").unwrap().is_empty());
    }
}
