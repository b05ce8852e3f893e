//! Loading schema, configuration, filter and row files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use sift::EngineError;
use sift_core::store::StoreError;
use sift_proto::{Condition, FilterDocument, Value};
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render output: {0}")]
    Render(#[source] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read and deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A filter file: either a versioned document or a bare condition list.
#[derive(Deserialize)]
#[serde(untagged)]
enum FilterFile {
    Document(FilterDocument),
    Conditions(Vec<Condition>),
}

/// Load a filter file.
///
/// A bare list of conditions predates versioning and is read as a legacy
/// document.
pub fn load_filter(path: &Path) -> Result<FilterDocument, CliError> {
    Ok(match load_json::<FilterFile>(path)? {
        FilterFile::Document(document) => document,
        FilterFile::Conditions(conditions) => {
            FilterDocument::with_version(sift_proto::LEGACY_FILTER_VERSION, conditions)
        }
    })
}

/// Load a JSON array of rows.
pub fn load_rows(path: &Path) -> Result<Vec<Value>, CliError> {
    load_json(path)
}

/// Write a value as indented JSON.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let content = serde_json::to_string_pretty(value).map_err(CliError::Render)?;
    fs::write(path, content + "\n").map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_versioned_document() {
        let file = temp_file(r#"{"version": 2, "conditions": [{"id": "a", "field": "x", "operator": "eq", "value": 1}]}"#);
        let document = load_filter(file.path()).unwrap();
        assert_eq!(document.version, 2);
        assert_eq!(document.conditions.len(), 1);
    }

    #[test]
    fn test_bare_list_is_legacy() {
        let file = temp_file(r#"[{"id": "a", "field": "x", "operator": "equals", "value": 1}]"#);
        let document = load_filter(file.path()).unwrap();
        assert_eq!(document.version, sift_proto::LEGACY_FILTER_VERSION);
        assert_eq!(document.conditions[0].operator.as_deref(), Some("equals"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_filter(Path::new("/nonexistent/filter.json")).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }

    #[test]
    fn test_bad_json() {
        let file = temp_file("{ not json");
        let err = load_filter(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid JSON in "));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &FilterDocument::default()).unwrap();
        let document = load_filter(&path).unwrap();
        assert_eq!(document, FilterDocument::default());
    }
}
