//! JSON loading for models and value files.

use std::path::Path;

use serde_json::Value;

use crate::error::ModelError;

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `ModelError::FileNotFound` if the file doesn't exist,
/// or `ModelError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, ModelError> {
    if !path.exists() {
        return Err(ModelError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ModelError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| ModelError::InvalidJson { source })
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `ModelError::InvalidJson` if the string isn't valid JSON.
pub fn load_json_str(content: &str) -> Result<Value, ModelError> {
    serde_json::from_str(content).map_err(|source| ModelError::InvalidJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_json_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object"}}"#).unwrap();

        let model = load_json(file.path()).unwrap();
        assert_eq!(model["type"], "object");
    }

    #[test]
    fn load_json_file_not_found() {
        let result = load_json(Path::new("/nonexistent/model.json"));
        assert!(matches!(result, Err(ModelError::FileNotFound { .. })));
    }

    #[test]
    fn load_json_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_json(file.path());
        assert!(matches!(result, Err(ModelError::InvalidJson { .. })));
    }

    #[test]
    fn load_json_str_valid() {
        let model = load_json_str(r#"{"type": "object"}"#).unwrap();
        assert_eq!(model["type"], "object");
    }

    #[test]
    fn load_json_str_invalid() {
        let result = load_json_str("not json");
        assert!(matches!(result, Err(ModelError::InvalidJson { .. })));
    }
}
