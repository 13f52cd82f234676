use crate::storage::format::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Options for writing and reading indexes, loadable from a JSON file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexOptions {
    /// Block version new indexes are written with.
    pub version: Version,
    pub verify_checksums: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            version: Version::V1_1,
            verify_checksums: true,
        }
    }
}

impl IndexOptions {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = IndexOptions::from_json_str("{}").unwrap();
        assert_eq!(options, IndexOptions::default());
        assert_eq!(options.version, Version::V1_1);
        assert!(options.verify_checksums);
    }

    #[test]
    fn test_partial_override() {
        let options = IndexOptions::from_json_str(r#"{ "version": "1.0" }"#).unwrap();
        assert_eq!(options.version, Version::V1_0);
        assert!(options.verify_checksums);
    }

    #[test]
    fn test_rejects_unknown_version_and_fields() {
        assert!(matches!(
            IndexOptions::from_json_str(r#"{ "version": "1.2" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(IndexOptions::from_json_str(r#"{ "compress": true }"#).is_err());
    }

    #[test]
    fn test_load_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("wpkgar.json");
        std::fs::write(&path, r#"{ "verify_checksums": false }"#)?;
        let options = IndexOptions::load(&path)?;
        assert!(!options.verify_checksums);
        assert!(matches!(
            IndexOptions::load(&dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
        Ok(())
    }
}
