//! Namespace configuration
//!
//! Loaded from a RON file, e.g.
//!
//! ```text
//! (
//!   types: ["Level", "Moby", "Texture"],
//!   max_reference_hops: 32,
//! )
//! ```
//!
//! Missing fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::asset::TypeRegistry;

/// Asset types registered when no configuration says otherwise
pub const DEFAULT_TYPES: &[&str] = &[
    "Build",
    "Camera",
    "Gameplay",
    "Level",
    "LevelWad",
    "Material",
    "Mesh",
    "Moby",
    "MobyClass",
    "Shrub",
    "ShrubClass",
    "Sky",
    "Sound",
    "Texture",
    "Tie",
    "TieClass",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Named asset types documents may use
    pub types: Vec<String>,
    /// Reference chains longer than this are reported as cycles
    pub max_reference_hops: usize,
    /// Extension of document files, without the dot
    pub document_extension: String,
    /// Pack metadata file at the root of every pack
    pub metadata_file: String,
    /// Lock file name for directory packs
    pub lock_file: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            types: DEFAULT_TYPES.iter().map(|t| t.to_string()).collect(),
            max_reference_hops: 64,
            document_extension: "asset".to_string(),
            metadata_file: "pack.ron".to_string(),
            lock_file: crate::storage::local::LOCK_FILE.to_string(),
        }
    }
}

impl NamespaceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn type_registry(&self) -> TypeRegistry {
        TypeRegistry::with_types(self.types.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NamespaceConfig::default();
        assert_eq!(config.max_reference_hops, 64);
        assert_eq!(config.document_extension, "asset");
        assert!(config.type_registry().contains("Level"));
    }

    #[test]
    fn test_partial_override() {
        let config = NamespaceConfig::from_ron_str("(types: [\"Widget\"], max_reference_hops: 4)").unwrap();
        assert_eq!(config.max_reference_hops, 4);
        assert_eq!(config.metadata_file, "pack.ron");
        let registry = config.type_registry();
        assert!(registry.contains("Widget"));
        assert!(!registry.contains("Level"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overlay.ron");
        std::fs::write(&path, "(lock_file: \"pack.lock\")").unwrap();
        assert_eq!(NamespaceConfig::load(&path).unwrap().lock_file, "pack.lock");

        assert!(matches!(
            NamespaceConfig::load(&dir.path().join("missing.ron")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            NamespaceConfig::from_ron_str("(max_reference_hops: \"lots\")"),
            Err(ConfigError::Parse(_))
        ));
    }
}
