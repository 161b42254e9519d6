//! Pack metadata (`pack.ron`)
//!
//! Descriptive information stored beside the documents of a pack. Every
//! field has a default, so a pack without a metadata file, or with an older
//! one missing fields, still mounts.

use serde::{Deserialize, Serialize};

/// Version written into new metadata files
pub const FORMAT_VERSION: u32 = 1;

/// What a pack is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PackKind {
    /// Primary content unpacked from the game
    Unpacked,
    /// Override layer made by a modder
    #[default]
    Mod,
    /// Shared content other packs depend on
    Library,
    /// Build-from-source inputs
    Build,
    /// Test fixtures
    Test,
}

impl PackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackKind::Unpacked => "unpacked",
            PackKind::Mod => "mod",
            PackKind::Library => "library",
            PackKind::Build => "build",
            PackKind::Test => "test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackMetadata {
    pub format_version: u32,
    pub kind: PackKind,
    pub name: String,
    pub author: String,
    pub description: String,
    pub version: String,
    /// Names of packs that must be mounted below this one
    pub dependencies: Vec<String>,
    /// Preview images, relative to the pack root
    pub images: Vec<String>,
    /// Builds this pack provides
    pub builds: Vec<String>,
}

impl Default for PackMetadata {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            kind: PackKind::default(),
            name: String::new(),
            author: String::new(),
            description: String::new(),
            version: String::new(),
            dependencies: Vec::new(),
            images: Vec::new(),
            builds: Vec::new(),
        }
    }
}

impl PackMetadata {
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .indentor("  ".to_string());
        ron::ser::to_string_pretty(self, config)
    }
}
