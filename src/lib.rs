//! Asset Overlay
//!
//! A layered asset namespace. Content packs are mounted on top of each other
//! and read as one tree: higher packs override attributes, add children and
//! delete inherited entities without touching the files below them.
//!
//! ```text
//! Namespace
//! ├── Pack 0 (base game)   ── Document levels/level0.asset ── root ── level0 ── ...
//! ├── Pack 1 (mod)         ── Document levels/level0.asset ── root ── level0 ── ...
//! └── NodeArena            every physical node, linked into precedence chains
//! ```
//!
//! Modules:
//! - `link`: paths through the tree (`level0.moby9`, `Level:moby9`)
//! - `asset`: nodes, attribute values and asset types
//! - `text`: the `.asset` text format
//! - `storage`: where pack files live (directory, memory, archive)
//! - `pack`: packs, documents and pack metadata
//! - `namespace`: mounting, precedence chains, lookup and editing
//! - `config`: namespace configuration

pub mod asset;
pub mod config;
pub mod link;
pub mod namespace;
pub mod pack;
pub mod storage;
pub mod text;

pub use asset::{AssetNode, AssetType, AttributeValue, NodeId, TypeRegistry};
pub use config::{ConfigError, NamespaceConfig};
pub use link::{AssetLink, LinkError};
pub use namespace::{LookupError, LookupErrorKind, Namespace, PackError, RenameError};
pub use pack::{DocumentId, FileReference, PackId, PackKind, PackMetadata};
pub use storage::{ArchiveStorage, DirectoryStorage, MemoryStorage, PackStorage, StorageError};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE_LEVEL: &str = "\
Level level0 {
\theight: 10

\tMoby entity5 {
\t\tclass: 1
\t}

\tMoby moby9 {
\t\tclass: 9
\t}

\tspawn1 {
\t\tReference player {
\t\t\tasset: 'Level:moby9'
\t\t}
\t}
}
";

    fn write_pack(dir: &std::path::Path, files: &[(&str, &str)]) {
        for (path, text) in files {
            let full = dir.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, text).unwrap();
        }
    }

    #[test]
    fn test_mod_overrides_base_level() {
        let base = TempDir::new().unwrap();
        let modded = TempDir::new().unwrap();
        write_pack(base.path(), &[("levels/level0.asset", BASE_LEVEL)]);
        write_pack(
            modded.path(),
            &[(
                "levels/level0.asset",
                "Level level0 {\n\tMoby entity5 {\n\t\tstrongly_deleted: true\n\t}\n}\n",
            )],
        );

        let mut ns = Namespace::new();
        ns.mount(DirectoryStorage::new(base.path()), false).unwrap();
        ns.mount(DirectoryStorage::new(modded.path()), false).unwrap();

        let level = ns.lookup(&AssetLink::parse("level0").unwrap(), None).unwrap();
        assert_eq!(ns.logical_type(level).as_str(), "Level");
        assert_eq!(ns.attribute(level, "height"), Some(&AttributeValue::Integer(10)));

        let mut tags = Vec::new();
        ns.for_each_logical_child(level, |child| tags.push(ns.node(child).tag().to_string()))
            .unwrap();
        assert_eq!(tags, vec!["moby9", "spawn1"]);
    }

    #[test]
    fn test_reference_resolves_through_typed_ancestor() {
        let mut ns = Namespace::new();
        ns.mount(
            MemoryStorage::new()
                .with_text("levels/level0.asset", BASE_LEVEL)
                .with_text("globals.asset", "Moby moby9 {\n\tclass: 100\n}\n"),
            false,
        )
        .unwrap();

        let spawn = ns.lookup(&AssetLink::parse("level0.spawn1").unwrap(), None).unwrap();
        let player = ns.get_child(spawn, "player").unwrap();
        let expected = ns.lookup(&AssetLink::parse("level0.moby9").unwrap(), None).unwrap();
        assert_eq!(player, expected);
        assert_eq!(ns.attribute(player, "class"), Some(&AttributeValue::Integer(9)));
    }

    #[test]
    fn test_mounting_unrelated_pack_changes_nothing() {
        let mut ns = Namespace::new();
        ns.mount(MemoryStorage::new().with_text("levels/level0.asset", BASE_LEVEL), false)
            .unwrap();
        let link = AssetLink::parse("level0.spawn1.player").unwrap();
        let before = ns.lookup(&link, None).unwrap();
        let level = ns.lookup(&AssetLink::parse("level0").unwrap(), None).unwrap();
        let children_before = ns.logical_children(level).unwrap();

        ns.mount(MemoryStorage::new().with_text("other.asset", "Level level1 {\n}\n"), false)
            .unwrap();
        assert_eq!(ns.lookup(&link, None).unwrap(), before);
        let level = ns.lookup(&AssetLink::parse("level0").unwrap(), None).unwrap();
        assert_eq!(ns.logical_children(level).unwrap(), children_before);
    }
}
