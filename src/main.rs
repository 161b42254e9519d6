//! Command-line access to a stack of asset packs
//!
//! Usage:
//!   asset-overlay -p base -p mymod tree            # Print the merged tree
//!   asset-overlay -p base -p mymod lookup level0   # Show one entity
//!   asset-overlay -p base -p mymod check           # Report broken references
//!   asset-overlay -p base info                     # Print pack metadata
//!   asset-overlay -p base cat levels/level0.asset  # Re-serialize a document
//!   asset-overlay pack base base.pack              # Bundle a directory
//!
//! Packs are mounted in the order given, so later packs override earlier ones.
//! A directory is mounted as-is, anything else is read as a packed archive.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use asset_overlay::{
    ArchiveStorage, AssetLink, DirectoryStorage, Namespace, NamespaceConfig, NodeId, PackId,
};

#[derive(Parser)]
#[command(name = "asset-overlay")]
#[command(about = "Inspect layered asset packs")]
struct Cli {
    /// Namespace configuration (RON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pack directory or archive, lowest precedence first
    #[arg(short, long = "pack", global = true)]
    packs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the logical tree
    Tree {
        /// Start from this link instead of the root
        link: Option<String>,
    },
    /// Resolve a link and print the entity it names
    Lookup {
        link: String,
        /// Link of the node prefixed links are resolved against
        #[arg(long)]
        context: Option<String>,
    },
    /// Mount every pack and resolve every reference
    Check,
    /// Print the metadata of every pack
    Info,
    /// Print a document of the highest pack as it would be written
    Cat {
        /// Document path inside the pack
        document: String,
    },
    /// Bundle a pack directory into a single archive file
    Pack { dir: PathBuf, out: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => NamespaceConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => NamespaceConfig::default(),
    };

    match cli.command {
        Commands::Tree { link } => tree(&mount_all(config, &cli.packs)?, link.as_deref()),
        Commands::Lookup { link, context } => {
            lookup(&mount_all(config, &cli.packs)?, &link, context.as_deref())
        }
        Commands::Check => check(&mount_all(config, &cli.packs)?),
        Commands::Info => info(&mount_all(config, &cli.packs)?),
        Commands::Cat { document } => cat(&mount_all(config, &cli.packs)?, &document),
        Commands::Pack { dir, out } => pack(&config, &dir, &out),
    }
}

/// Mount every pack read-only, in order
fn mount_all(config: NamespaceConfig, packs: &[PathBuf]) -> Result<Namespace> {
    if packs.is_empty() {
        bail!("No packs given (use --pack <dir|archive>)");
    }
    let lock_file = config.lock_file.clone();
    let mut namespace = Namespace::with_config(config);
    for path in packs {
        let mounted = if path.is_dir() {
            namespace.mount(DirectoryStorage::new(path).with_lock_file(lock_file.as_str()), false)
        } else {
            let archive = ArchiveStorage::open(path)
                .with_context(|| format!("Failed to open archive {}", path.display()))?;
            namespace.mount(archive, false)
        };
        mounted.with_context(|| format!("Failed to mount {}", path.display()))?;
    }
    Ok(namespace)
}

fn resolve(namespace: &Namespace, link: &str, context: Option<NodeId>) -> Result<NodeId> {
    let link = AssetLink::parse(link).with_context(|| format!("Invalid link '{}'", link))?;
    Ok(namespace.lookup(&link, context)?)
}

fn root(namespace: &Namespace) -> Result<NodeId> {
    namespace
        .any_root()
        .context("Namespace has no documents")
}

// ─── Commands ───────────────────────────────────────────────────────────────

fn tree(namespace: &Namespace, link: Option<&str>) -> Result<()> {
    let start = match link {
        Some(link) => resolve(namespace, link, None)?,
        None => root(namespace)?,
    };
    print_tree(namespace, start, 0)
}

fn print_tree(namespace: &Namespace, node: NodeId, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    for child in namespace.logical_child_nodes(node) {
        let tag = namespace.node(child).tag();
        match namespace.resolve_references(child) {
            Ok(target) if target == child => {
                println!("{}{} {}", indent, namespace.logical_type(child), tag);
                print_tree(namespace, child, depth + 1)?;
            }
            Ok(target) => println!("{}{} -> {}", indent, tag, namespace.absolute_link(target)),
            Err(e) => println!("{}{} -> ({})", indent, tag, e),
        }
    }
    Ok(())
}

fn lookup(namespace: &Namespace, link: &str, context: Option<&str>) -> Result<()> {
    let context = match context {
        Some(context) => Some(resolve(namespace, context, None)?),
        None => None,
    };
    let node = resolve(namespace, link, context)?;

    println!("{} {}", namespace.logical_type(node), namespace.absolute_link(node));
    for (key, value) in namespace.logical_attributes(node) {
        println!("  {}: {}", key, value);
    }

    println!("defined in:");
    for member in namespace.chain_downward(node) {
        let pack = namespace.pack_of(member);
        let document = namespace.document_of(member);
        println!(
            "  [{}] {} ({}){}",
            pack.index(),
            document.path(),
            describe_pack(namespace, pack),
            if namespace.node(member).physical_type().is_placeholder() { "" } else { " *" }
        );
    }
    Ok(())
}

fn check(namespace: &Namespace) -> Result<()> {
    let broken = namespace.broken_references(root(namespace)?);
    for (node, e) in &broken {
        println!("{}: {}", namespace.absolute_link(*node), e);
    }
    if !broken.is_empty() {
        bail!("{} broken link(s)", broken.len());
    }
    println!("OK ({} nodes in {} packs)", namespace.node_count(), namespace.packs().len());
    Ok(())
}

fn info(namespace: &Namespace) -> Result<()> {
    for pack in namespace.packs() {
        let meta = pack.metadata();
        println!("[{}] {}", pack.id().index(), pack.description());
        println!("  name:        {}", meta.name);
        println!("  kind:        {}", meta.kind.as_str());
        println!("  version:     {}", meta.version);
        println!("  author:      {}", meta.author);
        println!("  description: {}", meta.description);
        if !meta.dependencies.is_empty() {
            println!("  depends on:  {}", meta.dependencies.join(", "));
        }
        println!("  documents:   {}", pack.documents().len());
    }
    Ok(())
}

fn cat(namespace: &Namespace, document: &str) -> Result<()> {
    let Some(top) = namespace.packs().last() else {
        bail!("No packs mounted");
    };
    let Some(id) = namespace.find_document(top.id(), document) else {
        bail!("No document '{}' in {}", document, top.description());
    };
    print!("{}", namespace.serialize_document(id));
    Ok(())
}

fn pack(config: &NamespaceConfig, dir: &Path, out: &Path) -> Result<()> {
    let archive = ArchiveStorage::pack_directory(dir, &config.lock_file)
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    archive
        .save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Packed {} files into {}", archive.len(), out.display());
    Ok(())
}

fn describe_pack(namespace: &Namespace, id: PackId) -> String {
    namespace
        .pack(id)
        .map(|pack| pack.description())
        .unwrap_or_default()
}
