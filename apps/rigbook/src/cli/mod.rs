//! # rigbook CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new empty catalog
//! - `status` - Show row counts per table and kind
//! - `schema` - List kinds or show the fields of one kind
//! - `create` / `update` / `delete` / `get` - Record operations
//! - `part` - Composition graph (add, remove, set, list, expand)
//! - `compat` - Compatibility graph (add, remove, from, to)
//! - `color` / `variant` - Colors and purchasable variants
//! - `price` / `review` - Retailer prices and reviews
//! - `query` - Filter, order and page records
//! - `export` / `import` - Whole-catalog snapshots

mod commands;

use crate::config::{AppConfig, Backend};
use clap::{Parser, Subcommand};
use rigbook_core::{
    Catalog, CatalogError, CatalogStore, ComponentId, MemoryStore, Privilege, RecordId, RedbStore,
    SubComponentId,
};
use std::path::{Path, PathBuf};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// rigbook - hardware component catalog
///
/// Typed component records, part-of and compatibility graphs, and a
/// filter/sort/page query engine.
#[derive(Parser, Debug)]
#[command(name = "rigbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the catalog database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// TOML config file (default: rigbook.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Include audit timestamps and internal notes in output
    #[arg(long, global = true)]
    pub privileged: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty catalog
    Init {
        /// Force initialization even if the database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show catalog status
    Status,

    /// List kinds, or show the fields of one kind
    Schema {
        /// Kind tag, e.g. CPU or PCIeSlot
        tag: Option<String>,
    },

    /// Create a record from a JSON attribute object
    Create {
        /// Kind tag, e.g. CPU or Port
        #[arg(short, long)]
        kind: String,

        /// Attributes as JSON, e.g. '{"Name": "X", "CoreTotal": 8}'
        #[arg(short, long)]
        attrs: String,
    },

    /// Patch a record; `null` clears an optional field
    Update {
        /// Record id: component#N or sub-component#N
        #[arg(short, long, value_parser = parse_record_id)]
        id: RecordId,

        #[arg(short, long)]
        attrs: String,

        /// Fail unless the stored revision matches
        #[arg(short, long)]
        revision: Option<u64>,
    },

    /// Delete a record (restricted while referenced)
    Delete {
        #[arg(short, long, value_parser = parse_record_id)]
        id: RecordId,
    },

    /// Show one record
    Get {
        #[arg(short, long, value_parser = parse_record_id)]
        id: RecordId,
    },

    /// Part-of graph operations
    #[command(subcommand)]
    Part(PartCommand),

    /// Compatibility graph operations
    #[command(subcommand)]
    Compat(CompatCommand),

    /// Color operations
    #[command(subcommand)]
    Color(ColorCommand),

    /// Variant operations
    #[command(subcommand)]
    Variant(VariantCommand),

    /// Retailer price operations
    #[command(subcommand)]
    Price(PriceCommand),

    /// Review operations
    #[command(subcommand)]
    Review(ReviewCommand),

    /// Execute a query from inline JSON or a file
    Query {
        /// Query specification as JSON
        #[arg(short, long, conflicts_with = "file")]
        spec: Option<String>,

        /// Path to a JSON query specification
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Export the catalog as a snapshot file
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a snapshot file into an empty catalog
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum PartCommand {
    /// Attach a sub-component to a parent record
    Add {
        #[arg(short, long, value_parser = parse_record_id)]
        parent: RecordId,
        #[arg(short, long)]
        child: u64,
        #[arg(long, default_value = "1")]
        quantity: u32,
    },
    /// Remove a part-of edge
    Remove {
        #[arg(short, long)]
        id: u64,
    },
    /// Change the quantity of a part-of edge
    Set {
        #[arg(short, long)]
        id: u64,
        #[arg(long)]
        quantity: u32,
        /// Revision the edge must still be at, as shown by `part list`
        #[arg(short, long)]
        revision: u64,
    },
    /// List the direct parts of a parent
    List {
        #[arg(short, long, value_parser = parse_record_id)]
        parent: RecordId,
    },
    /// Leaf sub-components with aggregated quantities
    Expand {
        #[arg(short, long, value_parser = parse_record_id)]
        parent: RecordId,
    },
}

#[derive(Subcommand, Debug)]
pub enum CompatCommand {
    /// Record that SOURCE works with TARGET
    Add {
        #[arg(short, long)]
        source: u64,
        #[arg(short, long)]
        target: u64,
    },
    Remove {
        #[arg(short, long)]
        id: u64,
    },
    /// Edges leaving a component
    From {
        #[arg(short, long)]
        component: u64,
    },
    /// Edges entering a component
    To {
        #[arg(short, long)]
        component: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ColorCommand {
    /// Add or rename a color
    Add {
        #[arg(short, long)]
        code: String,
        #[arg(short, long)]
        name: String,
    },
    Remove {
        #[arg(short, long)]
        code: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum VariantCommand {
    /// Add a purchasable variant of a component
    Add {
        #[arg(short, long)]
        component: u64,
        /// Mark the variant unavailable
        #[arg(long)]
        unavailable: bool,
        /// Price difference to the base listing, e.g. 10.50
        #[arg(short, long)]
        price_delta: Option<String>,
    },
    /// Variants of a component with their colors
    List {
        #[arg(short, long)]
        component: u64,
    },
    /// Attach a color to a variant
    Color {
        #[arg(short, long)]
        variant: u64,
        #[arg(short, long)]
        color: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum PriceCommand {
    Add {
        #[arg(short, long)]
        component: u64,
        #[arg(short, long)]
        retailer: String,
        /// Amount, e.g. 199.99
        #[arg(short, long)]
        amount: String,
    },
    List {
        #[arg(short, long)]
        component: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReviewCommand {
    Add {
        #[arg(short, long)]
        component: u64,
        /// Whole stars, 1 to 5
        #[arg(short, long)]
        rating: u8,
        #[arg(short, long, default_value = "")]
        body: String,
    },
    List {
        #[arg(short, long)]
        component: u64,
    },
}

impl Commands {
    /// Whether the command can change catalog contents.
    #[must_use]
    pub fn mutates(&self) -> bool {
        match self {
            Self::Init { .. }
            | Self::Create { .. }
            | Self::Update { .. }
            | Self::Delete { .. }
            | Self::Import { .. } => true,
            Self::Part(cmd) => matches!(
                cmd,
                PartCommand::Add { .. } | PartCommand::Remove { .. } | PartCommand::Set { .. }
            ),
            Self::Compat(cmd) => matches!(cmd, CompatCommand::Add { .. } | CompatCommand::Remove { .. }),
            Self::Color(cmd) => matches!(cmd, ColorCommand::Add { .. } | ColorCommand::Remove { .. }),
            Self::Variant(cmd) => matches!(cmd, VariantCommand::Add { .. } | VariantCommand::Color { .. }),
            Self::Price(cmd) => matches!(cmd, PriceCommand::Add { .. }),
            Self::Review(cmd) => matches!(cmd, ReviewCommand::Add { .. }),
            Self::Status
            | Self::Schema { .. }
            | Self::Get { .. }
            | Self::Query { .. }
            | Self::Export { .. } => false,
        }
    }
}

/// Parse `component#N`, `component:N`, `sub-component#N` or `sub-component:N`.
pub fn parse_record_id(text: &str) -> Result<RecordId, String> {
    let (prefix, number) = text
        .split_once(['#', ':'])
        .ok_or_else(|| format!("expected component#N or sub-component#N, got {text:?}"))?;
    let raw: u64 = number
        .parse()
        .map_err(|_| format!("invalid record number {number:?}"))?;
    match prefix {
        "component" => Ok(RecordId::Component(ComponentId(raw))),
        "sub-component" => Ok(RecordId::SubComponent(SubComponentId(raw))),
        other => Err(format!("unknown record prefix {other:?}")),
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Output settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json_mode: bool,
    pub privilege: Privilege,
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), CatalogError> {
    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(cli.database, cli.backend);
    let out = Output {
        json_mode: cli.json_mode,
        privilege: if cli.privileged {
            Privilege::Privileged
        } else {
            Privilege::Public
        },
    };
    // No subcommand - show status by default
    let command = cli.command.unwrap_or(Commands::Status);

    if let Commands::Init { force } = command {
        return cmd_init(&config, force, out);
    }

    match config.backend {
        Backend::Redb => {
            let catalog = Catalog::new(RedbStore::open(&config.database)?, config.catalog.clone())?;
            run(&catalog, &config, command, out)
        }
        Backend::File => {
            let catalog = load_file_catalog(&config.database, &config)?;
            let mutates = command.mutates();
            run(&catalog, &config, command, out)?;
            if mutates {
                save_file_catalog(&catalog, &config.database)?;
            }
            Ok(())
        }
    }
}

fn run<S: CatalogStore>(
    catalog: &Catalog<S>,
    config: &AppConfig,
    command: Commands,
    out: Output,
) -> Result<(), CatalogError> {
    match command {
        Commands::Init { force } => cmd_init(config, force, out),
        Commands::Status => cmd_status(catalog, config, out),
        Commands::Schema { tag } => cmd_schema(tag.as_deref(), out),
        Commands::Create { kind, attrs } => cmd_create(catalog, &kind, &attrs, out),
        Commands::Update {
            id,
            attrs,
            revision,
        } => cmd_update(catalog, id, &attrs, revision, out),
        Commands::Delete { id } => cmd_delete(catalog, id, out),
        Commands::Get { id } => cmd_get(catalog, id, out),
        Commands::Part(cmd) => cmd_part(catalog, cmd, out),
        Commands::Compat(cmd) => cmd_compat(catalog, cmd, out),
        Commands::Color(cmd) => cmd_color(catalog, cmd, out),
        Commands::Variant(cmd) => cmd_variant(catalog, cmd, out),
        Commands::Price(cmd) => cmd_price(catalog, cmd, out),
        Commands::Review(cmd) => cmd_review(catalog, cmd, out),
        Commands::Query { spec, file } => cmd_query(catalog, spec.as_deref(), file.as_deref(), out),
        Commands::Export { output } => cmd_export(catalog, &output, out),
        Commands::Import { input } => cmd_import(catalog, &input, out),
    }
}

// =============================================================================
// FILE BACKEND
// =============================================================================

/// Load a snapshot file into an in-memory catalog; a missing file is empty.
pub fn load_file_catalog(path: &Path, config: &AppConfig) -> Result<Catalog<MemoryStore>, CatalogError> {
    let catalog = Catalog::new(MemoryStore::new(), config.catalog.clone())?;
    if path.exists() {
        let data = read_limited(path, MAX_IMPORT_FILE_SIZE)?;
        catalog.import_snapshot(&data)?;
    }
    Ok(catalog)
}

/// Write an in-memory catalog back as a snapshot file.
pub fn save_file_catalog(catalog: &Catalog<MemoryStore>, path: &Path) -> Result<(), CatalogError> {
    let data = catalog.export_snapshot()?;
    std::fs::write(path, &data)
        .map_err(|e| CatalogError::Storage(format!("Write {}: {}", path.display(), e)))
}
