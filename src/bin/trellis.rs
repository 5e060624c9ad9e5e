//! Trellis CLI: drive the graph consistency engine against a SQLite file.
//!
//! Usage:
//!   trellis vertex create <owner> [--db path]
//!   trellis subgraph <center> [--depth n] [--level public ...]
//!   trellis center list owner <user>
//!
//! Results are printed as JSON on stdout; logs go to stderr (`RUST_LOG`).

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use trellis::{
    ElementId, EngineConfig, GraphEngine, GraphError, OpenStore, ShareLevel, SqliteStore, TagSpec,
    TracingIndexSink,
};

#[derive(Parser)]
#[command(
    name = "trellis",
    version,
    about = "Consistency engine for a personal, shareable knowledge graph"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and inspect vertices
    Vertex {
        #[command(subcommand)]
        action: VertexAction,
    },
    /// Relate two existing vertices
    Relate { source: String, destination: String },
    /// Set the label of an element
    Label { id: String, label: String },
    /// Set the share level of an element
    Share {
        id: String,
        #[arg(value_enum)]
        level: Level,
    },
    /// Attach or detach tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Print the neighborhood of a vertex or tag
    Subgraph {
        center: String,
        /// Maximum hop count (defaults to the configured depth)
        #[arg(long)]
        depth: Option<i32>,
        /// Allowed share levels (defaults to all)
        #[arg(long = "level", value_enum)]
        levels: Vec<Level>,
    },
    /// Make or undo patterns
    Pattern {
        #[command(subcommand)]
        action: PatternAction,
    },
    /// Merge a vertex into another
    Merge { source: String, target: String },
    /// Copy a subgraph into a user's graph
    Fork { root: String, requester: String },
    /// Record and list centers
    Center {
        #[command(subcommand)]
        action: CenterAction,
    },
}

#[derive(Subcommand)]
enum VertexAction {
    /// Create a private vertex
    Create { owner: String },
    /// Create a vertex linked from an existing one
    Child { source: String },
    /// Show any element
    Show { id: String },
    /// Remove an element and its cascades
    Remove { id: String },
}

#[derive(Subcommand)]
enum TagAction {
    /// Attach a tag identified by an external URI
    Add {
        id: String,
        external_uri: String,
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Detach a tag
    Remove { id: String, external_uri: String },
}

#[derive(Subcommand)]
enum PatternAction {
    Make { id: String },
    Undo { id: String },
}

#[derive(Subcommand)]
enum CenterAction {
    /// Mark an element as centered now and count a visit
    Touch { id: String },
    /// List centers
    List {
        #[command(subcommand)]
        scope: CenterScope,
        #[arg(long, global = true)]
        limit: Option<usize>,
        #[arg(long, global = true, default_value_t = 0)]
        skip: usize,
    },
}

#[derive(Subcommand)]
enum CenterScope {
    /// Every center of one user
    Owner { user: String },
    /// Public centers, optionally of one user
    Public { user: Option<String> },
    /// Centered patterns
    Patterns,
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Private,
    Friends,
    Public,
}

impl From<Level> for ShareLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Private => ShareLevel::Private,
            Level::Friends => ShareLevel::Friends,
            Level::Public => ShareLevel::Public,
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trellis=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_engine(cli: &Cli) -> Result<GraphEngine, String> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }
    let db_path = config.resolved_db_path();
    let store =
        SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(GraphEngine::new(Arc::new(store))
        .with_index_sink(Arc::new(TracingIndexSink))
        .with_config(config))
}

fn id(raw: &str) -> Result<ElementId, GraphError> {
    Ok(ElementId::parse(raw)?)
}

fn print<T: Serialize>(value: &T) -> Result<(), GraphError> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: {}", e),
    }
    Ok(())
}

fn run(engine: &GraphEngine, command: Commands) -> Result<(), GraphError> {
    match command {
        Commands::Vertex { action } => match action {
            VertexAction::Create { owner } => print(&engine.create_vertex(&owner)?),
            VertexAction::Child { source } => {
                print(&engine.add_vertex_and_relation(&id(&source)?)?)
            }
            VertexAction::Show { id: raw } => print(&engine.get(&id(&raw)?)?),
            VertexAction::Remove { id: raw } => engine.remove(&id(&raw)?),
        },
        Commands::Relate {
            source,
            destination,
        } => print(&engine.add_relation(&id(&source)?, &id(&destination)?)?),
        Commands::Label { id: raw, label } => engine.set_label(&id(&raw)?, &label),
        Commands::Share { id: raw, level } => engine.set_share_level(&id(&raw)?, level.into()),
        Commands::Tag { action } => match action {
            TagAction::Add {
                id: raw,
                external_uri,
                label,
            } => {
                let spec = TagSpec::new(external_uri).with_label(label);
                print(&engine.add_tag(&id(&raw)?, &spec)?)
            }
            TagAction::Remove {
                id: raw,
                external_uri,
            } => print(&engine.remove_tag(&id(&raw)?, &external_uri)?),
        },
        Commands::Subgraph {
            center,
            depth,
            levels,
        } => {
            let depth = depth.unwrap_or_else(|| {
                i32::try_from(engine.config().default_depth).unwrap_or(i32::MAX)
            });
            let levels: Vec<ShareLevel> = if levels.is_empty() {
                ShareLevel::ALL.to_vec()
            } else {
                levels.into_iter().map(ShareLevel::from).collect()
            };
            print(&engine.extract_subgraph(&id(&center)?, depth, &levels)?)
        }
        Commands::Pattern { action } => match action {
            PatternAction::Make { id: raw } => print(&engine.make_pattern(&id(&raw)?)?),
            PatternAction::Undo { id: raw } => print(&engine.undo_pattern(&id(&raw)?)?),
        },
        Commands::Merge { source, target } => {
            print(&engine.merge_to(&id(&source)?, &id(&target)?)?)
        }
        Commands::Fork { root, requester } => print(&engine.fork(&id(&root)?, &requester)?),
        Commands::Center { action } => match action {
            CenterAction::Touch { id: raw } => {
                let element = id(&raw)?;
                engine.update_last_center_date(&element)?;
                print(&engine.increment_number_of_visits(&element)?)
            }
            CenterAction::List { scope, limit, skip } => {
                let mut query = engine.centers().skip(skip);
                if let Some(limit) = limit {
                    query = query.limit(limit);
                }
                let entries = match scope {
                    CenterScope::Owner { user } => query.for_owner(&user)?,
                    CenterScope::Public { user: Some(user) } => query.public_of_user(&user)?,
                    CenterScope::Public { user: None } => query.public()?,
                    CenterScope::Patterns => query.patterns()?,
                };
                print(&entries)
            }
        },
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let engine = match open_engine(&cli) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = run(&engine, cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
