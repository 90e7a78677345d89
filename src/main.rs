use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use arrange::config::{get_config_path, AppConfig};
use arrange::db::Database;
use arrange::driver::{DragSession, Edit, Reconciled, Reconciler};
use arrange::models::{
    CollectionKind, ContainerRef, DragPayload, DragSource, DropInstruction, DropLocation,
    DropTarget, MemberKind, Operation, Workspace,
};
use arrange::{render, tree};

#[derive(Parser)]
#[command(name = "arrange")]
#[command(about = "Reorder, nest, and move members of ordered trees and lists")]
struct Cli {
    /// SQLite database file (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new root collection
    Root {
        name: String,
        #[arg(short, long, value_enum, default_value = "tree")]
        kind: KindArg,
    },
    /// Append a member to a root or an interior member
    Add {
        name: String,
        #[arg(long)]
        root: Uuid,
        /// Interior member to add under; the root itself when omitted
        #[arg(long)]
        parent: Option<Uuid>,
        /// Create a member that can own children
        #[arg(long)]
        interior: bool,
    },
    /// Print every root with member orders
    Show {
        /// Include ids
        #[arg(long)]
        ids: bool,
    },
    /// Drop a member relative to another member or into a container, or a
    /// root before or after another root
    Drop {
        source: Uuid,
        #[command(flatten)]
        target: DropArgs,
    },
    /// Rename a member
    Rename { id: Uuid, name: String },
    /// Delete a member and everything under it
    Delete { id: Uuid },
    /// Validate ordering, naming, and path invariants
    Check,
    /// Update and save the config file
    Config {
        /// Database file used when --db is not given
        #[arg(long)]
        database: Option<PathBuf>,
        /// Tracing filter used when RUST_LOG is unset
        #[arg(long)]
        log_filter: Option<String>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct DropArgs {
    /// Place before this member (or root)
    #[arg(long)]
    before: Option<Uuid>,
    /// Place after this member (or root)
    #[arg(long)]
    after: Option<Uuid>,
    /// Re-parent into this interior member, as its last child
    #[arg(long)]
    into: Option<Uuid>,
    /// Re-parent directly under this root, as its last member
    #[arg(long)]
    into_root: Option<Uuid>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Tree,
    Flat,
    Grouped,
}

impl From<KindArg> for CollectionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Tree => CollectionKind::Tree,
            KindArg::Flat => CollectionKind::FlatList,
            KindArg::Grouped => CollectionKind::GroupedList,
        }
    }
}

/// Initialize tracing on stderr so stdout carries only command output
fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

/// Build the payload a UI would attach when picking up `source`.
fn payload_for(workspace: &Workspace, source: Uuid) -> anyhow::Result<DragPayload> {
    if workspace.root(source).is_some() {
        return Ok(DragPayload::Root(source));
    }
    let located = workspace
        .locate(source)
        .with_context(|| format!("Member {source} not found"))?;
    let drag = DragSource {
        container: located.container,
        member_id: source,
    };
    let kind = workspace
        .kind_of(located.container)
        .with_context(|| format!("Root of {source} not found"))?;

    Ok(match (kind, located.member.kind) {
        (CollectionKind::Tree, _) => DragPayload::TreeNode(drag),
        (CollectionKind::GroupedList, MemberKind::Interior) => DragPayload::GroupedList(drag),
        (CollectionKind::FlatList | CollectionKind::GroupedList, _) => {
            DragPayload::FlatListItem(drag)
        }
    })
}

fn location_for(workspace: &Workspace, args: &DropArgs) -> anyhow::Result<DropLocation> {
    let on_member = |id: Uuid, operation: Operation| -> anyhow::Result<DropLocation> {
        if workspace.root(id).is_some() {
            return Ok(DropLocation::single(
                DropTarget::Root { root: id },
                DropInstruction::new(operation),
            ));
        }
        let located = workspace
            .locate(id)
            .with_context(|| format!("Member {id} not found"))?;
        Ok(DropLocation::single(
            DropTarget::Member {
                container: located.container,
                member_id: id,
            },
            DropInstruction::new(operation),
        ))
    };

    match (args.before, args.after, args.into, args.into_root) {
        (Some(id), ..) => on_member(id, Operation::ReorderBefore),
        (_, Some(id), ..) => on_member(id, Operation::ReorderAfter),
        (_, _, Some(id), _) => on_member(id, Operation::Combine),
        (_, _, _, Some(root)) => Ok(DropLocation::single(
            DropTarget::Root { root },
            DropInstruction::new(Operation::Combine),
        )),
        _ => anyhow::bail!("No drop target given"),
    }
}

fn report(outcome: &Reconciled) {
    if outcome.is_noop() {
        println!("No change");
    } else {
        println!(
            "Committed {} commands in {} batches",
            outcome.command_count(),
            outcome.batches.len() + usize::from(outcome.root_batch.is_some())
        );
    }
}

fn save_config(
    mut config: AppConfig,
    database: Option<PathBuf>,
    log_filter: Option<String>,
) -> anyhow::Result<()> {
    if let Some(path) = database {
        config.database_path = Some(path);
    }
    if let Some(filter) = log_filter {
        config.log_filter = filter;
    }
    config.save()?;
    println!("{}", get_config_path()?.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();
    init_tracing(&config.log_filter);

    let command = match cli.command {
        Commands::Config {
            database,
            log_filter,
        } => return save_config(config, database, log_filter),
        command => command,
    };

    let db = open_database(cli.db.or(config.database_path))?;

    match command {
        Commands::Root { name, kind } => {
            let root = db.create_root(&name, kind.into())?;
            println!("{}", root.id);
        }
        Commands::Add {
            name,
            root,
            parent,
            interior,
        } => {
            let mut workspace = db.load_workspace()?;
            let reconciler = Reconciler::new(db.clone());
            let container = match parent {
                Some(node) => ContainerRef::node(root, node),
                None => ContainerRef::root(root),
            };
            let kind = if interior {
                MemberKind::Interior
            } else {
                MemberKind::Leaf
            };
            let outcome = reconciler
                .edit(
                    &mut workspace,
                    Edit::Add {
                        container,
                        name,
                        kind,
                    },
                )
                .await?;
            if let Some(id) = outcome.created {
                println!("{id}");
            }
        }
        Commands::Show { ids } => {
            let workspace = db.load_workspace()?;
            print!("{}", render::render_workspace(&workspace, ids));
        }
        Commands::Drop { source, target } => {
            let mut workspace = db.load_workspace()?;
            let reconciler = Reconciler::new(db.clone());
            let payload = payload_for(&workspace, source)?;
            let location = location_for(&workspace, &target)?;

            let mut session = DragSession::start(payload);
            let outcome = reconciler
                .handle_drop(&mut session, &mut workspace, &location)
                .await?;
            report(&outcome);
        }
        Commands::Rename { id, name } => {
            let mut workspace = db.load_workspace()?;
            let reconciler = Reconciler::new(db.clone());
            let outcome = reconciler
                .edit(&mut workspace, Edit::Rename { id, name })
                .await?;
            report(&outcome);
        }
        Commands::Delete { id } => {
            let mut workspace = db.load_workspace()?;
            let reconciler = Reconciler::new(db.clone());
            let outcome = reconciler.edit(&mut workspace, Edit::Delete { id }).await?;
            report(&outcome);
        }
        Commands::Check => {
            let workspace = db.load_workspace()?;
            let violations = tree::validate(&workspace);
            for violation in &violations {
                println!("{violation}");
            }
            if !violations.is_empty() {
                anyhow::bail!("{} invariant violations", violations.len());
            }
            println!("OK");
        }
        // Saved before the database is opened
        Commands::Config { .. } => {}
    }

    Ok(())
}
