//! # twodo
//!
//! Command line front end: loads settings, initializes logging, opens the
//! `SQLite` store and drives the progression engine.

#![deny(unsafe_code)]

mod commands;
mod db_path;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use twodo_engine::{EngineConfig, LogOnlyScheduler, ProgressionEngine};
use twodo_settings::LogFormat;
use twodo_store::{ConnectionConfig, SqliteStore};

/// Shared quest log with XP, levels and streaks for two people.
#[derive(Parser, Debug)]
#[command(name = "twodo", version, about)]
struct Cli {
    /// Path to the `SQLite` database (defaults to `~/.twodo/twodo.db`).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage users.
    #[command(subcommand)]
    User(UserCommand),
    /// Manage duos.
    #[command(subcommand)]
    Duo(DuoCommand),
    /// Manage quests.
    #[command(subcommand)]
    Quest(QuestCommand),
    /// Expire overdue quests.
    Sweep(DuoArg),
    /// Send affection to your partner.
    Affection {
        #[command(flatten)]
        duo: DuoArg,
        /// Sender.
        #[arg(long = "from")]
        from: String,
    },
    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Levels, progress, streak and achievements.
    Status(DuoArg),
}

#[derive(Args, Debug)]
struct DuoArg {
    /// Duo ID (`{a}_{b}`).
    #[arg(long)]
    duo: String,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user.
    Create {
        /// User ID (no `.`, `/` or `_`).
        uid: String,
        /// Email address.
        #[arg(long, default_value = "")]
        email: String,
        /// Display name.
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum DuoCommand {
    /// Pair two users.
    Create {
        /// First member.
        a: String,
        /// Second member.
        b: String,
        /// `couple`, `friends` or `ld`.
        #[arg(long, default_value = "couple")]
        kind: String,
    },
    /// Set the relationship start date (`YYYY-MM-DD`); omit to clear.
    Since {
        #[command(flatten)]
        duo: DuoArg,
        /// Start date.
        date: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum QuestCommand {
    /// Create a quest.
    Add {
        #[command(flatten)]
        duo: DuoArg,
        /// Title.
        title: String,
        /// Owner.
        #[arg(long)]
        owner: String,
        /// Creator (defaults to the owner).
        #[arg(long = "by")]
        created_by: Option<String>,
        /// Description.
        #[arg(long, default_value = "")]
        description: String,
        /// Category ID.
        #[arg(long, default_value = "all")]
        category: String,
        /// `easy`, `medium` or `hard`.
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Due date (`YYYY-MM-DD` or RFC 3339).
        #[arg(long)]
        due: Option<String>,
    },
    /// Edit an active quest.
    Edit {
        #[command(flatten)]
        duo: DuoArg,
        /// Quest ID.
        quest: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// New category.
        #[arg(long)]
        category: Option<String>,
        /// New priority.
        #[arg(long)]
        priority: Option<String>,
        /// New due date.
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date.
        #[arg(long)]
        clear_due: bool,
    },
    /// Complete a quest you own.
    Complete(ActorQuest),
    /// Undo a completion.
    Undo(ActorQuest),
    /// Soft-delete a quest.
    Delete {
        #[command(flatten)]
        duo: DuoArg,
        /// Quest ID.
        quest: String,
    },
    /// List quests.
    List {
        #[command(flatten)]
        duo: DuoArg,
        /// Only this owner's quests.
        #[arg(long)]
        owner: Option<String>,
        /// Only this status.
        #[arg(long)]
        status: Option<String>,
        /// Only this category.
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ActorQuest {
    #[command(flatten)]
    duo: DuoArg,
    /// Quest ID.
    quest: String,
    /// Acting user.
    #[arg(long = "as")]
    actor: String,
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// Add a custom category.
    Add {
        #[command(flatten)]
        duo: DuoArg,
        /// Display name.
        name: String,
        /// Emoji icon.
        #[arg(long, default_value = "📌")]
        icon: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = twodo_settings::load_settings().context("Failed to load settings")?;
    match settings.logging.format {
        LogFormat::Compact => twodo_core::logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => twodo_core::logging::init_json_subscriber(&settings.logging.level),
    }

    let db_path = db_path::resolve(args.db.clone(), &settings.store.db_path, &twodo_settings::settings_dir());
    db_path::ensure_parent_dir(&db_path)?;
    let config = ConnectionConfig {
        pool_size: settings.store.pool_size,
        busy_timeout_ms: settings.store.busy_timeout_ms,
    };
    let store = SqliteStore::open(&db_path.to_string_lossy(), &config)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "database opened");

    let engine_config =
        EngineConfig::from_settings(&settings.progression).context("Invalid progression settings")?;
    let engine = ProgressionEngine::new(Arc::new(store))
        .with_scheduler(Arc::new(LogOnlyScheduler))
        .with_config(engine_config);

    let ctx = commands::Context {
        engine,
        json: args.json,
        sweep_first: settings.progression.sweep_on_startup,
    };
    commands::run(&ctx, args.command).await
}
