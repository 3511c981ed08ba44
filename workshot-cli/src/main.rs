/*!
Workshot CLI - save and restore your development context.

Thin command layer over `workshot-core`: it wires up configuration, logging,
the built-in capturers and the local snapshot store, and turns results into
terminal output.
*/

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tabled::{Table, Tabled};
use tracing::debug;
use workshot_core::capture::{git, terminal};
use workshot_core::version::{resolve_version, BuildInfo};
use workshot_core::{
    create_default_engine, freeze, observability, restore, CaptureManager, FreezeOptions,
    LocalFileStorage, Metadata, RestoreOptions, Snapshot, SnapshotEngine, WorkshotConfig,
    WorkshotError,
};

/// Recent commands shown by `restore` and `show`
const MAX_DISPLAYED_COMMANDS: usize = 10;

#[derive(Parser)]
#[command(name = "workshot")]
#[command(about = "save and restore your development context")]
#[command(long_about = "workshot helps you save your development state
and restore it later with one command

examples
  workshot freeze my-work        save current context
  workshot restore my-work       restore saved context
  workshot list                  list all saved contexts
  workshot show my-work          view context details")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Snapshot store directory (defaults to ~/.workshot)
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Print the version and exit
    #[arg(short = 'V', long)]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save your current development context
    Freeze {
        /// Name of the workshot
        name: String,
        /// Overwrite if it already exists
        #[arg(short, long)]
        force: bool,
    },
    /// Restore a saved development context
    Restore {
        /// Name of the workshot
        name: String,
    },
    /// List all saved workshots
    #[command(visible_alias = "ls")]
    List,
    /// Show detailed information about a workshot
    #[command(visible_alias = "info")]
    Show {
        /// Name of the workshot
        name: String,
        /// Output raw JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Delete a saved workshot
    #[command(visible_aliases = ["rm", "remove"])]
    Delete {
        /// Name of the workshot
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// List the registered capture plugins
    Plugins,
}

#[derive(Tabled)]
struct WorkshotInfo {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Saved")]
    age: String,
    #[tabled(rename = "Directory")]
    working_dir: String,
    #[tabled(rename = "Branch")]
    branch: String,
}

impl WorkshotInfo {
    fn from_metadata(metadata: &Metadata, now: DateTime<Utc>) -> Self {
        Self {
            name: metadata.name.clone(),
            age: format_age(now - metadata.created_at),
            working_dir: metadata.working_dir.display().to_string(),
            branch: metadata.git_branch.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
struct PluginInfo {
    #[tabled(rename = "Order")]
    order: usize,
    #[tabled(rename = "Plugin")]
    name: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", resolve_version(None, &BuildInfo::current()));
        return Ok(());
    }

    // Initialize logging
    observability::init_logging(cli.verbose, cli.json_logs)?;

    let mut config = WorkshotConfig::from_env()?;
    if let Some(home) = cli.home {
        config.storage_root = Some(home);
    }
    config.validate()?;
    debug!(?config, "loaded configuration");

    let Some(command) = cli.command else {
        bail!("no command given, see `workshot --help`");
    };

    // Execute command
    match command {
        Commands::Freeze { name, force } => freeze_workshot(&config, &name, force)?,
        Commands::Restore { name } => restore_workshot(&config, &name)?,
        Commands::List => list_workshots(&config)?,
        Commands::Show { name, json } => show_workshot(&config, &name, json)?,
        Commands::Delete { name, force } => delete_workshot(&config, &name, force)?,
        Commands::Plugins => list_plugins(&config),
    }

    Ok(())
}

fn open_engine(
    config: &WorkshotConfig,
) -> Result<SnapshotEngine<LocalFileStorage>, anyhow::Error> {
    create_default_engine(config).context("failed to open workshot store")
}

fn freeze_workshot(
    config: &WorkshotConfig,
    name: &str,
    force: bool,
) -> Result<(), anyhow::Error> {
    let engine = open_engine(config)?;
    let mut manager = CaptureManager::with_default_capturers(config);

    println!("Freezing workshot '{name}'...");
    let outcome = freeze(
        name,
        &mut manager,
        &engine,
        FreezeOptions {
            force,
            working_dir: None,
        },
    )?;

    for warning in &outcome.warnings {
        println!("⚠ Warning: {warning}");
    }
    println!("✓ Workshot '{name}' saved successfully!");
    println!("   Restore it anytime with: workshot restore {name}");
    Ok(())
}

fn restore_workshot(config: &WorkshotConfig, name: &str) -> Result<(), anyhow::Error> {
    let engine = open_engine(config)?;
    let mut manager = CaptureManager::with_default_capturers(config);

    println!("↻ Restoring workshot '{name}'...\n");
    let outcome = restore(name, &mut manager, &engine, RestoreOptions::default())?;
    let snapshot = &outcome.snapshot;

    if !changed_directory_failed(&outcome.warnings) {
        println!("✓ Working directory: {}", snapshot.working_dir.display());
    }
    if let Some(branch) = &snapshot.git_branch {
        let dirty = if snapshot.git_dirty {
            " (uncommitted changes)"
        } else {
            ""
        };
        println!("✓ Git branch: {branch}{dirty}");
    }

    if !outcome.warnings.is_empty() {
        println!();
        for warning in &outcome.warnings {
            println!("⚠ Warning: {warning}");
        }
    }

    println!("\n⏱ Saved: {}", format_age(Utc::now() - snapshot.created_at));

    let commands = recent_commands(snapshot);
    if !commands.is_empty() {
        println!("\nRecent commands from this context:");
        for command in commands {
            println!("   {command}");
        }
    }

    if outcome.warnings.is_empty() {
        println!("\n✓ Context restored");
    } else {
        println!("\n⚠ Context partially restored, see warnings above");
    }
    Ok(())
}

fn list_workshots(config: &WorkshotConfig) -> Result<(), anyhow::Error> {
    let engine = open_engine(config)?;
    let entries = engine.list()?;

    if entries.is_empty() {
        println!("No saved workshots found.");
        println!("\nCreate your first workshot with:");
        println!("  workshot freeze my-work");
        return Ok(());
    }

    let now = Utc::now();
    let rows: Vec<WorkshotInfo> = entries
        .iter()
        .map(|metadata| WorkshotInfo::from_metadata(metadata, now))
        .collect();

    println!("Found {} saved workshot(s):\n", rows.len());
    println!("{}", Table::new(rows));
    println!("\nRestore any workshot with:");
    println!("  workshot restore <name>");
    Ok(())
}

fn show_workshot(config: &WorkshotConfig, name: &str, json: bool) -> Result<(), anyhow::Error> {
    let engine = open_engine(config)?;
    let snapshot = engine.load(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!(" Snapshot: {name}");
    println!(
        "   Created: {}",
        snapshot
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    println!(" Working Directory:");
    println!("   {}", snapshot.working_dir.display());
    println!();

    if let Some(branch) = &snapshot.git_branch {
        println!(" Git State:");
        println!("   Branch:  {branch}");
        let status = if snapshot.git_dirty {
            "Dirty (uncommitted changes)"
        } else {
            "Clean"
        };
        println!("   Status:  {status}");
        if let Some(remote) = &snapshot.git_remote {
            println!("   Remote:  {remote}");
        }

        let git_data = snapshot.plugin_data.get(git::PLUGIN_NAME);
        if let Some(commit) = git_data
            .and_then(|data| data.get(git::KEY_COMMIT))
            .and_then(Value::as_str)
        {
            println!("   Commit:  {commit}");
        }
        if let Some(stashes) = git_data
            .and_then(|data| data.get(git::KEY_STASH_COUNT))
            .and_then(Value::as_u64)
            .filter(|count| *count > 0)
        {
            println!("   Stashes: {stashes}");
        }
        println!();
    }

    let commands = recent_commands(&snapshot);
    if !commands.is_empty() {
        println!(" Recent Commands:");
        for command in commands {
            println!("   {command}");
        }
        println!();
    }

    println!(" Metadata:");
    println!("   Schema Version: {}", snapshot.schema_version);
    println!("   Age: {}", format_age(Utc::now() - snapshot.created_at));
    println!("   Plugins: {} active", snapshot.plugin_data.len());
    Ok(())
}

fn delete_workshot(
    config: &WorkshotConfig,
    name: &str,
    force: bool,
) -> Result<(), anyhow::Error> {
    let engine = open_engine(config)?;

    if !engine.exists(name) {
        bail!("workshot '{name}' not found");
    }

    if !force {
        print!("⚠ Are you sure you want to delete workshot '{name}'? (y/N): ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !is_confirmation(&input) {
            println!("Cancelled.");
            return Ok(());
        }
    }

    engine.delete(name)?;
    println!("✓ Deleted workshot '{name}'");
    Ok(())
}

fn list_plugins(config: &WorkshotConfig) {
    let mut manager = CaptureManager::with_default_capturers(config);
    manager.sort_by_priority();

    let rows: Vec<PluginInfo> = manager
        .list_capturers()
        .into_iter()
        .enumerate()
        .map(|(index, name)| PluginInfo {
            order: index + 1,
            name,
        })
        .collect();
    println!("{}", Table::new(rows));
}

/// Last few recorded shell commands, oldest first
fn recent_commands(snapshot: &Snapshot) -> Vec<&str> {
    let commands: Vec<&str> = snapshot
        .plugin_data
        .get(terminal::PLUGIN_NAME)
        .and_then(|data| data.get(terminal::KEY_RECENT_COMMANDS))
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let skip = commands.len().saturating_sub(MAX_DISPLAYED_COMMANDS);
    commands[skip..].to_vec()
}

fn changed_directory_failed(warnings: &[WorkshotError]) -> bool {
    warnings
        .iter()
        .any(|warning| matches!(warning, WorkshotError::ChangeDirectory { .. }))
}

fn is_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

fn format_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if hours < 1 {
        format!("{minutes} minutes ago")
    } else if days < 1 {
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{hours} hours ago")
        }
    } else if days == 1 {
        "1 day ago".to_string()
    } else {
        format!("{days} days ago")
    }
}
