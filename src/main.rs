//! task-tree CLI
//!
//! Manages a hierarchical task list stored as a single JSON document.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use std::io::{Read, Write};
use std::sync::Arc;
use task_tree::batch::{apply_batch, parse_batch};
use task_tree::cli::export::ExportArgs;
use task_tree::cli::import::ImportArgs;
use task_tree::cli::{Cli, Command};
use task_tree::config::{Config, ConfigLoader};
use task_tree::document::{JsonFileStore, decode_document, encode_document};
use task_tree::format::{OutputFormat, format_task, format_tree, to_json_pretty};
use task_tree::logging::{LogTarget, init_logging};
use task_tree::store::{TaskStore, validate_document};
use task_tree::subscriptions::ChangeEvent;
use task_tree::types::{MoveTarget, NewTask, TaskPatch};
use tokio::sync::broadcast;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut loader = ConfigLoader::load(cli.config.as_deref())?;
    let config = loader.config_mut();

    // Override from CLI arguments
    if let Some(store) = &cli.store {
        config.store.path = store.clone();
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }

    let config = loader.into_config();
    debug!(store = %config.store.path.display(), "Using task document");

    run(config, cli.command).await
}

async fn open_store(config: &Config) -> Result<TaskStore> {
    let documents = JsonFileStore::new(&config.store.path);
    TaskStore::open(Arc::new(documents))
        .await
        .with_context(|| format!("Failed to open {}", config.store.path.display()))
}

async fn run(config: Config, command: Command) -> Result<()> {
    let format = config.output.format;
    let store = open_store(&config).await?;
    let mut changes = store.subscribe();

    match command {
        Command::List => {
            let tasks = store.get_all().await?;
            println!("{}", format_tree(&tasks, format));
        }
        Command::Show { id } => {
            let task = store
                .get_by_id(&id)
                .await?
                .ok_or_else(|| task_not_found(&id))?;
            println!("{}", format_task(&task, format));
        }
        Command::Add(args) => {
            let new = NewTask {
                title: args.title,
                description: args.description,
                parent_id: args.parent,
                order: args.order,
            };
            let task = store.create(new).await?;
            ensure_saved(&mut changes, &config)?;
            println!("{}", format_task(&task, format));
        }
        Command::Update(args) => {
            let patch = args.to_patch();
            if patch.is_empty() {
                bail!("Nothing to update: pass --title, --description, --order or --completed");
            }
            update_and_print(&store, &args.id, patch, format).await?;
            ensure_saved(&mut changes, &config)?;
        }
        Command::Complete { id } => {
            update_and_print(&store, &id, TaskPatch::completed(true), format).await?;
            ensure_saved(&mut changes, &config)?;
        }
        Command::Reopen { id } => {
            update_and_print(&store, &id, TaskPatch::completed(false), format).await?;
            ensure_saved(&mut changes, &config)?;
        }
        Command::Move(args) => {
            let target = MoveTarget {
                order: args.order,
                parent_id: args.parent,
            };
            let task = store
                .move_task(&args.id, target)
                .await?
                .ok_or_else(|| task_not_found(&args.id))?;
            ensure_saved(&mut changes, &config)?;
            println!("{}", format_task(&task, format));
        }
        Command::Delete { id } => {
            if !store.delete(&id).await? {
                return Err(task_not_found(&id));
            }
            ensure_saved(&mut changes, &config)?;
            println!("Deleted task {}", id);
        }
        Command::ClearCompleted => {
            let count = store.delete_completed().await?;
            if count > 0 {
                ensure_saved(&mut changes, &config)?;
            }
            println!("Deleted {} completed task(s)", count);
        }
        Command::Batch { file } => {
            let json = if file.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?
            };
            let ops = parse_batch(&json).context("Invalid batch document")?;
            let report = apply_batch(&store, ops).await;
            match format {
                OutputFormat::Json => println!("{}", to_json_pretty(&report)),
                OutputFormat::Markdown => println!("{}", report),
            }
            if report.unsaved > 0 {
                bail!(
                    "{} batch change(s) could not be saved to {}",
                    report.unsaved,
                    config.store.path.display()
                );
            }
            if report.failed > 0 {
                bail!("{} batch operation(s) failed", report.failed);
            }
        }
        Command::Export(args) => run_export(&store, args).await?,
        Command::Import(args) => {
            if let Some(count) = run_import(&store, &args).await? {
                ensure_saved(&mut changes, &config)?;
                println!("Imported {} task(s) into {}", count, config.store.path.display());
            }
        }
    }

    Ok(())
}

/// The store keeps a mutation in memory when the write fails; a one-shot CLI
/// would lose it on exit, so treat a missing change event as an error.
fn ensure_saved(changes: &mut broadcast::Receiver<ChangeEvent>, config: &Config) -> Result<()> {
    match changes.try_recv() {
        Ok(event) => {
            debug!(change = event.kind.as_str(), "Change persisted");
            Ok(())
        }
        Err(_) => bail!(
            "Changes could not be saved to {}",
            config.store.path.display()
        ),
    }
}

async fn update_and_print(
    store: &TaskStore,
    id: &str,
    patch: TaskPatch,
    format: OutputFormat,
) -> Result<()> {
    let task = store
        .update(id, patch)
        .await?
        .ok_or_else(|| task_not_found(id))?;
    println!("{}", format_task(&task, format));
    Ok(())
}

fn task_not_found(id: &str) -> anyhow::Error {
    anyhow!("Task not found: {}", id)
}

async fn run_export(store: &TaskStore, args: ExportArgs) -> Result<()> {
    let doc = store.export().await?;
    let bytes = encode_document(&doc, args.should_compress())?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} task(s) to {}",
                doc.task_count(),
                path.display()
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(&bytes)?;
            if !args.should_compress() {
                out.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// Returns the number of imported tasks, or `None` for a dry run.
async fn run_import(store: &TaskStore, args: &ImportArgs) -> Result<Option<usize>> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let doc = decode_document(&bytes)
        .with_context(|| format!("Invalid task document {}", args.file.display()))?;

    info!(file = %args.file.display(), mode = args.import_mode(), "Importing tasks");

    if args.dry_run {
        let count = validate_document(doc.tasks)?;
        println!("Would import {} task(s)", count);
        return Ok(None);
    }

    Ok(Some(store.import(doc).await?))
}
