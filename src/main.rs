use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use todostore::{
    Backend, Config, FileKv, Filter, ImportPolicy, KeyValueStore, NewTask, SqliteKv, StoreEvent, Task, TaskEdit,
    TodoStore, export_file_name, normalize::parse_task_list,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - to-do list with local persistence and JSON import/export")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the config file (default: <config dir>/todostore/todostore.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the data files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Storage key holding the task list
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        text: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks, newest first
    List {
        /// all, active (open) or completed (done)
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// Print the matching tasks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle a task between open and completed
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },

    /// Replace a task's text and optional fields
    Edit {
        /// Task id or unique id prefix
        id: String,
        text: String,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
        #[arg(long, conflicts_with = "clear_tag")]
        tag: Option<String>,
        #[arg(long)]
        clear_tag: bool,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },

    /// Delete a task
    Rm {
        /// Task id or unique id prefix
        id: String,
    },

    /// Delete every completed task
    ClearCompleted,

    /// Show task counts
    Stats,

    /// Export all tasks as JSON
    Export {
        /// Output file, or a directory to write todo-bloom-<date>.json into (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import tasks from an exported JSON file
    Import {
        file: PathBuf,

        /// Replace the current list instead of merging into it
        #[arg(long)]
        replace: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(key) = cli.key {
        config.storage_key = key;
    }

    let kv: Box<dyn KeyValueStore> = match config.backend {
        Backend::File => Box::new(FileKv::open(&config.data_dir)?),
        Backend::Sqlite => Box::new(SqliteKv::open(config.sqlite_path())?),
    };
    let mut store = TodoStore::open(kv, config.storage_key.clone())?;

    let saved = Rc::new(Cell::new(false));
    let saved_flag = Rc::clone(&saved);
    store.subscribe(move |event| match event {
        StoreEvent::TaskCompleted { .. } => println!("{}", "🎉 Nice work, task completed!".bright_magenta()),
        StoreEvent::Saved => saved_flag.set(true),
        StoreEvent::Changed => {}
    });

    match cli.command {
        Commands::Add { text, notes, tag, due } => {
            let new = NewTask { text, notes, tag, due };
            match store.add(new)? {
                Some(task) => {
                    println!("{} {}", "Added".green(), task.text);
                    println!("  {}", task.id.dimmed());
                }
                None => println!("{}", "Nothing to add: task text is empty".yellow()),
            }
        }
        Commands::List { filter, json } => {
            store.set_filter(Filter::parse(&filter));
            if json {
                let visible: Vec<&Task> = store.visible();
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                print_list(&store);
            }
        }
        Commands::Toggle { id } => {
            let id = store.resolve_id(&id)?;
            if let Some(toggled) = store.toggle(&id)? {
                let state = if toggled.task.completed { "done".green() } else { "open".cyan() };
                println!("{} is now {}", toggled.task.text, state);
            }
        }
        Commands::Edit {
            id,
            text,
            notes,
            clear_notes,
            tag,
            clear_tag,
            due,
            clear_due,
        } => {
            let id = store.resolve_id(&id)?;
            let edit = TaskEdit {
                text,
                notes: field_change(notes, clear_notes),
                tag: field_change(tag, clear_tag),
                due: field_change(due, clear_due),
            };
            match store.edit(&id, edit)? {
                Some(task) => println!("{} {}", "Updated".green(), task.text),
                None => println!("{}", "Nothing changed: task text is empty".yellow()),
            }
        }
        Commands::Rm { id } => {
            let id = store.resolve_id(&id)?;
            if store.remove(&id)? {
                println!("{} {}", "Deleted".red(), id);
            }
        }
        Commands::ClearCompleted => {
            let removed = store.clear_completed()?;
            println!("Cleared {} completed task(s)", removed);
        }
        Commands::Stats => print_counts(&store),
        Commands::Export { output } => {
            let json = store.export_snapshot()?;
            match output {
                None => println!("{}", json),
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(export_file_name(Utc::now()))
                    } else {
                        path
                    };
                    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported {} task(s) to {}", store.tasks().len(), path.display());
                }
            }
        }
        Commands::Import { file, replace } => {
            let raw = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let policy = if replace { ImportPolicy::Replace } else { config.import_policy };
            let records = parse_import(&raw)?;
            let report = store.import_records(&records, policy)?;
            println!(
                "Imported {} task(s) ({}), skipped {} duplicate(s), dropped {} invalid record(s); {} total",
                report.added, policy, report.skipped_duplicates, report.dropped_invalid, report.total
            );
        }
    }

    if saved.get() {
        println!("{}", "✓ Changes saved".dimmed());
    }

    Ok(())
}

fn parse_import(raw: &str) -> Result<Vec<serde_json::Value>> {
    parse_task_list(raw).context("Unable to import that file. Please use a valid export")
}

fn field_change(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear { Some(None) } else { value.map(Some) }
}

fn print_list<K: KeyValueStore>(store: &TodoStore<K>) {
    let visible = store.visible();

    if visible.is_empty() {
        println!("No tasks here yet.");
        println!("{}", "Add one with `todostore add <TEXT>` to get started.".dimmed());
        print_counts(store);
        return;
    }

    for task in visible {
        print_task(task);
    }
    print_counts(store);
}

fn print_task(task: &Task) {
    let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let text = if task.completed {
        task.text.strikethrough().dimmed()
    } else {
        task.text.bold()
    };

    let mut line = format!("{} {}", check, text);
    if let Some(tag) = &task.tag {
        line.push_str(&format!(" {}", format!("#{}", tag).blue()));
    }
    if let Some(due) = &task.due {
        line.push_str(&format!(" {}", format!("due {}", due).yellow()));
    }
    println!("{}", line);

    if let Some(notes) = &task.notes {
        println!("    {}", notes.italic());
    }

    let created = task
        .created_time()
        .map(|t| t.with_timezone(&Local).format("%b %-d, %H:%M").to_string())
        .unwrap_or_else(|| "just now".to_string());
    println!("    {}", format!("{}  created {}", task.id, created).dimmed());
}

fn print_counts<K: KeyValueStore>(store: &TodoStore<K>) {
    let counts = store.counts();
    println!(
        "{} total, {} completed, {} active (filter: {})",
        counts.total,
        counts.completed,
        counts.active,
        store.filter()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filter_accepts_aliases_and_unknown_names() {
        for (arg, expected) in [
            ("open", Filter::Active),
            ("done", Filter::Completed),
            ("completed", Filter::Completed),
            ("archived", Filter::All),
        ] {
            let cli = Cli::try_parse_from(["todostore", "list", "--filter", arg]).unwrap();
            match cli.command {
                Commands::List { filter, .. } => assert_eq!(Filter::parse(&filter), expected),
                _ => panic!("expected list command"),
            }
        }
    }

    #[test]
    fn test_edit_rejects_set_and_clear_together() {
        let result = Cli::try_parse_from(["todostore", "edit", "abc", "text", "--tag", "x", "--clear-tag"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_import_errors_name_the_file_problem() {
        let err = parse_import(r#"{"items":"not-an-array"}"#).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Unable to import that file"));
        assert!(message.contains("invalid import format"));

        assert_eq!(parse_import(r#"[{"text":"a"}]"#).unwrap().len(), 1);
    }

    #[test]
    fn test_field_change() {
        assert_eq!(field_change(None, false), None);
        assert_eq!(field_change(None, true), Some(None));
        assert_eq!(field_change(Some("x".to_string()), false), Some(Some("x".to_string())));
    }
}
