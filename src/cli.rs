//! Command-line interface

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::StoreError;
use crate::export::{export_path, export_xlsx};
use crate::kanban_board::{self, Selector};
use crate::store::TaskStore;
use crate::task::{format_date, parse_date, Priority, Status, Task};

const TABLE_COL_ID: usize = 8;
const TABLE_COL_FEATURE: usize = 28;
const TABLE_COL_ASSIGNEE: usize = 14;
const TABLE_COL_STATUS: usize = 12;
const TABLE_COL_DATE: usize = 10;

#[derive(Parser)]
#[command(name = "taskboard", version, about = "Kanban board for a single user, kept in a CSV file")]
pub struct Cli {
    /// Task file to read and write
    #[arg(short, long, global = true, env = "TASKBOARD_FILE")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show tasks grouped by status
    Board,
    /// List all tasks
    List(ListArgs),
    /// Add a new task
    Add(AddArgs),
    /// Change the status and due date of a task
    Edit(EditArgs),
    /// Delete a task
    Delete(DeleteArgs),
    /// Export the board to an Excel workbook
    Export(ExportArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Feature name
    pub feature: String,

    /// Due date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = parse_date_arg)]
    pub due: NaiveDate,

    /// Start date, defaults to today
    #[arg(long, value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,

    #[arg(short, long, default_value = "")]
    pub assignee: String,

    #[arg(short, long, default_value = "todo")]
    pub status: Status,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    #[arg(short, long, default_value = "")]
    pub tags: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID, ID prefix or feature name
    pub task: String,

    /// New status
    #[arg(short, long)]
    pub status: Status,

    /// New due date, keeps the current one when omitted
    #[arg(long, value_parser = parse_date_arg)]
    pub due: Option<NaiveDate>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Task ID, ID prefix or feature name
    pub task: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file name
    #[arg(value_name = "FILE")]
    pub output: Option<String>,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max <= 3 {
        s.chars().take(max).collect()
    } else {
        format!("{}...", s.chars().take(max - 3).collect::<String>())
    }
}

pub fn run(config: &Config, command: Commands) -> Result<()> {
    let store = TaskStore::new(&config.data_file);
    match command {
        Commands::Board => run_board(&store),
        Commands::List(args) => run_list(&store, args),
        Commands::Add(args) => run_add(&store, args),
        Commands::Edit(args) => run_edit(&store, args),
        Commands::Delete(args) => run_delete(&store, args),
        Commands::Export(args) => run_export(&store, config, args),
    }
}

fn save(store: &TaskStore, tasks: &[Task]) -> Result<()> {
    store
        .save(tasks)
        .with_context(|| format!("Failed to save {}", store.path().display()))
}

/// Loads the table and tells the user on stderr when an unreadable file was
/// replaced by an empty board.
fn load(store: &TaskStore) -> Vec<Task> {
    let (tasks, err) = store.load_checked();
    if let Some(e) = err {
        eprintln!("{}", recovery_notice(store.path(), &e));
    }
    tasks
}

fn recovery_notice(path: &Path, err: &StoreError) -> String {
    format!(
        "Warning: could not read {} ({}). Starting from an empty board; saving will overwrite it.",
        path.display(),
        err
    )
}

fn resolve(tasks: &[Task], identifier: &str) -> Result<Selector> {
    match kanban_board::resolve(tasks, identifier) {
        Some(selector) => Ok(selector),
        None => bail!("Task not found: {}", identifier),
    }
}

fn run_board(store: &TaskStore) -> Result<()> {
    let tasks = load(store);
    let now = now();
    let groups = kanban_board::group_by_status(&tasks);

    for (status, bucket) in groups.iter() {
        println!("{} ({})", status, bucket.len());
        for task in bucket {
            let marker = if kanban_board::is_overdue(task, now) { " 🔥" } else { "" };
            println!("  - {}{}  [{}]", task.feature, marker, task.id.short());
            println!(
                "      Assignee: {} | Due: {} | Priority: {} | Tags: {}",
                task.assignee,
                format_date(task.due_date),
                task.priority_label(),
                task.tags
            );
        }
        println!();
    }

    let summary = kanban_board::summarize(&tasks, now);
    println!("{} tasks, {} overdue", groups.total(), summary.overdue);
    Ok(())
}

fn run_list(store: &TaskStore, args: ListArgs) -> Result<()> {
    let tasks = load(store);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks in {}.", store.path().display());
        return Ok(());
    }

    println!(
        "{:<w_id$} {:<w_feature$} {:<w_assignee$} {:<w_status$} {:<w_date$} PRIORITY",
        "ID",
        "FEATURE",
        "ASSIGNEE",
        "STATUS",
        "DUE",
        w_id = TABLE_COL_ID,
        w_feature = TABLE_COL_FEATURE,
        w_assignee = TABLE_COL_ASSIGNEE,
        w_status = TABLE_COL_STATUS,
        w_date = TABLE_COL_DATE,
    );
    for task in &tasks {
        println!(
            "{:<w_id$} {:<w_feature$} {:<w_assignee$} {:<w_status$} {:<w_date$} {}",
            task.id.short(),
            truncate(&task.feature, TABLE_COL_FEATURE),
            truncate(&task.assignee, TABLE_COL_ASSIGNEE),
            task.status.label(),
            format_date(task.due_date),
            task.priority_label(),
            w_id = TABLE_COL_ID,
            w_feature = TABLE_COL_FEATURE,
            w_assignee = TABLE_COL_ASSIGNEE,
            w_status = TABLE_COL_STATUS,
            w_date = TABLE_COL_DATE,
        );
    }
    Ok(())
}

fn run_add(store: &TaskStore, args: AddArgs) -> Result<()> {
    let start = args.start.unwrap_or_else(|| now().date());
    let task = Task::new(args.feature, start, args.due)
        .with_assignee(args.assignee)
        .with_status(args.status)
        .with_priority(args.priority)
        .with_tags(args.tags);
    let id = task.id;

    let tasks = kanban_board::add(load(store), task)?;
    save(store, &tasks)?;
    println!("Task added ({}).", id.short());
    Ok(())
}

fn run_edit(store: &TaskStore, args: EditArgs) -> Result<()> {
    let tasks = load(store);
    let selector = resolve(&tasks, &args.task)?;
    let due = match args.due {
        Some(due) => due,
        None => match tasks.iter().find(|t| selector.matches(t)) {
            Some(task) => task.due_date,
            None => bail!("Task not found: {}", args.task),
        },
    };

    let tasks = kanban_board::update(tasks, &selector, args.status, due);
    save(store, &tasks)?;
    println!("Task updated.");
    Ok(())
}

fn run_delete(store: &TaskStore, args: DeleteArgs) -> Result<()> {
    let tasks = load(store);
    let selector = resolve(&tasks, &args.task)?;
    let before = tasks.len();

    let tasks = kanban_board::delete(tasks, &selector);
    save(store, &tasks)?;
    println!("Deleted {} task(s).", before - tasks.len());
    Ok(())
}

fn run_export(store: &TaskStore, config: &Config, args: ExportArgs) -> Result<()> {
    let path = export_path(args.output.as_deref().unwrap_or(""), &config.export_file);
    let tasks = load(store);
    export_xlsx(&tasks, &path)
        .with_context(|| format!("Failed to export to {}", path.display()))?;
    println!("Exported {} tasks to {}", tasks.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Config) {
        let temp = tempdir().unwrap();
        let config = Config::resolve(Some(temp.path().join("tasks.csv")), None);
        (temp, config)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command.unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("Responsável", 5), "Re...");
    }

    #[test]
    fn test_parse_add_with_day_first_dates() {
        let cmd = parse(&[
            "taskboard", "add", "Login page", "--due", "10/01/2024", "--start", "01/01/2024",
            "-a", "Ana", "-p", "high", "-t", "auth",
        ]);
        match cmd {
            Commands::Add(args) => {
                assert_eq!(args.feature, "Login page");
                assert_eq!(args.due, ymd(2024, 1, 10));
                assert_eq!(args.start, Some(ymd(2024, 1, 1)));
                assert_eq!(args.status, Status::ToDo);
                assert_eq!(args.priority, Some(Priority::High));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        assert!(Cli::try_parse_from(["taskboard", "add", "x", "--due", "soon"]).is_err());
    }

    #[test]
    fn test_add_edit_delete_flow() {
        let (_temp, config) = setup();
        let store = TaskStore::new(&config.data_file);

        run(
            &config,
            parse(&["taskboard", "add", "Login page", "--due", "2024-01-10", "--start", "2024-01-01"]),
        )
        .unwrap();
        let tasks = store.load();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, Status::ToDo);

        run(&config, parse(&["taskboard", "edit", "Login page", "-s", "doing"])).unwrap();
        let tasks = store.load();
        assert_eq!(tasks[0].status, Status::InProgress);
        assert_eq!(tasks[0].due_date, ymd(2024, 1, 10));

        let short = tasks[0].id.short();
        run(&config, parse(&["taskboard", "edit", short.as_str(), "-s", "done", "--due", "2024-02-01"])).unwrap();
        let tasks = store.load();
        assert_eq!(tasks[0].status, Status::Done);
        assert_eq!(tasks[0].due_date, ymd(2024, 2, 1));

        run(&config, parse(&["taskboard", "delete", "Login page"])).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_edit_unknown_task_fails() {
        let (_temp, config) = setup();
        let err = run(&config, parse(&["taskboard", "edit", "ghost", "-s", "done"])).unwrap_err();
        assert_eq!(err.to_string(), "Task not found: ghost");
    }

    #[test]
    fn test_add_empty_feature_fails_without_writing() {
        let (_temp, config) = setup();
        let result = run(&config, parse(&["taskboard", "add", " ", "--due", "2024-01-10"]));
        assert!(result.is_err());
        assert!(!config.data_file.exists());
    }

    #[test]
    fn test_export_uses_given_name() {
        let (temp, config) = setup();
        let target = temp.path().join("out");
        run(
            &config,
            parse(&["taskboard", "export", target.to_str().unwrap()]),
        )
        .unwrap();
        assert!(temp.path().join("out.xlsx").exists());
    }

    #[test]
    fn test_parse_export_name_with_global_file() {
        let cli = Cli::try_parse_from(["taskboard", "--file", "other.csv", "export", "report"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("other.csv")));
        match cli.command {
            Some(Commands::Export(args)) => assert_eq!(args.output.as_deref(), Some("report")),
            _ => panic!("expected export"),
        }

        let cli = Cli::try_parse_from(["taskboard", "export", "-f", "other.csv"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("other.csv")));
        match cli.command {
            Some(Commands::Export(args)) => assert_eq!(args.output, None),
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn test_recovery_notice_names_file_and_cause() {
        let (_temp, config) = setup();
        std::fs::write(
            &config.data_file,
            "Feature,Assignee,Start Date,Due Date,Status,Priority,Tags\n\
             A,,2024-01-01,2024-01-02,Done,,\n\
             C,,2024-01-01,2024/01/09,Done,,\n",
        )
        .unwrap();
        let store = TaskStore::new(&config.data_file);

        let (tasks, err) = store.load_checked();
        assert!(tasks.is_empty());
        let notice = recovery_notice(store.path(), &err.unwrap());

        assert!(notice.starts_with("Warning: could not read"));
        assert!(notice.contains("tasks.csv"));
        assert!(notice.contains("line 3"));
        assert!(notice.contains("2024/01/09"));
    }
}
