//! Task table persistence - CSV file with a fixed header

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::task::{format_date, parse_date, ParseError, Priority, Task, TaskId};

/// Column order of the persisted table.
pub const COLUMNS: [&str; 8] = [
    "ID",
    "Feature",
    "Assignee",
    "Start Date",
    "Due Date",
    "Status",
    "Priority",
    "Tags",
];

/// One CSV row as written on disk. Older files have no ID column and use
/// Portuguese headers, so both are accepted here.
#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Feature")]
    feature: String,
    #[serde(rename = "Assignee", alias = "Responsável", default)]
    assignee: Option<String>,
    #[serde(rename = "Start Date", alias = "Data de Início")]
    start_date: String,
    #[serde(rename = "Due Date", alias = "Prazo")]
    due_date: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Priority", alias = "Prioridade", default)]
    priority: Option<String>,
    #[serde(rename = "Tags", default)]
    tags: Option<String>,
}

impl TaskRecord {
    fn into_task(self) -> Result<Task, ParseError> {
        let id = match self.id.as_deref().map(str::parse::<TaskId>) {
            Some(Ok(id)) => id,
            _ => TaskId::new(),
        };
        Ok(Task {
            id,
            feature: self.feature,
            assignee: self.assignee.unwrap_or_default(),
            start_date: parse_date(&self.start_date)?,
            due_date: parse_date(&self.due_date)?,
            status: self.status.parse()?,
            priority: Priority::parse_optional(self.priority.as_deref().unwrap_or(""))?,
            tags: self.tags.unwrap_or_default(),
        })
    }
}

fn task_row(task: &Task) -> [String; 8] {
    [
        task.id.to_string(),
        task.feature.clone(),
        task.assignee.clone(),
        format_date(task.start_date),
        format_date(task.due_date),
        task.status.label().to_string(),
        task.priority_label().to_string(),
        task.tags.clone(),
    ]
}

pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the table, falling back to an empty one when the file is
    /// missing or cannot be parsed.
    pub fn load(&self) -> Vec<Task> {
        self.load_checked().0
    }

    /// Same recovery as `load`, but also returns the error that caused an
    /// existing file to be read as an empty table. A missing file is not an
    /// error.
    pub fn load_checked(&self) -> (Vec<Task>, Option<StoreError>) {
        if !self.path.exists() {
            debug!("No task file at {}, starting empty", self.path.display());
            return (Vec::new(), None);
        }

        match self.try_load() {
            Ok(tasks) => {
                debug!("Loaded {} tasks from {}", tasks.len(), self.path.display());
                (tasks, None)
            }
            Err(e) => {
                warn!(
                    "Could not read {}, starting from an empty board: {}",
                    self.path.display(),
                    e
                );
                (Vec::new(), Some(e))
            }
        }
    }

    pub fn try_load(&self) -> Result<Vec<Task>, StoreError> {
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .trim(Trim::Headers)
            .from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();

        let mut tasks = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let row: TaskRecord = record.deserialize(Some(&headers))?;
            let task = row
                .into_task()
                .map_err(|reason| StoreError::InvalidRow { line, reason })?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    /// Rewrites the whole file. The table is written to a sibling temp file
    /// first and renamed into place, keeping the permissions of the file it
    /// replaces. Text cells are written and read back exactly, including
    /// edge whitespace.
    pub fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer.write_record(COLUMNS)?;
            for task in tasks {
                writer.write_record(task_row(task))?;
            }
            writer.flush()?;
        }
        if let Ok(meta) = fs::metadata(&self.path) {
            fs::set_permissions(tmp.path(), meta.permissions())?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Saved {} tasks to {}", tasks.len(), self.path.display());
        Ok(())
    }
}
