use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Format used when writing dates to disk and to the terminal.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DAY_FIRST_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid date '{0}' (expected YYYY-MM-DD or DD/MM/YYYY)")]
    InvalidDate(String),
    #[error("unknown status '{0}'")]
    InvalidStatus(String),
    #[error("unknown priority '{0}'")]
    InvalidPriority(String),
}

/// Opaque identifier assigned to a task when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell tasks apart on screen.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    ToDo,
    InProgress,
    Done,
}

impl Status {
    /// Display order of the board columns.
    pub const ALL: [Status; 3] = [Status::ToDo, Status::InProgress, Status::Done];

    pub fn label(&self) -> &'static str {
        match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Status::ToDo => 0,
            Status::InProgress => 1,
            Status::Done => 2,
        }
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "to do" | "todo" | "to-do" | "a fazer" => Ok(Status::ToDo),
            "in progress" | "in-progress" | "inprogress" | "doing" | "em andamento" => {
                Ok(Status::InProgress)
            }
            "done" | "concluído" | "concluido" => Ok(Status::Done),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Parses an optional priority cell; blank means no priority.
    pub fn parse_optional(s: &str) -> Result<Option<Self>, ParseError> {
        if s.trim().is_empty() {
            Ok(None)
        } else {
            s.parse().map(Some)
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "alta" => Ok(Priority::High),
            "medium" | "média" | "media" => Ok(Priority::Medium),
            "low" | "baixa" => Ok(Priority::Low),
            _ => Err(ParseError::InvalidPriority(s.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub feature: String,
    pub assignee: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: Status,
    pub priority: Option<Priority>,
    pub tags: String,
}

impl Task {
    pub fn new(feature: impl Into<String>, start_date: NaiveDate, due_date: NaiveDate) -> Self {
        Self {
            id: TaskId::new(),
            feature: feature.into(),
            assignee: String::new(),
            start_date,
            due_date,
            status: Status::ToDo,
            priority: None,
            tags: String::new(),
        }
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = assignee.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn priority_label(&self) -> &'static str {
        self.priority.as_ref().map_or("", Priority::label)
    }
}

/// Parses a date cell. ISO dates are tried first, then day-first forms.
pub fn parse_date(s: &str) -> Result<NaiveDate, ParseError> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(datetime) = chrono::NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Ok(datetime.date());
    }
    DAY_FIRST_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| ParseError::InvalidDate(s.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
