use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::BoardError;
use crate::task::{Status, Task, TaskId};

/// Minimum length of an ID prefix accepted by [`resolve`].
const MIN_ID_PREFIX: usize = 4;

/// How a caller names the task an edit or delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(TaskId),
    /// Match by feature name. Updates touch the first match, deletes remove
    /// every match.
    Feature(String),
}

impl Selector {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Selector::Id(id) => task.id == *id,
            Selector::Feature(name) => task.feature == *name,
        }
    }
}

/// Tasks partitioned into the three status columns, in source order.
#[derive(Debug)]
pub struct StatusGroups<'a> {
    buckets: [(Status, Vec<&'a Task>); 3],
}

impl<'a> StatusGroups<'a> {
    pub fn get(&self, status: Status) -> &[&'a Task] {
        &self.buckets[status.index()].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (Status, &[&'a Task])> + '_ {
        self.buckets
            .iter()
            .map(|(status, tasks)| (*status, tasks.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, tasks)| tasks.len()).sum()
    }
}

pub fn group_by_status(tasks: &[Task]) -> StatusGroups<'_> {
    let mut groups = StatusGroups {
        buckets: Status::ALL.map(|status| (status, Vec::new())),
    };
    for task in tasks {
        groups.buckets[task.status.index()].1.push(task);
    }
    groups
}

/// True once `now` has passed the start of the due day.
pub fn is_overdue(task: &Task, now: NaiveDateTime) -> bool {
    task.due_date
        .and_hms_opt(0, 0, 0)
        .is_some_and(|due| now > due)
}

pub fn add(mut tasks: Vec<Task>, new_task: Task) -> Result<Vec<Task>, BoardError> {
    if new_task.feature.trim().is_empty() {
        return Err(BoardError::EmptyFeature);
    }
    if tasks.iter().any(|t| t.feature == new_task.feature) {
        warn!(
            "A task named '{}' already exists; use its ID to edit or delete it",
            new_task.feature
        );
    }
    debug!("Adding task {} '{}'", new_task.id, new_task.feature);
    tasks.push(new_task);
    Ok(tasks)
}

/// Sets status and due date on the first task the selector matches. Other
/// fields are left alone. No match leaves the table unchanged.
pub fn update(
    mut tasks: Vec<Task>,
    selector: &Selector,
    new_status: Status,
    new_due_date: NaiveDate,
) -> Vec<Task> {
    match tasks.iter_mut().find(|t| selector.matches(t)) {
        Some(task) => {
            debug!("Updating task {} '{}'", task.id, task.feature);
            task.status = new_status;
            task.due_date = new_due_date;
        }
        None => debug!("No task matches {:?}, nothing updated", selector),
    }
    tasks
}

/// Removes every task the selector matches.
pub fn delete(mut tasks: Vec<Task>, selector: &Selector) -> Vec<Task> {
    let before = tasks.len();
    tasks.retain(|t| !selector.matches(t));
    debug!("Deleted {} task(s) matching {:?}", before - tasks.len(), selector);
    tasks
}

/// Turns user input into a selector: exact ID, then exact feature name, then
/// unique ID prefix. A feature name is matched as typed before it is matched
/// trimmed, so names with edge whitespace stay reachable.
pub fn resolve(tasks: &[Task], identifier: &str) -> Option<Selector> {
    let trimmed = identifier.trim();
    if let Ok(id) = trimmed.parse::<TaskId>() {
        if tasks.iter().any(|t| t.id == id) {
            return Some(Selector::Id(id));
        }
    }

    for name in [identifier, trimmed] {
        if tasks.iter().any(|t| t.feature == name) {
            return Some(Selector::Feature(name.to_string()));
        }
    }

    if trimmed.len() < MIN_ID_PREFIX {
        return None;
    }
    let prefix = trimmed.to_lowercase();
    let mut candidates = tasks.iter().filter(|t| t.id.to_string().starts_with(&prefix));
    match (candidates.next(), candidates.next()) {
        (Some(task), None) => Some(Selector::Id(task.id)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardSummary {
    pub counts: [usize; 3],
    pub overdue: usize,
}

impl BoardSummary {
    pub fn count(&self, status: Status) -> usize {
        self.counts[status.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

pub fn summarize(tasks: &[Task], now: NaiveDateTime) -> BoardSummary {
    tasks.iter().fold(BoardSummary::default(), |mut summary, task| {
        summary.counts[task.status.index()] += 1;
        if is_overdue(task, now) {
            summary.overdue += 1;
        }
        summary
    })
}
