use chrono::{Local, NaiveDate, NaiveDateTime};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io;
use tracing::error;

use crate::export::{export_path, export_xlsx};
use crate::kanban_board::{self, Selector};
use crate::store::TaskStore;
use crate::task::{format_date, parse_date, Priority, Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Board,
    NewTask,
    Edit,
    Delete,
    Export,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Board,
        View::NewTask,
        View::Edit,
        View::Delete,
        View::Export,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            View::Board => "Board",
            View::NewTask => "New Task",
            View::Edit => "Edit",
            View::Delete => "Delete",
            View::Export => "Export",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn from_shortcut(c: char) -> Option<Self> {
        c.to_digit(10)
            .and_then(|d| (d as usize).checked_sub(1))
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Feature,
    Assignee,
    StartDate,
    DueDate,
    Status,
    Priority,
    Tags,
}

const FORM_FIELDS: [Field; 7] = [
    Field::Feature,
    Field::Assignee,
    Field::StartDate,
    Field::DueDate,
    Field::Status,
    Field::Priority,
    Field::Tags,
];

const PRIORITY_CHOICES: [Option<Priority>; 4] = [
    None,
    Some(Priority::High),
    Some(Priority::Medium),
    Some(Priority::Low),
];

fn cycle_priority(current: Option<Priority>, forward: bool) -> Option<Priority> {
    let len = PRIORITY_CHOICES.len();
    let i = PRIORITY_CHOICES
        .iter()
        .position(|p| *p == current)
        .unwrap_or(0);
    let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
    PRIORITY_CHOICES[next]
}

/// The New Task form.
#[derive(Debug, Clone)]
struct TaskForm {
    feature: String,
    assignee: String,
    start_date: String,
    due_date: String,
    status: Status,
    priority: Option<Priority>,
    tags: String,
    focus: usize,
}

impl TaskForm {
    fn new(today: NaiveDate) -> Self {
        Self {
            feature: String::new(),
            assignee: String::new(),
            start_date: format_date(today),
            due_date: format_date(today),
            status: Status::ToDo,
            priority: None,
            tags: String::new(),
            focus: 0,
        }
    }

    fn focused(&self) -> Field {
        FORM_FIELDS[self.focus]
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focused() {
            Field::Feature => Some(&mut self.feature),
            Field::Assignee => Some(&mut self.assignee),
            Field::StartDate => Some(&mut self.start_date),
            Field::DueDate => Some(&mut self.due_date),
            Field::Tags => Some(&mut self.tags),
            Field::Status | Field::Priority => None,
        }
    }

    fn cycle(&mut self, forward: bool) {
        match self.focused() {
            Field::Status => {
                self.status = if forward {
                    self.status.next()
                } else {
                    self.status.prev()
                };
            }
            Field::Priority => self.priority = cycle_priority(self.priority, forward),
            _ => {}
        }
    }

    fn build(&self) -> Result<Task, String> {
        let start = parse_date(&self.start_date).map_err(|e| format!("Start Date: {}", e))?;
        let due = parse_date(&self.due_date).map_err(|e| format!("Due Date: {}", e))?;
        Ok(Task::new(self.feature.trim(), start, due)
            .with_assignee(self.assignee.trim())
            .with_status(self.status)
            .with_priority(self.priority)
            .with_tags(self.tags.trim()))
    }
}

#[derive(Debug, Clone, Default)]
struct EditState {
    selected: usize,
    status: Option<Status>,
    due_date: String,
}

#[derive(Debug, Clone, Default)]
struct DeleteState {
    selected: usize,
    pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusMessage {
    text: String,
    is_error: bool,
}

pub struct App {
    store: TaskStore,
    tasks: Vec<Task>,
    view: View,
    form: TaskForm,
    edit: EditState,
    delete: DeleteState,
    export_name: String,
    default_export: String,
    message: Option<StatusMessage>,
    should_quit: bool,
}

impl App {
    pub fn new(store: TaskStore, default_export: String) -> Self {
        let (tasks, load_error) = store.load_checked();
        let mut app = Self {
            store,
            tasks,
            view: View::Board,
            form: TaskForm::new(Local::now().date_naive()),
            edit: EditState::default(),
            delete: DeleteState::default(),
            export_name: default_export.clone(),
            default_export,
            message: None,
            should_quit: false,
        };
        if let Some(e) = load_error {
            app.fail(format!(
                "Could not read {}: {}. Showing an empty board; saving will overwrite it.",
                app.store.path().display(),
                e
            ));
        }
        app
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn notify(&mut self, text: impl Into<String>) {
        self.message = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    fn fail(&mut self, text: impl Into<String>) {
        self.message = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }

    /// Persists `tasks` and adopts it as the current table. A failed save
    /// keeps the previous table in memory.
    fn commit(&mut self, tasks: Vec<Task>, message: &str) -> bool {
        match self.store.save(&tasks) {
            Ok(()) => {
                self.tasks = tasks;
                self.notify(message);
                true
            }
            Err(e) => {
                error!("Failed to save {}: {}", self.store.path().display(), e);
                self.fail(format!("Could not save: {}", e));
                false
            }
        }
    }

    pub fn switch_view(&mut self, view: View) {
        self.view = view;
        match view {
            View::Edit => {
                self.edit.selected = clamp_selection(self.edit.selected, self.tasks.len());
                self.sync_edit();
            }
            View::Delete => {
                self.delete.selected = clamp_selection(self.delete.selected, self.tasks.len());
                self.delete.pending = false;
            }
            _ => {}
        }
    }

    fn sync_edit(&mut self) {
        match self.tasks.get(self.edit.selected) {
            Some(task) => {
                self.edit.status = Some(task.status);
                self.edit.due_date = format_date(task.due_date);
            }
            None => {
                self.edit.status = None;
                self.edit.due_date.clear();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        let confirming = self.view == View::Delete && self.delete.pending;
        match key.code {
            KeyCode::Tab => self.switch_view(self.view.next()),
            KeyCode::BackTab => self.switch_view(self.view.prev()),
            KeyCode::Esc if self.view != View::Board && !confirming => {
                self.switch_view(View::Board)
            }
            _ => match self.view {
                View::Board => self.handle_board_key(key),
                View::NewTask => self.handle_form_key(key),
                View::Edit => self.handle_edit_key(key),
                View::Delete => self.handle_delete_key(key),
                View::Export => self.handle_export_key(key),
            },
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char(c) => {
                if let Some(view) = View::from_shortcut(c) {
                    self.switch_view(view);
                }
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.form.focus = self.form.focus.saturating_sub(1),
            KeyCode::Down => {
                self.form.focus = (self.form.focus + 1).min(FORM_FIELDS.len() - 1)
            }
            KeyCode::Left => self.form.cycle(false),
            KeyCode::Right => self.form.cycle(true),
            KeyCode::Backspace => {
                if let Some(text) = self.form.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.form.text_mut() {
                    text.push(c);
                }
            }
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let task = match self.form.build() {
            Ok(task) => task,
            Err(e) => return self.fail(e),
        };
        match kanban_board::add(self.tasks.clone(), task) {
            Ok(tasks) => {
                if self.commit(tasks, "Task added.") {
                    self.form = TaskForm::new(Local::now().date_naive());
                }
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        if self.tasks.is_empty() {
            return;
        }
        match key.code {
            KeyCode::Up => {
                self.edit.selected = self.edit.selected.saturating_sub(1);
                self.sync_edit();
            }
            KeyCode::Down => {
                self.edit.selected = clamp_selection(self.edit.selected + 1, self.tasks.len());
                self.sync_edit();
            }
            KeyCode::Left => self.edit.status = self.edit.status.map(|s| s.prev()),
            KeyCode::Right => self.edit.status = self.edit.status.map(|s| s.next()),
            KeyCode::Backspace => {
                self.edit.due_date.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '-' | '/' | '.') => {
                self.edit.due_date.push(c);
            }
            KeyCode::Enter => self.submit_edit(),
            _ => {}
        }
    }

    fn submit_edit(&mut self) {
        let (Some(task), Some(status)) = (self.tasks.get(self.edit.selected), self.edit.status)
        else {
            return;
        };
        let selector = Selector::Id(task.id);
        let due = match parse_date(&self.edit.due_date) {
            Ok(due) => due,
            Err(e) => return self.fail(format!("Due Date: {}", e)),
        };
        let tasks = kanban_board::update(self.tasks.clone(), &selector, status, due);
        self.commit(tasks, "Task updated.");
    }

    fn handle_delete_key(&mut self, key: KeyEvent) {
        if self.tasks.is_empty() {
            if let KeyCode::Char(c) = key.code {
                if let Some(view) = View::from_shortcut(c) {
                    self.switch_view(view);
                }
            }
            return;
        }

        if self.delete.pending {
            self.delete.pending = false;
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete(),
                _ => self.notify("Delete cancelled."),
            }
            return;
        }

        match key.code {
            KeyCode::Up => self.delete.selected = self.delete.selected.saturating_sub(1),
            KeyCode::Down => {
                self.delete.selected =
                    clamp_selection(self.delete.selected + 1, self.tasks.len())
            }
            KeyCode::Enter => self.delete.pending = true,
            KeyCode::Char(c) => {
                if let Some(view) = View::from_shortcut(c) {
                    self.switch_view(view);
                }
            }
            _ => {}
        }
    }

    fn confirm_delete(&mut self) {
        let Some(task) = self.tasks.get(self.delete.selected) else {
            return;
        };
        let selector = Selector::Id(task.id);
        let tasks = kanban_board::delete(self.tasks.clone(), &selector);
        if self.commit(tasks, "Task deleted.") {
            self.delete.selected = clamp_selection(self.delete.selected, self.tasks.len());
        }
    }

    fn handle_export_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Backspace => {
                self.export_name.pop();
            }
            KeyCode::Char(c) => self.export_name.push(c),
            KeyCode::Enter => {
                let path = export_path(&self.export_name, &self.default_export);
                match export_xlsx(&self.tasks, &path) {
                    Ok(()) => self.notify(format!("Exported as {}", path.display())),
                    Err(e) => {
                        error!("Export to {} failed: {}", path.display(), e);
                        self.fail(format!("Could not export: {}", e));
                    }
                }
            }
            _ => {}
        }
    }
}

fn clamp_selection(selected: usize, len: usize) -> usize {
    selected.min(len.saturating_sub(1))
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    while !app.should_quit() {
        terminal.draw(|f| draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            app.handle_key(key);
        }
    }
    Ok(())
}

pub fn draw(f: &mut Frame, app: &App) {
    let now = Local::now().naive_local();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(16), Constraint::Min(0)])
        .split(rows[1]);

    render_header(f, rows[0], app, now);
    render_menu(f, body[0], app);
    match app.view {
        View::Board => render_board(f, body[1], app, now),
        View::NewTask => render_form(f, body[1], app),
        View::Edit => render_edit(f, body[1], app),
        View::Delete => render_delete(f, body[1], app),
        View::Export => render_export(f, body[1], app),
    }
    render_message(f, rows[2], app);
}

fn selected_border(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn hint(text: &str) -> Line<'_> {
    Line::from(Span::styled(text, Style::default().fg(Color::Yellow)))
}

fn render_header(f: &mut Frame, area: Rect, app: &App, now: NaiveDateTime) {
    let summary = kanban_board::summarize(&app.tasks, now);
    let mut spans = vec![Span::styled(
        format!("Task Board ({})  ", summary.total()),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for status in Status::ALL {
        spans.push(Span::raw(format!("{}: {}  ", status, summary.count(status))));
    }
    if summary.overdue > 0 {
        spans.push(Span::styled(
            format!("🔥 {} overdue", summary.overdue),
            Style::default().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .title(format!(" {} ", app.store.path().display()))
        .borders(Borders::ALL);
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_menu(f: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = View::ALL
        .iter()
        .enumerate()
        .map(|(i, view)| ListItem::new(format!("{} {}", i + 1, view.title())))
        .collect();
    let list = List::new(items)
        .block(Block::default().title("Menu").borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.view.index()));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_board(f: &mut Frame, area: Rect, app: &App, now: NaiveDateTime) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    let groups = kanban_board::group_by_status(&app.tasks);
    for (i, status) in Status::ALL.into_iter().enumerate() {
        let tasks = groups.get(status);
        let items: Vec<ListItem> = tasks
            .iter()
            .map(|t| {
                let mut title = vec![Span::styled(
                    t.feature.clone(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                )];
                if kanban_board::is_overdue(t, now) {
                    title.push(Span::raw(" 🔥"));
                }
                ListItem::new(vec![
                    Line::from(title),
                    Line::from(format!(
                        "{} | Due: {}",
                        if t.assignee.is_empty() { "-" } else { t.assignee.as_str() },
                        format_date(t.due_date)
                    )),
                    Line::from(format!("{} | {}", t.priority_label(), t.tags)),
                    Line::from(""),
                ])
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .title(format!("{} ({})", status, tasks.len()))
                .borders(Borders::ALL),
        );
        f.render_widget(list, chunks[i]);
    }
}

fn field_line(label: &str, value: String, focused: bool, choice: bool) -> Line<'static> {
    let label = Span::styled(
        format!("{:<12}", label),
        Style::default().fg(Color::Gray),
    );
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let value = match (focused, choice) {
        (true, true) => format!("< {} >", value),
        (true, false) => format!("{}█", value),
        _ => value,
    };
    Line::from(vec![label, Span::styled(value, style)])
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.form;
    let mut lines: Vec<Line> = FORM_FIELDS
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = form.focus == i;
            match field {
                Field::Feature => field_line("Feature", form.feature.clone(), focused, false),
                Field::Assignee => field_line("Assignee", form.assignee.clone(), focused, false),
                Field::StartDate => {
                    field_line("Start Date", form.start_date.clone(), focused, false)
                }
                Field::DueDate => field_line("Due Date", form.due_date.clone(), focused, false),
                Field::Status => field_line("Status", form.status.to_string(), focused, true),
                Field::Priority => field_line(
                    "Priority",
                    form.priority.map_or("-".to_string(), |p| p.to_string()),
                    focused,
                    true,
                ),
                Field::Tags => field_line("Tags", form.tags.clone(), focused, false),
            }
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(hint("Up/Down move  Left/Right change  Enter save  Esc back"));

    let block = Block::default()
        .title("New Task")
        .borders(Borders::ALL)
        .border_style(selected_border(true));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn task_list<'a>(tasks: &'a [Task], title: &'a str) -> List<'a> {
    let items: Vec<ListItem> = tasks
        .iter()
        .map(|t| ListItem::new(format!("{}  [{}]", t.feature, t.id.short())))
        .collect();
    List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ")
}

fn render_empty(f: &mut Frame, area: Rect, title: &str) {
    let block = Block::default().title(title).borders(Borders::ALL);
    f.render_widget(Paragraph::new("No tasks yet.").block(block), area);
}

fn render_edit(f: &mut Frame, area: Rect, app: &App) {
    if app.tasks.is_empty() {
        return render_empty(f, area, "Edit");
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut state = ListState::default().with_selected(Some(app.edit.selected));
    f.render_stateful_widget(task_list(&app.tasks, "Select task"), chunks[0], &mut state);

    let status = app.edit.status.map_or(String::new(), |s| s.to_string());
    let lines = vec![
        field_line("New status", status, true, true),
        field_line("New due", app.edit.due_date.clone(), true, false),
        Line::from(""),
        hint("Up/Down select  Left/Right status  Enter update"),
    ];
    let block = Block::default()
        .title("Edit")
        .borders(Borders::ALL)
        .border_style(selected_border(true));
    f.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}

fn render_delete(f: &mut Frame, area: Rect, app: &App) {
    if app.tasks.is_empty() {
        return render_empty(f, area, "Delete");
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let mut state = ListState::default().with_selected(Some(app.delete.selected));
    f.render_stateful_widget(task_list(&app.tasks, "Task to delete"), chunks[0], &mut state);

    let prompt = match app.tasks.get(app.delete.selected) {
        Some(task) if app.delete.pending => Line::from(Span::styled(
            format!("Delete '{}'? (y/n)", task.feature),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        _ => hint("Up/Down select  Enter delete"),
    };
    f.render_widget(
        Paragraph::new(prompt).block(Block::default().borders(Borders::ALL)),
        chunks[1],
    );
}

fn render_export(f: &mut Frame, area: Rect, app: &App) {
    let lines = vec![
        field_line("File name", app.export_name.clone(), true, false),
        Line::from(format!("{} tasks will be written.", app.tasks.len())),
        Line::from(""),
        hint("Enter export to Excel  Esc back"),
    ];
    let block = Block::default()
        .title("Export")
        .borders(Borders::ALL)
        .border_style(selected_border(true));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_message(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.message {
        Some(msg) if msg.is_error => Line::from(Span::styled(
            msg.text.clone(),
            Style::default().fg(Color::Red),
        )),
        Some(msg) => Line::from(Span::styled(
            msg.text.clone(),
            Style::default().fg(Color::Green),
        )),
        None => hint("Tab switch view  q quit"),
    };
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use tempfile::{tempdir, TempDir};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn app_with(tasks: &[Task]) -> (TempDir, App) {
        let temp = tempdir().unwrap();
        let store = TaskStore::new(temp.path().join("tasks.csv"));
        if !tasks.is_empty() {
            store.save(tasks).unwrap();
        }
        let app = App::new(store, "report.xlsx".to_string());
        (temp, app)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn clear_field(app: &mut App, len: usize) {
        for _ in 0..len {
            press(app, KeyCode::Backspace);
        }
    }

    fn persisted(app: &App) -> Vec<Task> {
        app.store.try_load().unwrap()
    }

    #[test]
    fn test_view_navigation() {
        let (_temp, mut app) = app_with(&[]);
        assert_eq!(app.view, View::Board);

        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.view, View::NewTask);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.view, View::Edit);

        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.view, View::Board);

        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.view, View::Export);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.view, View::Board);
    }

    #[test]
    fn test_unreadable_file_is_reported_on_start() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("tasks.csv");
        std::fs::write(
            &path,
            "Feature,Assignee,Start Date,Due Date,Status,Priority,Tags\n\
             C,,2024-01-01,2024/01/09,Done,,\n",
        )
        .unwrap();

        let app = App::new(TaskStore::new(&path), "report.xlsx".to_string());

        assert!(app.tasks.is_empty());
        let message = app.message.as_ref().unwrap();
        assert!(message.is_error);
        assert!(message.text.contains("Could not read"));
        assert!(message.text.contains("2024/01/09"));

        let (_temp, app) = app_with(&[]);
        assert!(app.message.is_none());
    }

    #[test]
    fn test_quit_keys() {
        let (_temp, mut app) = app_with(&[]);
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit(), "q is typed into the form");

        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
    }

    #[test]
    fn test_new_task_form_adds_and_persists() {
        let (_temp, mut app) = app_with(&[]);
        app.switch_view(View::NewTask);

        type_text(&mut app, "Login page");
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "Ana");
        press(&mut app, KeyCode::Down);
        clear_field(&mut app, 10);
        type_text(&mut app, "01/01/2024");
        press(&mut app, KeyCode::Down);
        clear_field(&mut app, 10);
        type_text(&mut app, "2024-01-10");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "auth");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.tasks.len(), 1);
        let task = &app.tasks[0];
        assert_eq!(task.feature, "Login page");
        assert_eq!(task.assignee, "Ana");
        assert_eq!(task.start_date, ymd(2024, 1, 1));
        assert_eq!(task.due_date, ymd(2024, 1, 10));
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.priority, Some(Priority::High));
        assert_eq!(task.tags, "auth");
        assert_eq!(persisted(&app), app.tasks.to_vec());
        assert_eq!(app.form.feature, "", "form resets after saving");
    }

    #[test]
    fn test_new_task_form_rejects_empty_feature() {
        let (_temp, mut app) = app_with(&[]);
        app.switch_view(View::NewTask);
        press(&mut app, KeyCode::Enter);

        assert!(app.tasks.is_empty());
        assert!(!app.store.path().exists());
        assert!(app.message.as_ref().is_some_and(|m| m.is_error));
    }

    #[test]
    fn test_new_task_form_rejects_bad_date() {
        let (_temp, mut app) = app_with(&[]);
        app.switch_view(View::NewTask);
        type_text(&mut app, "Search");
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "x");
        press(&mut app, KeyCode::Enter);

        assert!(app.tasks.is_empty());
        let message = app.message.clone().unwrap();
        assert!(message.is_error);
        assert!(message.text.starts_with("Due Date"));
    }

    #[test]
    fn test_edit_updates_selected_duplicate_only() {
        let tasks = vec![
            Task::new("X", ymd(2024, 1, 1), ymd(2024, 1, 10)),
            Task::new("X", ymd(2024, 1, 1), ymd(2024, 1, 20)).with_status(Status::Done),
        ];
        let (_temp, mut app) = app_with(&tasks);
        app.switch_view(View::Edit);
        assert_eq!(app.edit.due_date, "2024-01-10");

        press(&mut app, KeyCode::Down);
        assert_eq!(app.edit.status, Some(Status::Done));
        press(&mut app, KeyCode::Right);
        clear_field(&mut app, 10);
        type_text(&mut app, "01/03/2024");
        press(&mut app, KeyCode::Enter);

        let saved = persisted(&app);
        assert_eq!(saved[0], tasks[0]);
        assert_eq!(saved[1].status, Status::ToDo);
        assert_eq!(saved[1].due_date, ymd(2024, 3, 1));
        assert_eq!(saved[1].id, tasks[1].id);
    }

    #[test]
    fn test_edit_and_delete_ignore_keys_on_empty_table() {
        let (_temp, mut app) = app_with(&[]);
        app.switch_view(View::Edit);
        press(&mut app, KeyCode::Enter);
        app.switch_view(View::Delete);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('y'));

        assert!(app.message.is_none());
        assert!(!app.store.path().exists());
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let tasks = vec![
            Task::new("Keep", ymd(2024, 1, 1), ymd(2024, 1, 10)),
            Task::new("Drop", ymd(2024, 1, 1), ymd(2024, 1, 10)),
        ];
        let (_temp, mut app) = app_with(&tasks);
        app.switch_view(View::Delete);
        press(&mut app, KeyCode::Down);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.tasks.len(), 2);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(persisted(&app), vec![tasks[0].clone()]);
        assert_eq!(app.delete.selected, 0);
    }

    #[test]
    fn test_export_view_writes_workbook() {
        let tasks = vec![Task::new("Login", ymd(2024, 1, 1), ymd(2024, 1, 10))];
        let (temp, mut app) = app_with(&tasks);
        app.switch_view(View::Export);
        clear_field(&mut app, "report.xlsx".len());
        let target = temp.path().join("weekly");
        type_text(&mut app, target.to_str().unwrap());
        press(&mut app, KeyCode::Enter);

        assert!(temp.path().join("weekly.xlsx").exists());
        assert!(app.message.as_ref().is_some_and(|m| !m.is_error));
    }

    #[test]
    fn test_board_renders_columns_and_counts() {
        let tasks = vec![
            Task::new("Login page", ymd(2024, 1, 1), ymd(2024, 1, 10)).with_assignee("Ana"),
            Task::new("Deploy", ymd(2024, 1, 1), ymd(2024, 1, 10)).with_status(Status::Done),
        ];
        let (_temp, app) = app_with(&tasks);
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();

        terminal.draw(|f| draw(f, &app)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("To Do (1)"));
        assert!(text.contains("In Progress (0)"));
        assert!(text.contains("Done (1)"));
        assert!(text.contains("Login page"));
        assert!(text.contains("Deploy"));
    }
}
