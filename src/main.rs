mod cli;
mod config;
mod error;
mod export;
mod kanban_board;
mod store;
mod task;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use crate::cli::Cli;
use crate::config::Config;
use crate::store::TaskStore;
use crate::ui::App;

fn main() -> Result<()> {
    if std::env::var("TASKBOARD_DEBUG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter("taskboard=debug")
            .with_writer(io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let config = Config::load(cli.file)?;

    match cli.command {
        Some(command) => cli::run(&config, command),
        None => run_tui(&config),
    }
}

fn run_tui(config: &Config) -> Result<()> {
    let mut app = App::new(
        TaskStore::new(&config.data_file),
        config.export_file.clone(),
    );

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    Ok(())
}
