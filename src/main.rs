mod api;
mod app;
mod auth;
mod cli;
mod config;
mod database;
mod location;
mod models;
mod session;
mod ui;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use api::TaskApi;
use app::App;
use cli::{Cli, Commands};
use config::Settings;
use database::Database;
use location::Location;
use models::{format_due_date, NewTask, TaskId, TaskPatch};
use session::{SessionStore, TOKEN_KEY};
use ui::{run_tui, View};

const LOG_ENV: &str = "TASKPAD_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let db = Database::new()?;

    match cli.command {
        Some(Commands::Set { key, value }) => {
            if key == config::DATE_FORMAT_KEY && !models::is_valid_date_format(&value) {
                bail!("'{}' is not a usable date format", value);
            }
            db.set_config(&key, &value)?;
            println!("{} = {}", key, value);
        }
        Some(Commands::Get { key }) => match db.get_config(&key)? {
            Some(value) => println!("{}", value),
            None => println!("Config '{}' not set", key),
        },
        Some(Commands::ConfigList) => {
            let configs = db.get_all_configs()?;
            if configs.is_empty() {
                println!("No configs set");
            }
            for config in configs {
                match config.description {
                    Some(desc) => println!("{} = {}  ({})", config.key_name, config.value, desc),
                    None => println!("{} = {}  (updated {})", config.key_name, config.value, config.updated_at),
                }
            }
        }
        Some(Commands::ConfigDelete { key }) => {
            if db.delete_config(&key)? {
                println!("Deleted config '{}'", key);
            } else {
                println!("Config '{}' not set", key);
            }
        }
        Some(Commands::Logout) => {
            db.remove(TOKEN_KEY)?;
            println!("Logged out");
        }
        Some(Commands::Completions { shell }) => {
            use clap_complete::{generate, Shell};
            let shell_enum = match shell.to_lowercase().as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "elvish" => Shell::Elvish,
                "powershell" => Shell::PowerShell,
                other => bail!("Unsupported shell: {}", other),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "taskpad", &mut std::io::stdout());
        }
        Some(Commands::List) => {
            let settings = Settings::load(&db, cli.api_url.as_deref())?;
            let api = TaskApi::new(&settings.api_url);
            let token = db.token()?;
            let rt = tokio::runtime::Runtime::new()?;
            let tasks = rt.block_on(api.list(token.as_deref()))?;
            if tasks.is_empty() {
                println!("No tasks");
            }
            for task in tasks {
                let mark = if task.completed { "x" } else { " " };
                let mut line = format!("[{}] {}  {}", mark, task.id, task.text);
                if let Some(date) = task.due_date.as_deref().filter(|d| !d.is_empty()) {
                    line.push_str(&format!("  📅 {}", format_due_date(date, &settings.date_format)));
                }
                if let Some(time) = task.due_time.as_deref().filter(|t| !t.is_empty()) {
                    line.push_str(&format!("  🕐 {}", time));
                }
                println!("{}", line);
            }
        }
        Some(Commands::Add { text, date, time }) => {
            if text.trim().is_empty() {
                bail!("Task text cannot be empty");
            }
            let settings = Settings::load(&db, cli.api_url.as_deref())?;
            let api = TaskApi::new(&settings.api_url);
            let token = db.token()?;
            let rt = tokio::runtime::Runtime::new()?;
            let new_task = NewTask {
                text,
                due_date: date.filter(|d| !d.is_empty()),
                due_time: time.filter(|t| !t.is_empty()),
            };
            let created = rt.block_on(api.create(token.as_deref(), &new_task))?;
            println!("Added {}  {}", created.id, created.text);
        }
        Some(Commands::Toggle { id }) => {
            let settings = Settings::load(&db, cli.api_url.as_deref())?;
            let api = TaskApi::new(&settings.api_url);
            let token = db.token()?;
            let rt = tokio::runtime::Runtime::new()?;
            let id = TaskId::new(id);
            let updated = rt.block_on(async {
                let tasks = api.list(token.as_deref()).await?;
                let task = tasks
                    .iter()
                    .find(|t| t.id == id)
                    .with_context(|| format!("Task '{}' not found", id))?;
                api.update(token.as_deref(), &id, &TaskPatch::completed(!task.completed))
                    .await
            })?;
            let state = if updated.completed { "done" } else { "not done" };
            println!("{} is {}", updated.text, state);
        }
        Some(Commands::Delete { id }) => {
            let settings = Settings::load(&db, cli.api_url.as_deref())?;
            let api = TaskApi::new(&settings.api_url);
            let token = db.token()?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(api.delete(token.as_deref(), &TaskId::new(id.clone())))?;
            println!("Deleted {}", id);
        }
        Some(Commands::Open { url }) => {
            launch_tui(db, cli.api_url.as_deref(), Location::parse(&url)?)?;
        }
        Some(Commands::Tui) | None => {
            launch_tui(db, cli.api_url.as_deref(), Location::blank())?;
        }
    }

    Ok(())
}

fn launch_tui(db: Database, api_url: Option<&str>, location: Location) -> Result<()> {
    let settings = Settings::load(&db, api_url)?;
    log::info!("starting against {}", settings.api_url);

    let rt = tokio::runtime::Runtime::new()?;
    let app = App::new(db, TaskApi::new(&settings.api_url), rt.handle().clone());
    run_tui(View::new(app, settings.date_format), location)
}

/// Logs go to `~/.taskpad.log`; the terminal belongs to the TUI.
fn init_logging() -> Result<()> {
    let path = database::home_dir().join(".taskpad.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
