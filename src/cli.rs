use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "Terminal client for a remote to-do list", long_about = None)]
pub struct Cli {
    /// Base URL of the task API (overrides TASKPAD_API_URL and the stored config)
    #[arg(long = "api-url", global = true, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch TUI interface
    Tui,
    /// Launch TUI from a sign-in callback URL carrying a token
    Open {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Print all tasks
    List,
    /// Add a task
    Add {
        #[arg(value_name = "TEXT")]
        text: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long = "date")]
        date: Option<String>,
        /// Due time (HH:MM)
        #[arg(long = "time")]
        time: Option<String>,
    },
    /// Flip a task between done and not done
    Toggle {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Delete a task
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Forget the stored token
    Logout,
    /// Set a config value (api_url, date_format)
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Get a config value
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// List all config values
    ConfigList,
    /// Delete a config value
    ConfigDelete {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}
