//! CLI argument definitions for stockbot.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use stockbot::config::StockbotConfig;

/// Stock analysis chat assistant
#[derive(Parser, Debug)]
#[command(name = "stockbot", version, about = "Chat with an assistant that can look up and analyze stocks")]
pub struct Cli {
    /// Config file (defaults to ./stockbot.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model id sent to the completion service
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// System prompt seeded into every request
    #[arg(short, long, global = true)]
    pub system: Option<String>,

    /// Print the summarized answer in one piece instead of streaming it
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Interactive chat session (default)
    Chat,
    /// List registered tools
    Tools,
    /// Write the tool schemas offered to the model as JSON
    ExportSchemas {
        /// Output file
        path: PathBuf,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }

    /// Log filter directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Flags take precedence over file and environment.
    pub fn apply_overrides(&self, config: &mut StockbotConfig) {
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if let Some(ref system) = self.system {
            config.system_prompt = Some(system.clone());
        }
        if self.no_stream {
            config.stream = false;
        }
    }
}
