//! stockbot binary entry point.

mod cli;
mod errors;
mod terminal;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockbot::agent::{Orchestrator, OrchestratorSettings};
use stockbot::config::StockbotConfig;
use stockbot::error::Result;
use stockbot::provider::{create_provider, ModelProvider};
use stockbot::tools::ToolRegistry;

use cli::{Cli, Commands};
use terminal::TerminalDisplay;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", errors::format_error_help(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = StockbotConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    match cli.command() {
        Commands::Chat => handle_chat(config).await,
        Commands::Tools => {
            list_tools(&stockbot_tools::default_registry(&config));
            Ok(())
        }
        Commands::ExportSchemas { path } => {
            let registry = stockbot_tools::default_registry(&config);
            registry.write_schema_file(&path)?;
            println!("Wrote {} tool schemas to {}", registry.len(), path.display());
            Ok(())
        }
    }
}

fn list_tools(registry: &ToolRegistry) {
    for descriptor in registry.descriptors() {
        let marker = if descriptor.artifact { " [artifact]" } else { "" };
        println!("{}{marker}\n    {}", descriptor.name, descriptor.description);
    }
}

async fn handle_chat(config: StockbotConfig) -> Result<()> {
    let provider: Arc<dyn ModelProvider> = Arc::from(create_provider(&config)?);
    let registry = Arc::new(stockbot_tools::default_registry(&config));
    info!(
        model = provider.model_id(),
        tools = registry.len(),
        "Starting stockbot"
    );

    let mut orchestrator =
        Orchestrator::new(provider, registry, OrchestratorSettings::from_config(&config));
    let mut display = TerminalDisplay::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Ask about any stock. Type 'exit' to quit.");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }
        orchestrator.handle_turn(input, &mut display).await;
    }

    let usage = orchestrator.usage();
    info!(
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "Session ended"
    );
    Ok(())
}
