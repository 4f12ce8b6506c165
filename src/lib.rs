//! Stockbot: a chat-driven stock-analysis assistant.
//!
//! A language model answers questions by calling tools from a
//! [`ToolRegistry`](tools::ToolRegistry). The
//! [`Orchestrator`](agent::Orchestrator) sends the conversation and the
//! registry's schemas to the completion service, runs the tool calls it gets
//! back, and asks for a plain-text summary.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockbot::prelude::*;
//! use stockbot::display::RecordingDisplay;
//!
//! # async fn example(modules: Vec<Box<dyn ToolModule>>) -> stockbot::error::Result<()> {
//! let config = StockbotConfig::from_env()?;
//! let provider: Arc<dyn ModelProvider> = Arc::from(create_provider(&config)?);
//! let registry = Arc::new(ModuleScanner::new().scan(&modules));
//!
//! let mut orchestrator =
//!     Orchestrator::new(provider, registry, OrchestratorSettings::from_config(&config));
//! let mut display = RecordingDisplay::new();
//! orchestrator.handle_turn("What is stock price of APPLE", &mut display).await;
//! println!("{}", display.rendered_text());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod display;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;
