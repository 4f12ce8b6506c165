//! CLI-specific error formatting for user-facing messages.

use stockbot::error::StockbotError;

/// Map a [`StockbotError`] to a user-facing help string with actionable guidance.
pub fn format_error_help(err: &StockbotError) -> String {
    match err {
        StockbotError::Authentication(msg) => {
            format!("Authentication failed: {msg}. Set API_KEY in the environment, .env or stockbot.toml")
        }
        StockbotError::Configuration(msg) => {
            format!("Configuration error: {msg}. Set BASE_URL in the environment, .env or stockbot.toml")
        }
        other => format!("{other}"),
    }
}
