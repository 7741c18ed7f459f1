pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::errors::{EvalError, JudgeError};
use crate::infrastructure::config::ConfigError;

/// Best hint for an error chain, from the first typed error that carries one.
pub fn error_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            Some(e.hint())
        } else if let Some(e) = cause.downcast_ref::<EvalError>() {
            Some(e.hint())
        } else {
            cause.downcast_ref::<JudgeError>().map(JudgeError::hint)
        }
    })
}

/// Print an error with its hint and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let hint = error_hint(&err);
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
            "hint": hint,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
        if let Some(hint) = hint {
            eprintln!("Hint: {hint}");
        }
    }
    std::process::exit(1);
}
