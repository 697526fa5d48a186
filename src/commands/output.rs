use anyhow::Result;
use serde::Serialize;

use crate::http::{ApiError, ErrorKind};

/// Writes command results to stdout as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn emit<T: Serialize>(&self, value: &T) -> Result<()> {
        if !self.quiet {
            println!("{}", render(value)?);
        }
        Ok(())
    }

    /// Human-readable status line on stderr.
    pub fn status(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }
}

pub fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Formats an error for the terminal, including per-field validation
/// messages.
pub fn report(err: &anyhow::Error) -> String {
    let Some(api) = err.downcast_ref::<ApiError>() else {
        return format!("Error: {:#}", err);
    };

    let mut out = match api.status() {
        Some(status) => format!("Error [{}] (HTTP {}): {}", api.code(), status, api.message()),
        None => format!("Error [{}]: {}", api.code(), api.message()),
    };
    if let Some(fields) = api.field_errors() {
        for (field, messages) in fields {
            for message in messages {
                out.push_str(&format!("\n  {}: {}", field, message));
            }
        }
    }
    out
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ApiError>().map(ApiError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::Authentication) => 3,
        Some(ErrorKind::NotFound) => 4,
        Some(ErrorKind::Conflict) => 5,
        Some(ErrorKind::Network) => 6,
        Some(ErrorKind::Generic(_)) | None => 1,
    }
}
