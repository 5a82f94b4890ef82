pub mod build;
pub mod registry;
pub mod validate;

use ankabuild_client::ClientError;
use ankabuild_core::CoreError;
use ankabuild_schema::ConfigError;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_CANCELLED: u8 = 130;

/// A failed command and the exit code it maps to.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    pub code: u8,
    pub message: String,
}

impl CommandError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: EXIT_FAILURE,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self {
            code: EXIT_CONFIG_ERROR,
            message: message.into(),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        Self::config(format!("config error: {e}"))
    }
}

impl From<ClientError> for CommandError {
    fn from(e: ClientError) -> Self {
        if matches!(e, ClientError::Config(_)) {
            Self::config(e.to_string())
        } else {
            Self::failure(e.to_string())
        }
    }
}

impl From<CoreError> for CommandError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Cancelled => Self {
                code: EXIT_CANCELLED,
                message: e.to_string(),
            },
            CoreError::Config(inner) => inner.into(),
            CoreError::Client(inner) => inner.into(),
            _ => Self::failure(e.to_string()),
        }
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, CommandError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CommandError::failure(format!("cannot encode JSON output: {e}")))
}

/// Spinner on stderr while a registry call runs. JSON output gets none.
pub struct Progress(Option<ProgressBar>);

impl Progress {
    pub fn start(json: bool, msg: &str) -> Self {
        if json {
            return Self(None);
        }
        let pb = ProgressBar::new_spinner().with_message(msg.to_owned());
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}").expect("valid template"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self(Some(pb))
    }

    /// Settles the spinner on `result` and hands it back as a command result.
    pub fn finish<T, E: Into<CommandError>>(
        self,
        result: Result<T, E>,
        what: &str,
    ) -> Result<T, CommandError> {
        if let Some(pb) = self.0 {
            let line = match &result {
                Ok(_) => format!("{} {what} complete", Style::new().green().apply_to("✓")),
                Err(_) => format!("{} {what} failed", Style::new().red().apply_to("✗")),
            };
            pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
            pb.finish_with_message(line);
        }
        result.map_err(Into::into)
    }
}
