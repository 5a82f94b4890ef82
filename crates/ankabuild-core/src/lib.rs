//! Provisioning orchestrator for Anka virtual machines.
//!
//! A build is a fixed sequence of [`Step`]s driven by a [`Runner`]. Each step
//! reads what earlier steps produced from the shared [`RunState`], drives the
//! `anka` tool through an [`ankabuild_client::AnkaClient`], and returns a
//! [`StepAction`]. However the run ends, every step that ran is cleaned up in
//! reverse order.
//! [`Builder`] assembles the standard step list and turns the outcome into a
//! [`BuildArtifact`] or an error.

pub mod builder;
pub mod cancel;
pub mod runner;
pub mod state;
pub mod step;
pub mod steps;
pub mod ui;

pub use builder::{BuildArtifact, Builder};
pub use cancel::{install_signal_handler, CancelFlag};
pub use runner::{RunOutcome, RunPhase, Runner};
pub use state::RunState;
pub use step::{Step, StepAction};
pub use ui::{ConsoleUi, MemoryUi, Ui, UiMessage};

use ankabuild_client::ClientError;
use ankabuild_schema::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("{action}: {source}")]
    Command {
        action: String,
        #[source]
        source: ClientError,
    },
    #[error("run state '{0}' was read before any step set it")]
    MissingState(&'static str),
    #[error("run state '{key}' is already '{current}', refusing to change it to '{attempted}'")]
    StateConflict {
        key: &'static str,
        current: String,
        attempted: String,
    },
    #[error("build cancelled")]
    Cancelled,
    #[error("build halted by step '{0}'")]
    Halted(String),
    #[error("cleanup of step '{step}' failed: {source}")]
    Cleanup {
        step: String,
        #[source]
        source: Box<CoreError>,
    },
}
