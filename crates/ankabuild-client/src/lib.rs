//! Client for the `anka` virtualization CLI and the Anka registry.
//!
//! Every VM operation goes through [`AnkaClient::invoke`], which runs one
//! `anka --machine-readable` command and parses the JSON envelope it prints.
//! Typed operations (`describe`, `clone_vm`, `stop`, ...) are provided methods
//! layered on top, so a scripted [`FakeClient`] can stand in for the real
//! subprocess-backed [`CliClient`]. Registry reverts and listings can also be
//! issued over the registry's REST API with mutual TLS.

pub mod cli;
pub mod client;
pub mod fake;
pub mod output;
pub mod registry;

pub use cli::CliClient;
pub use client::{
    AnkaClient, CloneParams, CreateDiskParams, CreateParams, DeleteParams, StopParams,
};
pub use fake::FakeClient;
pub use output::{parse_output, CommandResult, CpuInfo, VmDescription, STATUS_OK};
pub use registry::{RegistryEntry, RegistryPushParams, RegistryRestClient};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to launch '{binary}': {source}")]
    ProcessLaunch {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed tool output: {0}")]
    MalformedOutput(String),
    /// Non-OK status reported in-band by the tool. The message is the tool's own.
    #[error("{message}")]
    Tool {
        exception_type: Option<String>,
        message: String,
    },
    #[error("unsupported http response code: {0}")]
    UnsupportedResponse(u16),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error("client I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected response body: {0}")]
    Serialization(String),
    #[error("registry config error: {0}")]
    Config(String),
}
