//! Build template parsing, validation, and naming for ankabuild.
//!
//! This crate defines the configuration layer: the TOML build template
//! (`BuildTemplate`) as written by users, the validated and immutable
//! `BuildConfig` consumed by the orchestrator, Go-style duration parsing for
//! `boot_delay`, and the injectable `NameGenerator` used for auto-generated VM
//! and port-forwarding rule names.

pub mod config;
pub mod duration;
pub mod naming;

pub use config::{
    load_config, parse_template_file, parse_template_str, BuildConfig, BuildTemplate, CpuCount,
    PortForwardingRule, PortForwardingTemplate, RegistryConfig, VmSource, DEFAULT_BOOT_DELAY,
};
pub use duration::parse_duration;
pub use naming::{NameGenerator, NAME_ALPHABET, RANDOM_SUFFIX_LEN};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read build template: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse build template: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid build configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("conflicting options: {0}")]
    Conflict(String),
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
}
