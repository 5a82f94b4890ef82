use crate::client::AnkaClient;
use crate::output::{parse_output, CommandResult};
use crate::ClientError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, trace};

const DEFAULT_BINARY: &str = "anka";

/// Runs the real `anka` binary.
///
/// Each call blocks until the subprocess exits. There is no timeout: a hung
/// `anka` hangs the build.
#[derive(Debug, Clone)]
pub struct CliClient {
    binary: PathBuf,
}

impl Default for CliClient {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
        }
    }
}

impl CliClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl AnkaClient for CliClient {
    fn invoke(&self, command: &str, args: &[String]) -> Result<CommandResult, ClientError> {
        debug!("[anka] {command} {}", args.join(" "));

        let output = Command::new(&self.binary)
            .arg("--machine-readable")
            .arg(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ClientError::ProcessLaunch {
                binary: self.binary.display().to_string(),
                source: e,
            })?;

        if !output.stderr.is_empty() {
            debug!(
                "[anka] {command} stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }
        if !output.status.success() {
            // Exit status is advisory; the envelope on stdout is authoritative.
            debug!("[anka] {command} exited with {}", output.status);
        }

        let result = parse_output(&output.stdout)?;
        trace!("[anka] {command} -> {result:?}");
        Ok(result)
    }
}
