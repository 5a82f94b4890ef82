use crate::ClientError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_OK: &str = "OK";

/// One parsed `--machine-readable` envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(
        default,
        rename = "exceptionType",
        skip_serializing_if = "Option::is_none"
    )]
    pub exception_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl CommandResult {
    pub fn ok(body: Option<Value>) -> Self {
        Self {
            status: STATUS_OK.to_owned(),
            body,
            ..Self::default()
        }
    }

    pub fn failure(exception_type: &str, message: &str) -> Self {
        Self {
            status: "ERROR".to_owned(),
            exception_type: Some(exception_type.to_owned()),
            message: Some(message.to_owned()),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Turn an in-band failure into [`ClientError::Tool`].
    pub fn into_ok(self) -> Result<Self, ClientError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ClientError::Tool {
                message: self
                    .message
                    .unwrap_or_else(|| format!("command failed with status '{}'", self.status)),
                exception_type: self.exception_type,
            })
        }
    }

    /// Deserialize the body. A missing or `null` body reads as `{}` so that
    /// structs made entirely of defaulted fields still decode.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let body = match &self.body {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(v) => v.clone(),
        };
        serde_json::from_value(body).map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

pub fn parse_output(raw: &[u8]) -> Result<CommandResult, ClientError> {
    serde_json::from_slice(raw.trim_ascii()).map_err(|e| {
        let text = String::from_utf8_lossy(raw);
        let snippet: String = text.chars().take(200).collect();
        ClientError::MalformedOutput(format!("{e}: {snippet:?}"))
    })
}

/// Body of `anka describe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDescription {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "CPU")]
    pub cpu: CpuInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuInfo {
    #[serde(default, rename = "Cores")]
    pub cores: u32,
    #[serde(default, rename = "Threads")]
    pub threads: u32,
}
