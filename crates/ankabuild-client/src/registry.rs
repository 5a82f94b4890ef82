//! Anka registry access.
//!
//! Listing and pushing go through `anka registry ...` like every other
//! command. Reverting a pushed version is only exposed by the registry's REST
//! API, so [`RegistryRestClient`] talks to it directly with mutual TLS.

use crate::output::{parse_output, CommandResult};
use crate::ClientError;
use ankabuild_schema::RegistryConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;
use ureq::tls::{Certificate, ClientCert, PrivateKey, RootCerts, TlsConfig};

/// One entry of `anka registry list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(default)]
    pub latest: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryPushParams {
    pub vm_id: String,
    pub tag: Option<String>,
    pub description: Option<String>,
    pub remote_vm: Option<String>,
    pub local: bool,
}

impl RegistryPushParams {
    pub(crate) fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(tag) = &self.tag {
            args.extend(["--tag".to_owned(), tag.clone()]);
        }
        if let Some(description) = &self.description {
            args.extend(["--description".to_owned(), description.clone()]);
        }
        if let Some(remote_vm) = &self.remote_vm {
            args.extend(["--remote-vm".to_owned(), remote_vm.clone()]);
        }
        if self.local {
            args.push("--local".to_owned());
        }
        args.push(self.vm_id.clone());
        args
    }
}

/// Global `anka registry` options selecting the registry and its credentials.
///
/// A named remote wins over an explicit URL.
pub(crate) fn registry_args(registry: &RegistryConfig) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(name) = &registry.name {
        args.extend(["--remote".to_owned(), name.clone()]);
    } else if let Some(url) = &registry.url {
        args.extend(["--registry-path".to_owned(), url.clone()]);
    }
    if let Some(cert) = &registry.cert {
        args.extend(["--cert".to_owned(), cert.display().to_string()]);
    }
    if let Some(key) = &registry.key {
        args.extend(["--key".to_owned(), key.display().to_string()]);
    }
    if let Some(cacert) = &registry.cacert {
        args.extend(["--cacert".to_owned(), cacert.display().to_string()]);
    }
    if registry.insecure {
        args.push("--insecure".to_owned());
    }
    args
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ClientError> {
    std::fs::read(path)
        .map_err(|e| ClientError::Tls(format!("failed to read {}: {e}", path.display())))
}

fn tls_config(registry: &RegistryConfig) -> Result<TlsConfig, ClientError> {
    let mut builder = TlsConfig::builder().disable_verification(registry.insecure);

    if let (Some(cert_path), Some(key_path)) = (&registry.cert, &registry.key) {
        let cert_pem = read_pem(cert_path)?;
        let key_pem = read_pem(key_path)?;
        let cert = Certificate::from_pem(&cert_pem)
            .map_err(|e| ClientError::Tls(format!("{}: {e}", cert_path.display())))?;
        let key = PrivateKey::from_pem(&key_pem)
            .map_err(|e| ClientError::Tls(format!("{}: {e}", key_path.display())))?;
        builder = builder.client_cert(Some(ClientCert::new_with_certs(&[cert], key)));
    }

    if let Some(ca_path) = &registry.cacert {
        let ca_pem = read_pem(ca_path)?;
        let ca = Certificate::from_pem(&ca_pem)
            .map_err(|e| ClientError::Tls(format!("{}: {e}", ca_path.display())))?;
        builder = builder.root_certs(RootCerts::new_with_certs(&[ca]));
    }

    Ok(builder.build())
}

/// Registry REST API client.
///
/// Only HTTP 200 responses carry a parseable envelope; anything else is
/// reported as [`ClientError::UnsupportedResponse`].
pub struct RegistryRestClient {
    url: String,
    agent: ureq::Agent,
}

impl RegistryRestClient {
    pub fn new(registry: &RegistryConfig) -> Result<Self, ClientError> {
        let url = registry
            .url
            .as_deref()
            .ok_or_else(|| ClientError::Config("registry_path is required".to_owned()))?
            .trim_end_matches('/')
            .to_owned();

        let config = ureq::Agent::config_builder()
            .tls_config(tls_config(registry)?)
            .http_status_as_error(false)
            .build();
        let agent = ureq::Agent::new_with_config(config);
        Ok(Self { url, agent })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn handle_response(
        method: &str,
        url: &str,
        resp: ureq::http::Response<ureq::Body>,
    ) -> Result<CommandResult, ClientError> {
        let code = resp.status().as_u16();
        if code != 200 {
            debug!("[API RESPONSE] {method} {url} -> HTTP {code}");
            return Err(ClientError::UnsupportedResponse(code));
        }
        let body = resp
            .into_body()
            .read_to_vec()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        debug!("[API RESPONSE] {}", String::from_utf8_lossy(&body));
        parse_output(&body)
    }

    /// DELETE with query parameters; ureq percent-encodes them.
    fn delete(&self, url: &str, query: &[(&str, &str)]) -> Result<CommandResult, ClientError> {
        debug!("[API REQUEST] [DELETE] {url} {query:?}");
        let mut request = self.agent.delete(url);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let resp = request
            .call()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Self::handle_response("DELETE", url, resp)
    }

    fn get(&self, url: &str) -> Result<CommandResult, ClientError> {
        debug!("[API REQUEST] [GET] {url}");
        let resp = self
            .agent
            .get(url)
            .call()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Self::handle_response("GET", url, resp)
    }

    /// Revert the latest pushed version of template `id`.
    pub fn revert(&self, id: &str) -> Result<(), ClientError> {
        let url = format!("{}/registry/revert", self.url);
        let result = self.delete(&url, &[("id", id)])?;
        if !result.is_ok() {
            return Err(ClientError::Tool {
                message: format!(
                    "failed to revert VM on registry: {}",
                    result.message.as_deref().unwrap_or_default()
                ),
                exception_type: result.exception_type,
            });
        }
        Ok(())
    }

    /// List templates known to the registry.
    pub fn list(&self) -> Result<Vec<RegistryEntry>, ClientError> {
        let url = format!("{}/registry/vm", self.url);
        let result = self.get(&url)?.into_ok()?;
        match result.body {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => result.body_as(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn push_arguments_in_order() {
        let params = RegistryPushParams {
            vm_id: "build-vm".to_owned(),
            tag: Some("v1".to_owned()),
            description: Some("nightly".to_owned()),
            remote_vm: Some("macos".to_owned()),
            local: true,
        };
        assert_eq!(
            params.to_args(),
            vec![
                "--tag",
                "v1",
                "--description",
                "nightly",
                "--remote-vm",
                "macos",
                "--local",
                "build-vm"
            ]
        );
    }

    #[test]
    fn registry_arguments_prefer_named_remote() {
        let registry = RegistryConfig {
            name: Some("main".to_owned()),
            url: Some("https://registry.example.com".to_owned()),
            cert: Some(PathBuf::from("/certs/node.pem")),
            key: Some(PathBuf::from("/certs/node-key.pem")),
            cacert: Some(PathBuf::from("/certs/ca.pem")),
            insecure: true,
        };
        assert_eq!(
            registry_args(&registry),
            vec![
                "--remote",
                "main",
                "--cert",
                "/certs/node.pem",
                "--key",
                "/certs/node-key.pem",
                "--cacert",
                "/certs/ca.pem",
                "--insecure"
            ]
        );
    }

    #[test]
    fn rest_client_requires_url() {
        let err = RegistryRestClient::new(&RegistryConfig::default())
            .err()
            .expect("missing url must fail");
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn rest_client_strips_trailing_slash() {
        let client = RegistryRestClient::new(&RegistryConfig {
            url: Some("http://127.0.0.1:8089/".to_owned()),
            ..RegistryConfig::default()
        })
        .unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:8089");
    }

    #[test]
    fn unreadable_client_cert_is_tls_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegistryRestClient::new(&RegistryConfig {
            url: Some("https://registry.example.com".to_owned()),
            cert: Some(dir.path().join("missing.pem")),
            key: Some(dir.path().join("missing-key.pem")),
            ..RegistryConfig::default()
        })
        .err()
        .expect("missing cert must fail");
        assert!(matches!(err, ClientError::Tls(_)));
    }
}
