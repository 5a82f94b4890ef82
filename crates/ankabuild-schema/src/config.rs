use crate::duration::parse_duration;
use crate::naming::NameGenerator;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BOOT_DELAY: &str = "10s";

/// The build template as written by the user.
///
/// Keys keep the names existing templates already use (`registry_path`,
/// `cacert`, `port_forwarding_guest_port`, ...). Nothing here is trusted until
/// [`BuildTemplate::validate`] has turned it into a [`BuildConfig`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildTemplate {
    #[serde(default)]
    pub installer_app: Option<String>,
    #[serde(default)]
    pub source_vm_name: Option<String>,

    #[serde(default)]
    pub vm_name: Option<String>,
    #[serde(default)]
    pub disk_size: Option<String>,
    #[serde(default)]
    pub ram_size: Option<String>,
    #[serde(default)]
    pub cpu_count: Option<CpuCount>,

    #[serde(default)]
    pub registry_name: Option<String>,
    #[serde(default)]
    pub registry_path: Option<String>,
    #[serde(default)]
    pub cert: Option<PathBuf>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub cacert: Option<PathBuf>,
    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub port_forwarding_rules: Vec<PortForwardingTemplate>,

    #[serde(default)]
    pub boot_delay: Option<String>,
    #[serde(default)]
    pub enable_htt: bool,
    #[serde(default)]
    pub disable_htt: bool,
    #[serde(default)]
    pub stop_vm: bool,
}

/// `cpu_count` is accepted both as `cpu_count = 4` and `cpu_count = "4"`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CpuCount {
    Number(u32),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PortForwardingTemplate {
    #[serde(default)]
    pub port_forwarding_guest_port: u16,
    #[serde(default)]
    pub port_forwarding_host_port: Option<u16>,
    #[serde(default)]
    pub port_forwarding_rule_name: Option<String>,
}

/// Where the build VM's disk comes from. Exactly one source is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VmSource {
    /// Install a fresh disk from a macOS installer app.
    Installer { app: String },
    /// Clone an existing VM.
    Existing { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortForwardingRule {
    pub guest_port: u16,
    pub host_port: Option<u16>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryConfig {
    pub name: Option<String>,
    pub url: Option<String>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub cacert: Option<PathBuf>,
    pub insecure: bool,
}

/// Validated build configuration. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildConfig {
    pub source: VmSource,
    pub vm_name: Option<String>,
    pub disk_size: Option<String>,
    pub ram_size: Option<String>,
    pub cpu_count: Option<u32>,
    pub enable_htt: bool,
    pub disable_htt: bool,
    pub port_forwarding_rules: Vec<PortForwardingRule>,
    pub registry: RegistryConfig,
    pub boot_delay: Duration,
    pub stop_vm: bool,
}

impl BuildConfig {
    /// Minimal configuration cloning `source_vm_name` into `vm_name`.
    pub fn from_source_vm(source_vm_name: &str, vm_name: &str) -> Self {
        Self {
            source: VmSource::Existing {
                name: source_vm_name.to_owned(),
            },
            vm_name: Some(vm_name.to_owned()),
            disk_size: None,
            ram_size: None,
            cpu_count: None,
            enable_htt: false,
            disable_htt: false,
            port_forwarding_rules: Vec::new(),
            registry: RegistryConfig::default(),
            boot_delay: Duration::from_secs(10),
            stop_vm: false,
        }
    }

    pub fn source_vm_name(&self) -> Option<&str> {
        match &self.source {
            VmSource::Existing { name, .. } => Some(name),
            VmSource::Installer { .. } => None,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl BuildTemplate {
    /// Apply defaults and check every rule, reporting all problems at once.
    ///
    /// Blank port-forwarding rule names are filled in from `names`.
    pub fn validate(self, names: &mut NameGenerator) -> Result<BuildConfig, ConfigError> {
        let mut errors = Vec::new();

        let installer_app = non_blank(self.installer_app);
        let source_vm_name = non_blank(self.source_vm_name);
        let vm_name = non_blank(self.vm_name);

        let source = match (installer_app, source_vm_name) {
            (None, None) => {
                errors.push("installer_app or source_vm_name must be specified".to_owned());
                None
            }
            (Some(_), Some(_)) => {
                errors.push("cannot specify both an installer_app and source_vm_name".to_owned());
                None
            }
            (Some(app), None) => Some(VmSource::Installer { app }),
            (None, Some(name)) => {
                if name.contains([' ', '\n']) {
                    errors.push("source_vm_name name contains spaces".to_owned());
                }
                Some(VmSource::Existing { name })
            }
        };

        if let Some(name) = &vm_name {
            if name.contains(char::is_whitespace) {
                errors.push("vm_name contains whitespace".to_owned());
            }
        }

        let cpu_count = match self.cpu_count {
            None => None,
            Some(CpuCount::Number(n)) => Some(n),
            Some(CpuCount::Text(text)) => match text.trim().parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    errors.push(format!("cpu_count must be an integer, got '{text}'"));
                    None
                }
            },
        };

        if self.enable_htt && self.disable_htt {
            errors.push("enable_htt and disable_htt are mutually exclusive".to_owned());
        }

        let mut port_forwarding_rules = Vec::with_capacity(self.port_forwarding_rules.len());
        for rule in self.port_forwarding_rules {
            if rule.port_forwarding_guest_port == 0 {
                errors.push("guest port is required".to_owned());
            }
            let name = match non_blank(rule.port_forwarding_rule_name) {
                Some(name) => name,
                None => {
                    let generated = names.suffix();
                    debug!("generated port forwarding rule name {generated}");
                    generated
                }
            };
            port_forwarding_rules.push(PortForwardingRule {
                guest_port: rule.port_forwarding_guest_port,
                host_port: rule.port_forwarding_host_port.filter(|p| *p != 0),
                name,
            });
        }

        let cert = self.cert.filter(|p| !p.as_os_str().is_empty());
        let key = self.key.filter(|p| !p.as_os_str().is_empty());
        if cert.is_some() != key.is_some() {
            errors.push("cert and key must be specified together".to_owned());
        }

        let boot_delay_text =
            non_blank(self.boot_delay).unwrap_or_else(|| DEFAULT_BOOT_DELAY.to_owned());
        let boot_delay = match parse_duration(&boot_delay_text) {
            Ok(d) => d,
            Err(e) => {
                errors.push(format!("boot_delay: {e}"));
                Duration::ZERO
            }
        };

        match source {
            Some(source) if errors.is_empty() => Ok(BuildConfig {
                source,
                vm_name,
                disk_size: non_blank(self.disk_size),
                ram_size: non_blank(self.ram_size),
                cpu_count,
                enable_htt: self.enable_htt,
                disable_htt: self.disable_htt,
                port_forwarding_rules,
                registry: RegistryConfig {
                    name: non_blank(self.registry_name),
                    url: non_blank(self.registry_path)
                        .map(|u| u.trim_end_matches('/').to_owned()),
                    cert,
                    key,
                    cacert: self.cacert.filter(|p| !p.as_os_str().is_empty()),
                    insecure: self.insecure,
                },
                boot_delay,
                stop_vm: self.stop_vm,
            }),
            _ => Err(ConfigError::Invalid(errors)),
        }
    }
}

pub fn parse_template_str(input: &str) -> Result<BuildTemplate, ConfigError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_template_file(path: impl AsRef<Path>) -> Result<BuildTemplate, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_template_str(&content)
}

/// Read, parse, and validate a template file in one go.
pub fn load_config(
    path: impl AsRef<Path>,
    names: &mut NameGenerator,
) -> Result<BuildConfig, ConfigError> {
    parse_template_file(path)?.validate(names)
}
