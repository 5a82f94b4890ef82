use crate::output::{CommandResult, VmDescription};
use crate::registry::{registry_args, RegistryEntry, RegistryPushParams};
use crate::ClientError;
use ankabuild_schema::{PortForwardingRule, RegistryConfig};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDiskParams {
    pub disk_size: Option<String>,
    pub installer_app: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParams {
    pub image_id: String,
    pub ram_size: Option<String>,
    pub cpu_count: Option<u32>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneParams {
    pub vm_name: String,
    pub source_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopParams {
    pub vm_name: String,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteParams {
    pub vm_name: String,
    pub force: bool,
}

#[derive(Deserialize)]
struct CreateDiskBody {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct CreateBody {
    #[serde(default)]
    uuid: String,
}

fn to_args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// Request/response interface to the `anka` tool.
///
/// Implementors only provide [`invoke`](AnkaClient::invoke); every typed
/// operation is built on it. Typed operations treat a non-OK status as
/// [`ClientError::Tool`], except [`modify`](AnkaClient::modify) which hands the
/// raw result back to the caller.
pub trait AnkaClient: Send + Sync {
    /// Run `command` with `args` and parse the JSON envelope from stdout.
    ///
    /// A non-OK status is not an error at this layer.
    fn invoke(&self, command: &str, args: &[String]) -> Result<CommandResult, ClientError>;

    fn invoke_ok(&self, command: &str, args: &[String]) -> Result<CommandResult, ClientError> {
        self.invoke(command, args)?.into_ok()
    }

    /// Install a disk image from an installer app. Returns the image id.
    fn create_disk(&self, params: &CreateDiskParams) -> Result<String, ClientError> {
        let mut args = Vec::new();
        if let Some(size) = &params.disk_size {
            args.extend(to_args(["--disk-size", size.as_str()]));
        }
        args.extend(to_args(["--app", params.installer_app.as_str()]));
        let body: CreateDiskBody = self.invoke_ok("create-disk", &args)?.body_as()?;
        Ok(body.id)
    }

    /// Create a VM around an existing image. Returns the new VM's UUID.
    fn create(&self, params: &CreateParams) -> Result<String, ClientError> {
        let mut args = to_args(["--image-id", params.image_id.as_str()]);
        if let Some(ram) = &params.ram_size {
            args.extend(to_args(["--ram-size", ram.as_str()]));
        }
        if let Some(cpu) = params.cpu_count {
            args.extend(to_args(["--cpu-count", cpu.to_string().as_str()]));
        }
        args.push(params.name.clone());
        let body: CreateBody = self.invoke_ok("create", &args)?.body_as()?;
        Ok(body.uuid)
    }

    fn clone_vm(&self, params: &CloneParams) -> Result<(), ClientError> {
        let args = to_args([params.source_uuid.as_str(), params.vm_name.as_str()]);
        self.invoke_ok("clone", &args)?;
        Ok(())
    }

    fn describe(&self, vm_name: &str) -> Result<VmDescription, ClientError> {
        self.invoke_ok("describe", &to_args([vm_name]))?.body_as()
    }

    fn show(&self, vm_name: &str) -> Result<Value, ClientError> {
        let result = self.invoke_ok("show", &to_args([vm_name]))?;
        Ok(result.body.unwrap_or(Value::Null))
    }

    fn start(&self, vm_name: &str) -> Result<(), ClientError> {
        self.invoke_ok("start", &to_args([vm_name]))?;
        Ok(())
    }

    fn stop(&self, params: &StopParams) -> Result<(), ClientError> {
        let mut args = Vec::new();
        if params.force {
            args.push("--force".to_owned());
        }
        args.push(params.vm_name.clone());
        self.invoke_ok("stop", &args)?;
        Ok(())
    }

    fn suspend(&self, vm_name: &str) -> Result<(), ClientError> {
        self.invoke_ok("suspend", &to_args([vm_name]))?;
        Ok(())
    }

    fn delete(&self, params: &DeleteParams) -> Result<(), ClientError> {
        let mut args = Vec::new();
        if params.force {
            args.push("--force".to_owned());
        }
        args.push(params.vm_name.clone());
        self.invoke_ok("delete", &args)?;
        Ok(())
    }

    /// `modify <vm> <args...>`, returning the raw result.
    fn modify(&self, vm_name: &str, args: &[&str]) -> Result<CommandResult, ClientError> {
        let mut full = vec![vm_name.to_owned()];
        full.extend(args.iter().map(|a| (*a).to_owned()));
        self.invoke("modify", &full)
    }

    fn add_port_forwarding(
        &self,
        vm_name: &str,
        rule: &PortForwardingRule,
    ) -> Result<(), ClientError> {
        let guest = rule.guest_port.to_string();
        let host = rule.host_port.map(|p| p.to_string());
        let mut args = vec!["add", "port-forwarding", "--guest-port", guest.as_str()];
        if let Some(host) = &host {
            args.extend(["--host-port", host.as_str()]);
        }
        args.push(rule.name.as_str());
        self.modify(vm_name, &args)?.into_ok()?;
        Ok(())
    }

    fn registry_list(&self, registry: &RegistryConfig) -> Result<Vec<RegistryEntry>, ClientError> {
        let mut args = registry_args(registry);
        args.push("list".to_owned());
        let result = self.invoke("registry", &args)?;
        if !result.is_ok() {
            warn!(
                "registry list failed: {} {}",
                result.exception_type.as_deref().unwrap_or_default(),
                result.message.as_deref().unwrap_or_default()
            );
        }
        let result = result.into_ok()?;
        match result.body {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => result.body_as(),
        }
    }

    fn registry_push(
        &self,
        registry: &RegistryConfig,
        push: &RegistryPushParams,
    ) -> Result<(), ClientError> {
        let mut args = registry_args(registry);
        args.push("push".to_owned());
        args.extend(push.to_args());
        let result = self.invoke("registry", &args)?;
        if !result.is_ok() {
            warn!(
                "registry push failed: {} {}",
                result.exception_type.as_deref().unwrap_or_default(),
                result.message.as_deref().unwrap_or_default()
            );
        }
        result.into_ok()?;
        Ok(())
    }
}
