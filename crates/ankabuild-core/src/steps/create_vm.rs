use crate::state::RunState;
use crate::step::{Step, StepAction};
use crate::CoreError;
use ankabuild_client::{CloneParams, CreateDiskParams, CreateParams, DeleteParams};
use ankabuild_schema::VmSource;
use tracing::{debug, info};

/// Produces the build VM by cloning a source VM, first installing that source
/// from an installer app when no existing VM was configured.
///
/// On cleanup the clone is force-deleted if the run was cancelled, left alone
/// if the stop step shut it down, and suspended otherwise.
#[derive(Debug, Default)]
pub struct CreateVm {
    vm_name: Option<String>,
}

impl CreateVm {
    pub fn new() -> Self {
        Self::default()
    }

    fn install_source(state: &mut RunState, app: &str) -> Result<String, CoreError> {
        let config = state.config();
        let client = state.client();
        let ui = state.ui();

        ui.say("Creating a new disk from installer, this will take a while");
        let image_id = client.create_disk(&CreateDiskParams {
            disk_size: config.disk_size.clone(),
            installer_app: app.to_owned(),
        })?;
        debug!("installer produced image {image_id}");

        let base = state.names().base_vm_name();
        ui.say("Creating a new virtual machine for disk");
        client
            .create(&CreateParams {
                image_id,
                ram_size: config.ram_size.clone(),
                cpu_count: config.cpu_count,
                name: base.clone(),
            })
            .map_err(|source| CoreError::Command {
                action: "error creating VM".to_owned(),
                source,
            })?;
        ui.say(&format!("VM {base} was created"));
        Ok(base)
    }
}

impl Step for CreateVm {
    fn name(&self) -> &'static str {
        "create_vm"
    }

    fn run(&mut self, state: &mut RunState) -> Result<StepAction, CoreError> {
        let config = state.config();
        let source = match &config.source {
            VmSource::Existing { name } => name.clone(),
            VmSource::Installer { app } => Self::install_source(state, app)?,
        };

        let client = state.client();
        let description = client.describe(&source)?;

        let vm_name = match &config.vm_name {
            Some(name) => name.clone(),
            None => state.names().vm_name(),
        };

        state.ui().say(&format!(
            "Cloning source VM {source} into a new virtual machine {vm_name}"
        ));
        client.clone_vm(&CloneParams {
            vm_name: vm_name.clone(),
            source_uuid: description.uuid,
        })?;
        info!("cloned {source} into {vm_name}");

        self.vm_name = Some(vm_name.clone());
        state.set_vm_name(&vm_name)?;
        Ok(StepAction::Continue)
    }

    fn cleanup(&mut self, state: &mut RunState) -> Result<(), CoreError> {
        let Some(vm_name) = self.vm_name.take() else {
            return Ok(());
        };
        let client = state.client();

        if state.is_cancelled() {
            info!("run cancelled, deleting {vm_name}");
            client.delete(&DeleteParams {
                vm_name,
                force: true,
            })?;
            return Ok(());
        }
        if state.is_stopped() {
            debug!("{vm_name} was stopped, leaving it as is");
            return Ok(());
        }

        debug!("suspending {vm_name}");
        client.suspend(&vm_name)?;
        Ok(())
    }
}
