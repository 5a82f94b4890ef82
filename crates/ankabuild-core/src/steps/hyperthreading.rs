use crate::state::RunState;
use crate::step::{Step, StepAction};
use crate::CoreError;
use ankabuild_client::StopParams;
use ankabuild_schema::ConfigError;
use tracing::debug;

/// Turns hyperthreading on or off for the build VM. Changing the CPU topology
/// requires the VM to be stopped, so it is force-stopped first.
#[derive(Debug, Default)]
pub struct SetHyperThreading;

impl SetHyperThreading {
    pub fn new() -> Self {
        Self
    }
}

impl Step for SetHyperThreading {
    fn name(&self) -> &'static str {
        "set_hyperthreading"
    }

    fn run(&mut self, state: &mut RunState) -> Result<StepAction, CoreError> {
        let config = state.config();
        let (enable, disable) = (config.enable_htt, config.disable_htt);

        if !enable && !disable {
            return Ok(StepAction::Continue);
        }
        // The config is trusted but not re-validated on its way here.
        if enable && disable {
            return Err(ConfigError::Conflict(
                "enable_htt and disable_htt are mutually exclusive".to_owned(),
            )
            .into());
        }

        let client = state.client();
        let vm_name = state.vm_name()?.to_owned();

        let description = client.describe(&vm_name)?;
        if disable && description.cpu.threads == 0 {
            debug!("{vm_name} already has hyperthreading disabled");
            return Ok(StepAction::Continue);
        }

        client.show(&vm_name)?;

        let flag = if enable { "--htt" } else { "--no-htt" };
        state
            .ui()
            .say(&format!("Stopping VM {vm_name} to apply cpu {flag}"));
        client.stop(&StopParams {
            vm_name: vm_name.clone(),
            force: true,
        })?;

        client.modify(&vm_name, &["set", "cpu", flag])?.into_ok()?;
        Ok(StepAction::Continue)
    }
}
