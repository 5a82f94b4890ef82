use crate::state::RunState;
use crate::step::{Step, StepAction};
use crate::CoreError;
use std::thread;
use tracing::info;

/// Boots the build VM and waits `boot_delay` for the guest to come up.
#[derive(Debug, Default)]
pub struct StartVm;

impl StartVm {
    pub fn new() -> Self {
        Self
    }
}

impl Step for StartVm {
    fn name(&self) -> &'static str {
        "start_vm"
    }

    fn run(&mut self, state: &mut RunState) -> Result<StepAction, CoreError> {
        let config = state.config();
        let vm_name = state.vm_name()?.to_owned();

        state.ui().say(&format!("Starting VM {vm_name}"));
        state.client().start(&vm_name)?;

        if !config.boot_delay.is_zero() {
            state.ui().say(&format!(
                "Waiting {:?} for {vm_name} to boot",
                config.boot_delay
            ));
            thread::sleep(config.boot_delay);
        }
        info!("{vm_name} started");
        Ok(StepAction::Continue)
    }
}
