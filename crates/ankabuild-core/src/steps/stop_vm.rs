use crate::state::RunState;
use crate::step::{Step, StepAction};
use crate::CoreError;
use ankabuild_client::StopParams;

/// Shuts the build VM down gracefully when `stop_vm` is set, so it is left
/// stopped rather than suspended.
#[derive(Debug, Default)]
pub struct StopVm;

impl StopVm {
    pub fn new() -> Self {
        Self
    }
}

impl Step for StopVm {
    fn name(&self) -> &'static str {
        "stop_vm"
    }

    fn run(&mut self, state: &mut RunState) -> Result<StepAction, CoreError> {
        if !state.config().stop_vm {
            return Ok(StepAction::Continue);
        }
        let vm_name = state.vm_name()?.to_owned();

        state.ui().say(&format!("Stopping VM {vm_name}"));
        state.client().stop(&StopParams {
            vm_name,
            force: false,
        })?;
        state.mark_stopped();
        Ok(StepAction::Continue)
    }
}
