use crate::state::RunState;
use crate::CoreError;

/// What the runner should do after a step's `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Continue,
    Halt,
}

/// One unit of the build.
///
/// `run` returning `Err` halts the build and the error becomes the run's
/// fatal error. `cleanup` is called for every step whose `run` was entered,
/// whether it succeeded or not, so it must check for itself whether there is
/// anything to undo, and calling it twice must be harmless. A step keeps in its
/// own fields whatever it needs to undo; it must not keep the state.
pub trait Step {
    fn name(&self) -> &'static str;

    fn run(&mut self, state: &mut RunState) -> Result<StepAction, CoreError>;

    fn cleanup(&mut self, _state: &mut RunState) -> Result<(), CoreError> {
        Ok(())
    }
}
