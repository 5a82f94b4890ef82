use crate::state::RunState;
use crate::step::{Step, StepAction};
use crate::CoreError;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Where the runner is. Indices refer to the step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Pending(usize),
    Running(usize),
    Halted(usize),
    Cancelled(usize),
    Completed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(i) => write!(f, "pending({i})"),
            Self::Running(i) => write!(f, "running({i})"),
            Self::Halted(i) => write!(f, "halted({i})"),
            Self::Cancelled(i) => write!(f, "cancelled({i})"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

impl RunPhase {
    pub fn can_transition_to(self, to: RunPhase) -> bool {
        match (self, to) {
            (Self::Pending(i), Self::Running(j) | Self::Cancelled(j)) => i == j,
            (Self::Running(i), Self::Pending(j)) => j == i + 1,
            (Self::Running(i), Self::Halted(j) | Self::Cancelled(j)) => i == j,
            (
                Self::Pending(_) | Self::Running(_) | Self::Halted(_) | Self::Cancelled(_),
                Self::Completed,
            ) => true,
            _ => false,
        }
    }
}

/// How forward execution ended. Cleanup has run in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Halted { step: &'static str },
    Cancelled,
}

/// Drives an ordered list of steps.
///
/// Steps run strictly one after another. Forward execution stops at the
/// first `Halt`, the first error, or the first time cancellation is observed
/// around a step. Cancellation wins over a halt or error from the same step.
/// Then every step whose `run` was entered is cleaned up, last
/// first. Cleanup failures are reported and skipped; they never replace the
/// run's fatal error.
pub struct Runner {
    steps: Vec<Box<dyn Step>>,
    phase: RunPhase,
    history: Vec<RunPhase>,
}

impl Runner {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            steps,
            phase: RunPhase::Pending(0),
            history: vec![RunPhase::Pending(0)],
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Every phase entered so far, starting with `Pending(0)`.
    pub fn history(&self) -> &[RunPhase] {
        &self.history
    }

    fn transition(&mut self, to: RunPhase) {
        if !self.phase.can_transition_to(to) {
            warn!("unexpected run phase transition: {} -> {to}", self.phase);
        }
        debug!("run phase: {} -> {to}", self.phase);
        self.phase = to;
        self.history.push(to);
    }

    pub fn run(&mut self, state: &mut RunState) -> RunOutcome {
        let mut entered = 0;
        let mut outcome = RunOutcome::Succeeded;

        for i in 0..self.steps.len() {
            if i > 0 {
                self.transition(RunPhase::Pending(i));
            }
            if state.is_cancelled() {
                self.transition(RunPhase::Cancelled(i));
                outcome = RunOutcome::Cancelled;
                break;
            }

            self.transition(RunPhase::Running(i));
            entered = i + 1;
            let name = self.steps[i].name();
            info!("running step {name}");

            let halted = match self.steps[i].run(state) {
                Ok(StepAction::Continue) => false,
                Ok(StepAction::Halt) => {
                    info!("step {name} halted the build");
                    true
                }
                Err(e) => {
                    error!("step {name} failed: {e}");
                    state.ui().error(&e.to_string());
                    state.put_error(e);
                    true
                }
            };

            // An interrupt usually kills the running `anka` too, so a step
            // that fails while cancelled still counts as cancelled.
            if state.is_cancelled() {
                self.transition(RunPhase::Cancelled(i));
                outcome = RunOutcome::Cancelled;
                break;
            }
            if halted {
                self.transition(RunPhase::Halted(i));
                outcome = RunOutcome::Halted { step: name };
                break;
            }
        }

        if outcome == RunOutcome::Cancelled {
            state.ui().error("Build was cancelled.");
        }

        self.cleanup(state, entered);
        self.transition(RunPhase::Completed);
        outcome
    }

    fn cleanup(&mut self, state: &mut RunState, entered: usize) {
        for step in self.steps[..entered].iter_mut().rev() {
            debug!("cleaning up step {}", step.name());
            if let Err(e) = step.cleanup(state) {
                let err = CoreError::Cleanup {
                    step: step.name().to_owned(),
                    source: Box::new(e),
                };
                warn!("{err}");
                state.ui().error(&err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MemoryUi;
    use ankabuild_client::{ClientError, FakeClient};
    use ankabuild_schema::BuildConfig;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    enum Behavior {
        Continue,
        Halt,
        Fail,
        Cancel,
        CancelThenFail,
    }

    struct Recording {
        name: &'static str,
        behavior: Behavior,
        fail_cleanup: bool,
        log: Log,
    }

    impl Step for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn run(&mut self, state: &mut RunState) -> Result<StepAction, CoreError> {
            self.log.lock().unwrap().push(format!("run {}", self.name));
            match self.behavior {
                Behavior::Continue => Ok(StepAction::Continue),
                Behavior::Halt => Ok(StepAction::Halt),
                Behavior::Fail => Err(CoreError::Client(ClientError::Tool {
                    exception_type: None,
                    message: format!("{} exploded", self.name),
                })),
                Behavior::Cancel => {
                    state.cancel();
                    Ok(StepAction::Continue)
                }
                Behavior::CancelThenFail => {
                    state.cancel();
                    Err(CoreError::Client(ClientError::MalformedOutput(
                        "interrupted".to_owned(),
                    )))
                }
            }
        }

        fn cleanup(&mut self, _state: &mut RunState) -> Result<(), CoreError> {
            self.log.lock().unwrap().push(format!("cleanup {}", self.name));
            if self.fail_cleanup {
                return Err(CoreError::Halted(format!("{} cleanup broke", self.name)));
            }
            Ok(())
        }
    }

    fn step(name: &'static str, behavior: Behavior, log: &Log) -> Box<dyn Step> {
        Box::new(Recording {
            name,
            behavior,
            fail_cleanup: false,
            log: Arc::clone(log),
        })
    }

    fn state(ui: &Arc<MemoryUi>) -> RunState {
        RunState::new(
            Arc::new(BuildConfig::from_source_vm("base", "test-vm")),
            Arc::new(FakeClient::new()),
            Arc::clone(ui) as Arc<dyn crate::ui::Ui>,
        )
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn success_runs_all_then_cleans_up_in_reverse() {
        let log = Log::default();
        let ui = Arc::new(MemoryUi::new());
        let mut runner = Runner::new(vec![
            step("a", Behavior::Continue, &log),
            step("b", Behavior::Continue, &log),
            step("c", Behavior::Continue, &log),
        ]);

        let outcome = runner.run(&mut state(&ui));

        assert_eq!(outcome, RunOutcome::Succeeded);
        assert_eq!(
            entries(&log),
            vec!["run a", "run b", "run c", "cleanup c", "cleanup b", "cleanup a"]
        );
        assert_eq!(runner.phase(), RunPhase::Completed);
        assert!(ui.errors().is_empty());
    }

    #[test]
    fn error_halts_and_cleans_up_including_failed_step() {
        let log = Log::default();
        let ui = Arc::new(MemoryUi::new());
        let mut state = state(&ui);
        let mut runner = Runner::new(vec![
            step("a", Behavior::Continue, &log),
            step("b", Behavior::Fail, &log),
            step("c", Behavior::Continue, &log),
        ]);

        let outcome = runner.run(&mut state);

        assert_eq!(outcome, RunOutcome::Halted { step: "b" });
        assert_eq!(
            entries(&log),
            vec!["run a", "run b", "cleanup b", "cleanup a"]
        );
        assert_eq!(state.error().unwrap().to_string(), "b exploded");
        assert_eq!(ui.errors(), vec!["b exploded".to_owned()]);
        assert_eq!(
            runner.history(),
            &[
                RunPhase::Pending(0),
                RunPhase::Running(0),
                RunPhase::Pending(1),
                RunPhase::Running(1),
                RunPhase::Halted(1),
                RunPhase::Completed,
            ]
        );
    }

    #[test]
    fn halt_without_error_leaves_no_fatal_error() {
        let log = Log::default();
        let ui = Arc::new(MemoryUi::new());
        let mut state = state(&ui);
        let mut runner = Runner::new(vec![
            step("a", Behavior::Halt, &log),
            step("b", Behavior::Continue, &log),
        ]);

        assert_eq!(runner.run(&mut state), RunOutcome::Halted { step: "a" });
        assert!(state.error().is_none());
        assert_eq!(entries(&log), vec!["run a", "cleanup a"]);
    }

    #[test]
    fn cancellation_during_step_stops_before_next() {
        let log = Log::default();
        let ui = Arc::new(MemoryUi::new());
        let mut state = state(&ui);
        let mut runner = Runner::new(vec![
            step("a", Behavior::Continue, &log),
            step("b", Behavior::Cancel, &log),
            step("c", Behavior::Continue, &log),
        ]);

        let outcome = runner.run(&mut state);

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(
            entries(&log),
            vec!["run a", "run b", "cleanup b", "cleanup a"]
        );
        assert!(runner.history().contains(&RunPhase::Cancelled(1)));
        assert_eq!(ui.errors(), vec!["Build was cancelled.".to_owned()]);
    }

    #[test]
    fn failure_after_cancellation_counts_as_cancelled() {
        let log = Log::default();
        let ui = Arc::new(MemoryUi::new());
        let mut state = state(&ui);
        let mut runner = Runner::new(vec![
            step("a", Behavior::Continue, &log),
            step("b", Behavior::CancelThenFail, &log),
            step("c", Behavior::Continue, &log),
        ]);

        let outcome = runner.run(&mut state);

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(
            entries(&log),
            vec!["run a", "run b", "cleanup b", "cleanup a"]
        );
        assert_eq!(
            runner.history(),
            &[
                RunPhase::Pending(0),
                RunPhase::Running(0),
                RunPhase::Pending(1),
                RunPhase::Running(1),
                RunPhase::Cancelled(1),
                RunPhase::Completed,
            ]
        );
        assert!(matches!(
            state.error(),
            Some(CoreError::Client(ClientError::MalformedOutput(_)))
        ));
        assert_eq!(
            ui.errors(),
            vec![
                "malformed tool output: interrupted".to_owned(),
                "Build was cancelled.".to_owned()
            ]
        );
    }

    #[test]
    fn cancellation_before_start_runs_nothing() {
        let log = Log::default();
        let ui = Arc::new(MemoryUi::new());
        let mut state = state(&ui);
        state.cancel();
        let mut runner = Runner::new(vec![step("a", Behavior::Continue, &log)]);

        assert_eq!(runner.run(&mut state), RunOutcome::Cancelled);
        assert!(entries(&log).is_empty());
        assert_eq!(
            runner.history(),
            &[
                RunPhase::Pending(0),
                RunPhase::Cancelled(0),
                RunPhase::Completed
            ]
        );
    }

    #[test]
    fn cleanup_failure_does_not_mask_error_or_skip_earlier_steps() {
        let log = Log::default();
        let ui = Arc::new(MemoryUi::new());
        let mut state = state(&ui);
        let mut runner = Runner::new(vec![
            step("a", Behavior::Continue, &log),
            Box::new(Recording {
                name: "b",
                behavior: Behavior::Continue,
                fail_cleanup: true,
                log: Arc::clone(&log),
            }),
            step("c", Behavior::Fail, &log),
        ]);

        let outcome = runner.run(&mut state);

        assert_eq!(outcome, RunOutcome::Halted { step: "c" });
        assert_eq!(
            entries(&log),
            vec!["run a", "run b", "run c", "cleanup c", "cleanup b", "cleanup a"]
        );
        assert_eq!(state.error().unwrap().to_string(), "c exploded");
        let errors = ui.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].starts_with("cleanup of step 'b' failed"));
    }

    #[test]
    fn empty_runner_completes() {
        let ui = Arc::new(MemoryUi::new());
        let mut runner = Runner::new(Vec::new());
        assert_eq!(runner.run(&mut state(&ui)), RunOutcome::Succeeded);
        assert_eq!(runner.phase(), RunPhase::Completed);
    }

    #[test]
    fn valid_transitions() {
        assert!(RunPhase::Pending(0).can_transition_to(RunPhase::Running(0)));
        assert!(RunPhase::Pending(2).can_transition_to(RunPhase::Cancelled(2)));
        assert!(RunPhase::Running(0).can_transition_to(RunPhase::Pending(1)));
        assert!(RunPhase::Running(1).can_transition_to(RunPhase::Halted(1)));
        assert!(RunPhase::Running(1).can_transition_to(RunPhase::Cancelled(1)));
        assert!(RunPhase::Running(3).can_transition_to(RunPhase::Completed));
        assert!(RunPhase::Halted(1).can_transition_to(RunPhase::Completed));
        assert!(RunPhase::Cancelled(0).can_transition_to(RunPhase::Completed));
    }

    #[test]
    fn invalid_transitions() {
        assert!(!RunPhase::Pending(0).can_transition_to(RunPhase::Running(1)));
        assert!(!RunPhase::Running(0).can_transition_to(RunPhase::Pending(2)));
        assert!(!RunPhase::Halted(1).can_transition_to(RunPhase::Running(2)));
        assert!(!RunPhase::Completed.can_transition_to(RunPhase::Pending(0)));
        assert!(!RunPhase::Cancelled(0).can_transition_to(RunPhase::Running(0)));
    }
}
