use crate::cancel::CancelFlag;
use crate::runner::{RunOutcome, Runner};
use crate::state::RunState;
use crate::step::Step;
use crate::steps::{CreateVm, ForwardPorts, SetHyperThreading, StartVm, StopVm};
use crate::ui::Ui;
use crate::CoreError;
use ankabuild_client::AnkaClient;
use ankabuild_schema::{BuildConfig, NameGenerator};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// What a successful build leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
    pub vm_name: String,
    pub created_at: String,
}

/// Runs the standard step sequence against one validated configuration.
pub struct Builder {
    config: Arc<BuildConfig>,
    client: Arc<dyn AnkaClient>,
    ui: Arc<dyn Ui>,
    names: Option<NameGenerator>,
    cancel: CancelFlag,
}

impl Builder {
    pub fn new(config: BuildConfig, client: Arc<dyn AnkaClient>, ui: Arc<dyn Ui>) -> Self {
        Self {
            config: Arc::new(config),
            client,
            ui,
            names: None,
            cancel: CancelFlag::new(),
        }
    }

    #[must_use]
    pub fn with_names(mut self, names: NameGenerator) -> Self {
        self.names = Some(names);
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// The step sequence, in execution order. The VM has to exist before it
    /// can be reconfigured and has to be configured before it boots.
    pub fn steps() -> Vec<Box<dyn Step>> {
        vec![
            Box::new(CreateVm::new()),
            Box::new(SetHyperThreading::new()),
            Box::new(ForwardPorts::new()),
            Box::new(StartVm::new()),
            Box::new(StopVm::new()),
        ]
    }

    pub fn run(self) -> Result<BuildArtifact, CoreError> {
        let mut state = RunState::new(self.config, self.client, self.ui)
            .with_cancel_flag(self.cancel);
        if let Some(names) = self.names {
            state = state.with_names(names);
        }

        let mut runner = Runner::new(Self::steps());
        match runner.run(&mut state) {
            RunOutcome::Succeeded => {
                let artifact = BuildArtifact {
                    vm_name: state.vm_name()?.to_owned(),
                    created_at: chrono::Utc::now().to_rfc3339(),
                };
                info!("build produced {}", artifact.vm_name);
                Ok(artifact)
            }
            RunOutcome::Cancelled => Err(CoreError::Cancelled),
            RunOutcome::Halted { step } => Err(state
                .take_error()
                .unwrap_or_else(|| CoreError::Halted(step.to_owned()))),
        }
    }
}
