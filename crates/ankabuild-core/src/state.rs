use crate::cancel::CancelFlag;
use crate::ui::Ui;
use crate::CoreError;
use ankabuild_client::AnkaClient;
use ankabuild_schema::{BuildConfig, NameGenerator};
use std::sync::Arc;
use tracing::debug;

/// State shared by every step of one build run.
///
/// The runner owns it and lends it to one step at a time. Values written by a
/// step are written once and only read afterwards; the fixed step order is
/// what guarantees a value exists before it is read, so a missing value is a
/// wiring bug reported as [`CoreError::MissingState`].
pub struct RunState {
    config: Arc<BuildConfig>,
    client: Arc<dyn AnkaClient>,
    ui: Arc<dyn Ui>,
    names: NameGenerator,
    cancel: CancelFlag,
    vm_name: Option<String>,
    error: Option<CoreError>,
    stopped: bool,
}

impl RunState {
    pub fn new(config: Arc<BuildConfig>, client: Arc<dyn AnkaClient>, ui: Arc<dyn Ui>) -> Self {
        Self {
            config,
            client,
            ui,
            names: NameGenerator::from_time(),
            cancel: CancelFlag::new(),
            vm_name: None,
            error: None,
            stopped: false,
        }
    }

    #[must_use]
    pub fn with_names(mut self, names: NameGenerator) -> Self {
        self.names = names;
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> Arc<BuildConfig> {
        Arc::clone(&self.config)
    }

    pub fn client(&self) -> Arc<dyn AnkaClient> {
        Arc::clone(&self.client)
    }

    pub fn ui(&self) -> Arc<dyn Ui> {
        Arc::clone(&self.ui)
    }

    pub fn names(&mut self) -> &mut NameGenerator {
        &mut self.names
    }

    /// Name of the VM this run owns.
    pub fn vm_name(&self) -> Result<&str, CoreError> {
        self.vm_name
            .as_deref()
            .ok_or(CoreError::MissingState("vm_name"))
    }

    /// Record the VM this run owns. Setting the same name again is a no-op;
    /// a different name is refused.
    pub fn set_vm_name(&mut self, name: &str) -> Result<(), CoreError> {
        match &self.vm_name {
            Some(current) if current == name => Ok(()),
            Some(current) => Err(CoreError::StateConflict {
                key: "vm_name",
                current: current.clone(),
                attempted: name.to_owned(),
            }),
            None => {
                debug!("run state: vm_name = {name}");
                self.vm_name = Some(name.to_owned());
                Ok(())
            }
        }
    }

    /// Store the run's fatal error. The first one stored is kept.
    pub fn put_error(&mut self, error: CoreError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn error(&self) -> Option<&CoreError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<CoreError> {
        self.error.take()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// The VM was shut down on purpose and must not be suspended afterwards.
    pub fn mark_stopped(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
