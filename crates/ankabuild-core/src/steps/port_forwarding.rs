use crate::state::RunState;
use crate::step::{Step, StepAction};
use crate::CoreError;
use tracing::debug;

/// Adds each configured port-forwarding rule to the build VM.
#[derive(Debug, Default)]
pub struct ForwardPorts;

impl ForwardPorts {
    pub fn new() -> Self {
        Self
    }
}

impl Step for ForwardPorts {
    fn name(&self) -> &'static str {
        "forward_ports"
    }

    fn run(&mut self, state: &mut RunState) -> Result<StepAction, CoreError> {
        let config = state.config();
        if config.port_forwarding_rules.is_empty() {
            return Ok(StepAction::Continue);
        }

        let client = state.client();
        let vm_name = state.vm_name()?.to_owned();
        for rule in &config.port_forwarding_rules {
            let host = rule
                .host_port
                .map_or_else(|| "auto".to_owned(), |p| p.to_string());
            state.ui().say(&format!(
                "Forwarding guest port {} to host port {host} ({})",
                rule.guest_port, rule.name
            ));
            client.add_port_forwarding(&vm_name, rule)?;
            debug!("added port forwarding rule {} to {vm_name}", rule.name);
        }
        Ok(StepAction::Continue)
    }
}
