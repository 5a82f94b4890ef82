//! The VM lifecycle steps a build is made of.

mod create_vm;
mod hyperthreading;
mod port_forwarding;
mod start_vm;
mod stop_vm;

pub use create_vm::CreateVm;
pub use hyperthreading::SetHyperThreading;
pub use port_forwarding::ForwardPorts;
pub use start_vm::StartVm;
pub use stop_vm::StopVm;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::RunState;
    use crate::ui::MemoryUi;
    use ankabuild_client::FakeClient;
    use ankabuild_schema::{BuildConfig, NameGenerator};
    use std::sync::Arc;

    pub struct Harness {
        pub client: Arc<FakeClient>,
        pub ui: Arc<MemoryUi>,
        pub state: RunState,
    }

    pub fn harness(config: BuildConfig) -> Harness {
        let client = Arc::new(FakeClient::new());
        let ui = Arc::new(MemoryUi::new());
        let state = RunState::new(
            Arc::new(config),
            Arc::clone(&client) as Arc<dyn ankabuild_client::AnkaClient>,
            Arc::clone(&ui) as Arc<dyn crate::ui::Ui>,
        )
        .with_names(NameGenerator::seeded(7));
        Harness { client, ui, state }
    }

    /// Harness whose run already owns the VM `foo`.
    pub fn harness_with_vm(config: BuildConfig) -> Harness {
        let mut h = harness(config);
        h.state.set_vm_name("foo").unwrap();
        h
    }
}
