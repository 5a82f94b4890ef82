use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Cooperative cancellation marker shared between the signal handler and a run.
///
/// The runner checks it between steps; a step already talking to `anka`
/// finishes before cancellation takes effect.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Route Ctrl-C into `flag`. A second interrupt exits immediately.
pub fn install_signal_handler(flag: CancelFlag) {
    let result = ctrlc::set_handler(move || {
        if flag.is_cancelled() {
            std::process::exit(1);
        }
        flag.cancel();
        eprintln!("\ninterrupt received, cancelling build after the current step...");
    });
    if let Err(e) = result {
        warn!("failed to install interrupt handler: {e}");
    }
}
