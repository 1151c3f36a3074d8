use std::sync::Arc;
use tokio::sync::watch;

pub const INITIAL_STATUS: &str = "Ready";

/// Single-slot status line. Every write replaces the previous value and
/// observers only ever see the most recent one.
#[derive(Clone, Debug)]
pub struct StatusChannel {
    slot: Arc<watch::Sender<String>>,
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusChannel {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(String::from(INITIAL_STATUS));
        Self {
            slot: Arc::new(slot),
        }
    }

    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        tracing::info!(%status, "status");
        self.slot.send_replace(status);
    }

    pub fn current(&self) -> String {
        self.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.slot.subscribe()
    }
}
