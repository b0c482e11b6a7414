use std::sync::LazyLock;

use tokio::sync::{Mutex, watch};

use crate::model::bundle::BundleJob;

// Global channel carrying built bundles from the critical worker to
// the sender. Watch semantics: the sender only ever wants the latest
// job; a stale bundle is worthless once its blockhash ages out.
pub static BUNDLES_CHANNEL: LazyLock<BundleChannel> = LazyLock::new(|| {
    let (tx, rx) = watch::channel(BundleJob::default());
    BundleChannel {
        tx,
        rx: Mutex::new(rx),
    }
});

pub struct BundleChannel {
    pub tx: watch::Sender<BundleJob>,
    pub rx: Mutex<watch::Receiver<BundleJob>>,
}

impl BundleChannel {
    /// Restores the boot state. Tests share the process-wide channel
    /// and call this between cases.
    pub fn reset(&self) {
        let _ = self.tx.send(BundleJob::default());
    }
}
