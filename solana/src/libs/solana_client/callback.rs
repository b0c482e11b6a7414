use std::sync::Arc;

use tokio::sync::Mutex;

use crate::libs::solana_client::dex::model::Event;

type BatchEventCallback = Box<dyn FnMut(Vec<Event>) -> anyhow::Result<()> + Send + 'static>;

/// Thread-safe wrapper for the batch event callback the stream driver
/// invokes.
#[derive(Clone)]
pub struct BatchEventCallbackWrapper {
    inner: Arc<Mutex<BatchEventCallback>>,
}

impl BatchEventCallbackWrapper {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(Vec<Event>) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(callback))),
        }
    }

    /// Invokes the callback with the given batch.
    pub async fn call(&self, events: Vec<Event>) -> anyhow::Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut guard = self.inner.lock().await;
        guard(events)
    }
}
