//! Trailing-edge debouncer.
//!
//! Bursts of triggers collapse into one run of the action, fired once
//! `delay` passes without a new trigger.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Debouncer {
    tx: Option<mpsc::UnboundedSender<()>>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the debounce task. Must be called inside a tokio runtime.
    pub fn spawn<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Restart the quiet period on every trigger
                loop {
                    match tokio::time::timeout(delay, rx.recv()).await {
                        Ok(Some(())) => continue,
                        // Closed mid-burst: the pending run still happens
                        Ok(None) => {
                            action().await;
                            return;
                        }
                        Err(_) => break,
                    }
                }
                action().await;
            }
        });

        Self { tx: Some(tx), task }
    }

    pub fn trigger(&self) {
        let sent = self.tx.as_ref().is_some_and(|tx| tx.send(()).is_ok());
        if !sent {
            tracing::debug!("Debouncer already stopped");
        }
    }

    /// Stop accepting triggers and wait for any pending run to finish
    pub async fn finish(mut self) {
        self.tx.take();
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Debounce task ended abnormally");
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
