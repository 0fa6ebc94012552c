//! Backend readiness loop.
//!
//! Probes the backend until it answers, waiting a fixed delay between failed
//! attempts. There is no backoff and no attempt limit; the loop only ends on
//! success or cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ChatBackend;
use crate::widget::WidgetEvent;

pub struct ReadinessLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ReadinessLoop {
    /// Start probing. Every outcome is reported on `events`; the first
    /// success ends the loop.
    pub fn spawn<B: ChatBackend>(
        backend: Arc<B>,
        retry_delay: Duration,
        events: UnboundedSender<WidgetEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                debug!(attempt, "probing backend");

                let outcome = tokio::select! {
                    _ = token.cancelled() => break,
                    outcome = backend.probe() => outcome,
                };

                match outcome {
                    Ok(()) => {
                        info!(attempt, "backend ready");
                        let _ = events.send(WidgetEvent::BackendReady);
                        break;
                    }
                    Err(err) if !err.is_retryable() => {
                        warn!(error = %err, "backend probe cannot succeed, giving up");
                        let _ = events.send(WidgetEvent::BackendUnavailable);
                        break;
                    }
                    Err(err) => {
                        warn!(
                            attempt,
                            error = %err,
                            retry_in_ms = retry_delay.as_millis() as u64,
                            "backend not ready"
                        );
                        if events.send(WidgetEvent::BackendUnavailable).is_err() {
                            break;
                        }
                    }
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
            debug!("readiness loop finished");
        });

        Self { cancel, handle }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ReadinessLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
