//! Drains asynchronous result streams into producer bindings.

use super::{BinderError, BinderResult, ProducerBinding};
use crate::message::domain::Message;
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::pin;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

struct Outbound {
    message: Message,
    target: ProducerBinding,
}

#[derive(Default)]
struct AdapterState {
    sender: Option<mpsc::UnboundedSender<Outbound>>,
    worker: Option<JoinHandle<()>>,
}

/// Forwards the items of result streams to producer bindings.
///
/// A single worker task performs every send, so upstream streams are never
/// blocked by the transport. Stream errors and send failures are logged and
/// the next item is processed.
#[derive(Default)]
pub struct ResultStreamAdapter {
    state: Mutex<AdapterState>,
}

impl ResultStreamAdapter {
    /// Creates a stopped adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the send worker. Starting a running adapter does nothing.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.sender.is_some() {
            return;
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        state.worker = Some(tokio::spawn(forward(receiver)));
        state.sender = Some(sender);
        debug!("result stream adapter started");
    }

    /// Stops the adapter after sending every item already queued.
    ///
    /// Streams still being adapted stop at their next item. Stopping a
    /// stopped adapter does nothing.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.sender = None;
        if let Some(worker) = state.worker.take() {
            if let Err(err) = worker.await {
                warn!(error = %err, "result stream worker ended abnormally");
            }
            debug!("result stream adapter stopped");
        }
    }

    /// Returns whether the adapter accepts streams.
    pub async fn is_running(&self) -> bool {
        self.state.lock().await.sender.is_some()
    }

    /// Drains `stream` into `target` on a background task.
    ///
    /// The returned handle completes when the stream ends or the adapter
    /// stops.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::AdapterStopped`] when the adapter is not
    /// running.
    pub async fn adapt<S, M, E>(
        &self,
        stream: S,
        target: ProducerBinding,
    ) -> BinderResult<JoinHandle<()>>
    where
        S: Stream<Item = Result<M, E>> + Send + 'static,
        M: Into<Message> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let queue = self
            .state
            .lock()
            .await
            .sender
            .as_ref()
            .map(mpsc::UnboundedSender::downgrade)
            .ok_or(BinderError::AdapterStopped)?;

        Ok(tokio::spawn(async move {
            let mut items = pin!(stream);
            while let Some(item) = items.next().await {
                let message = match item {
                    Ok(value) => value.into(),
                    Err(err) => {
                        error!(
                            destination = %target.binding().destination(),
                            error = %err,
                            "result stream produced an error; continuing"
                        );
                        continue;
                    }
                };
                let Some(sender) = queue.upgrade() else {
                    debug!("result stream adapter stopped; abandoning stream");
                    break;
                };
                let outbound = Outbound {
                    message,
                    target: target.clone(),
                };
                if sender.send(outbound).is_err() {
                    debug!("result stream worker gone; abandoning stream");
                    break;
                }
            }
        }))
    }
}

impl fmt::Debug for ResultStreamAdapter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResultStreamAdapter")
            .finish_non_exhaustive()
    }
}

async fn forward(mut receiver: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(Outbound { message, target }) = receiver.recv().await {
        if let Err(err) = target.send(message).await {
            error!(
                destination = %target.binding().destination(),
                error = %err,
                "failed to send result stream item"
            );
        }
    }
}
