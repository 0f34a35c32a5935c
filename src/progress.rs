//! Progress bus: ordered fan-out of [ProgressEvent]s to any number of listeners.
//!
//! Each subscriber owns an unbounded channel, so [ProgressBus::publish] never waits on a slow
//! listener. Events reach every subscriber in publish order; subscribers only see events
//! published after they subscribed. Closed subscribers are dropped on the next publish.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, instrument};

use crate::types::{ProgressEvent, ProgressKind, Severity};

#[derive(Clone, Default)]
pub struct ProgressBus {
  subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ProgressEvent>>>>,
}

impl ProgressBus {
  pub fn new() -> Self {
    Self::default()
  }

  /// Delivers `event` to every live subscriber without blocking.
  #[instrument(level = "trace", skip(self, event), fields(kind = ?event.kind))]
  pub fn publish(&self, event: ProgressEvent) {
    let mut subs = self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    subs.retain(|tx| tx.send(event.clone()).is_ok());
  }

  /// Stream of all events published from now on.
  pub fn subscribe_stream(&self) -> UnboundedReceiverStream<ProgressEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(tx);
    UnboundedReceiverStream::new(rx)
  }

  /// Registers a callback, driven on a spawned task. Must be called inside a tokio runtime.
  ///
  /// The returned handle completes once the bus (and every clone of it) has been dropped;
  /// aborting it unsubscribes.
  pub fn subscribe<F>(&self, mut listener: F) -> JoinHandle<()>
  where
    F: FnMut(ProgressEvent) + Send + 'static,
  {
    let mut stream = self.subscribe_stream();
    tokio::spawn(async move {
      while let Some(event) = stream.next().await {
        listener(event);
      }
      debug!("progress listener finished");
    })
  }

  pub fn subscriber_count(&self) -> usize {
    self
      .subscribers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// Emitter bound to one session and node, handed to nodes through their context.
  pub fn emitter(&self, session_id: &str, node: &str) -> NodeEmitter {
    NodeEmitter {
      bus: self.clone(),
      session_id: session_id.to_string(),
      node: node.to_string(),
    }
  }
}

/// Publishes [ProgressKind::Message] events on behalf of a running node.
#[derive(Clone)]
pub struct NodeEmitter {
  bus: ProgressBus,
  session_id: String,
  node: String,
}

impl NodeEmitter {
  pub fn emit(&self, severity: Severity, message: impl Into<String>) {
    self.bus.publish(ProgressEvent::new(
      self.session_id.clone(),
      ProgressKind::Message,
      Some(&self.node),
      message,
      severity,
    ));
  }

  pub fn info(&self, message: impl Into<String>) {
    self.emit(Severity::Info, message);
  }

  pub fn warn(&self, message: impl Into<String>) {
    self.emit(Severity::Warning, message);
  }
}
