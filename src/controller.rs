//! Graph execution controller: walks a [PipelineGraph] node by node, checkpointing after each.
//!
//! - [GraphController::run]: execute from the entry (or a given start node) to the terminal node.
//! - [GraphController::interrupt]: stop at the next node boundary.
//! - [GraphController::resume]: load the checkpoint a later run continues from.
//!
//! A node counts as completed only once its checkpoint is durable, so after an interruption
//! or failure the session's checkpoint always names the last node that fully finished.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, instrument, warn};

use crate::bridge::ResearchBridge;
use crate::checkpoint_store::CheckpointStore;
use crate::document::Document;
use crate::error::OrchestratorError;
use crate::graph::{NodeContext, PipelineGraph};
use crate::interrupt::InterruptHandle;
use crate::progress::ProgressBus;
use crate::types::{
  Checkpoint, ControllerState, ExecutionState, ProgressEvent, ProgressKind, RunError, Severity,
};

/// Options for [GraphController::run].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  /// First node to execute. Nodes before it are skipped and their results kept verbatim.
  pub start_node: Option<String>,
  pub document: Option<Arc<Document>>,
  /// Research providers nodes should query.
  pub providers: Vec<String>,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
  Completed(ExecutionState),
  Interrupted {
    state: ExecutionState,
    last_completed: Option<String>,
  },
}

impl RunOutcome {
  pub fn state(&self) -> &ExecutionState {
    match self {
      RunOutcome::Completed(state) | RunOutcome::Interrupted { state, .. } => state,
    }
  }

  pub fn into_state(self) -> ExecutionState {
    match self {
      RunOutcome::Completed(state) | RunOutcome::Interrupted { state, .. } => state,
    }
  }

  pub fn is_completed(&self) -> bool {
    matches!(self, RunOutcome::Completed(_))
  }
}

pub struct GraphController {
  graph: PipelineGraph,
  store: Arc<dyn CheckpointStore>,
  bus: ProgressBus,
  bridge: Option<Arc<ResearchBridge>>,
  interrupt: InterruptHandle,
  state: Mutex<ControllerState>,
  run_lock: tokio::sync::Mutex<()>,
}

impl GraphController {
  pub fn new(graph: PipelineGraph, store: Arc<dyn CheckpointStore>) -> Self {
    Self {
      graph,
      store,
      bus: ProgressBus::new(),
      bridge: None,
      interrupt: InterruptHandle::new(),
      state: Mutex::new(ControllerState::Idle),
      run_lock: tokio::sync::Mutex::new(()),
    }
  }

  /// Publishes onto `bus` instead of a private one.
  pub fn with_bus(mut self, bus: ProgressBus) -> Self {
    self.bus = bus;
    self
  }

  pub fn with_bridge(mut self, bridge: Arc<ResearchBridge>) -> Self {
    self.bridge = Some(bridge);
    self
  }

  pub fn graph(&self) -> &PipelineGraph {
    &self.graph
  }

  pub fn store(&self) -> &Arc<dyn CheckpointStore> {
    &self.store
  }

  pub fn bus(&self) -> &ProgressBus {
    &self.bus
  }

  pub fn bridge(&self) -> Option<&Arc<ResearchBridge>> {
    self.bridge.as_ref()
  }

  pub fn state(&self) -> ControllerState {
    self
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  fn set_state(&self, next: ControllerState) {
    *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
  }

  /// Requests a stop before the next node starts. The node in flight finishes and is
  /// checkpointed normally.
  #[instrument(level = "trace", skip(self))]
  pub fn interrupt(&self) {
    info!(state = %self.state(), "interrupt requested");
    self.interrupt.interrupt();
  }

  /// Handle that can interrupt this controller from another task (e.g. a signal handler).
  pub fn interrupt_handle(&self) -> InterruptHandle {
    self.interrupt.clone()
  }

  /// Loads the checkpoint for `session_id`.
  #[instrument(level = "trace", skip(self))]
  pub async fn resume(&self, session_id: &str) -> Result<Checkpoint, OrchestratorError> {
    self
      .store
      .load(session_id)
      .await
      .ok_or_else(|| OrchestratorError::NoCheckpointFound(session_id.to_string()))
  }

  fn publish(&self, session_id: &str, kind: ProgressKind, node: Option<&str>, message: String) {
    self
      .bus
      .publish(ProgressEvent::info(session_id, kind, node, message));
  }

  /// Executes the graph over `initial`. Fails fast with [OrchestratorError::RunInProgress]
  /// when another run holds this controller. An interrupt raised before this call is ignored.
  pub async fn run(
    &self,
    initial: ExecutionState,
    options: RunOptions,
  ) -> Result<RunOutcome, OrchestratorError> {
    self.run_with(initial, options, true).await
  }

  /// Clears an interrupt left from an earlier request, unless a run is active.
  pub(crate) fn begin_request(&self) {
    if self.run_lock.try_lock().is_ok() {
      self.interrupt.reset();
    }
  }

  /// Like [GraphController::run], but honours any interrupt raised since
  /// [GraphController::begin_request].
  pub(crate) async fn run_requested(
    &self,
    initial: ExecutionState,
    options: RunOptions,
  ) -> Result<RunOutcome, OrchestratorError> {
    self.run_with(initial, options, false).await
  }

  #[instrument(level = "trace", skip(self, initial, options), fields(session_id = %initial.session_id))]
  async fn run_with(
    &self,
    initial: ExecutionState,
    options: RunOptions,
    clear_interrupt: bool,
  ) -> Result<RunOutcome, OrchestratorError> {
    let _guard = self
      .run_lock
      .try_lock()
      .map_err(|_| OrchestratorError::RunInProgress)?;

    if initial.session_id.trim().is_empty() {
      return Err(OrchestratorError::MissingSessionKey);
    }
    let start = match options.start_node.as_deref() {
      Some(node) => self
        .graph
        .position(node)
        .ok_or_else(|| OrchestratorError::UnknownNode(node.to_string()))?,
      None => 0,
    };

    if clear_interrupt {
      self.interrupt.reset();
    }
    let session_id = initial.session_id.clone();
    let mut state = initial;
    let nodes = &self.graph.nodes()[start..];
    let mut last_completed = start
      .checked_sub(1)
      .map(|i| self.graph.nodes()[i].name().to_string());

    info!(
      session_id = %session_id,
      start = nodes.first().map(|n| n.name()).unwrap_or_default(),
      iteration = state.iteration,
      "run started"
    );
    self.publish(
      &session_id,
      ProgressKind::RunStarted,
      None,
      format!("running {} of {} nodes", nodes.len(), self.graph.len()),
    );

    for node in nodes {
      if self.interrupt.is_interrupted() {
        info!(session_id = %session_id, last_completed = ?last_completed, "run interrupted");
        self.set_state(ControllerState::Interrupted {
          last_completed: last_completed.clone(),
        });
        self.publish(
          &session_id,
          ProgressKind::RunInterrupted,
          last_completed.as_deref(),
          "run interrupted".to_string(),
        );
        return Ok(RunOutcome::Interrupted {
          state,
          last_completed,
        });
      }

      let name = node.name().to_string();
      self.set_state(ControllerState::Running { node: name.clone() });
      state.current_node = Some(name.clone());
      self.publish(
        &session_id,
        ProgressKind::NodeStarted,
        Some(&name),
        format!("{name} started"),
      );

      let ctx = NodeContext {
        session_id: &session_id,
        document: options.document.as_deref(),
        bridge: self.bridge.as_deref(),
        providers: &options.providers,
        progress: self.bus.emitter(&session_id, &name),
        interrupt: &self.interrupt,
      };
      let output = match node.invoke(&state, &ctx).await {
        Ok(output) => output,
        Err(failure) => {
          self.mark_failed(&session_id, &name, &failure.cause);
          return Err(OrchestratorError::NodeFailed {
            session_id: session_id.clone(),
            node: name,
            cause: failure.cause,
          });
        }
      };
      for warning in output.warnings {
        state.push_error(RunError::new(&name, warning));
      }
      state.record_result(&name, output.result);

      if let Err(e) = self.store.save(&session_id, &state, &name).await {
        self.mark_failed(&session_id, &name, &format!("checkpoint save failed: {e}"));
        return Err(e.into());
      }
      self.publish(
        &session_id,
        ProgressKind::NodeCompleted,
        Some(&name),
        format!("{name} completed"),
      );
      last_completed = Some(name);
    }

    info!(session_id = %session_id, nodes = ?state.completed_nodes(), "run completed");
    self.set_state(ControllerState::Completed);
    self.publish(
      &session_id,
      ProgressKind::RunCompleted,
      last_completed.as_deref(),
      "run completed".to_string(),
    );
    Ok(RunOutcome::Completed(state))
  }

  fn mark_failed(&self, session_id: &str, node: &str, cause: &str) {
    warn!(session_id = %session_id, node = %node, cause = %cause, "node failed");
    self.set_state(ControllerState::Failed {
      node: node.to_string(),
      error: cause.to_string(),
    });
    self.bus.publish(ProgressEvent::new(
      session_id,
      ProgressKind::NodeFailed,
      Some(node),
      cause,
      Severity::Error,
    ));
  }
}
