//! Caller-facing API: analyze a document, refine a prior analysis, inspect or clear sessions,
//! interrupt and observe runs.
//!
//! Sessions are keyed by document: the same document key always maps to the same session
//! (unless a fresh one is forced), so a second `analyze` or a `refine` finds the earlier
//! checkpoint.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, instrument, warn};

use crate::checkpoint_store::derive_session_id;
use crate::controller::{GraphController, RunOptions, RunOutcome};
use crate::document::{Document, DocumentLoader};
use crate::error::OrchestratorError;
use crate::interrupt::InterruptHandle;
use crate::types::{
  ControllerState, ExecutionState, ProgressEvent, ProgressKind, RunError, SessionInfo, Severity,
};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
  /// Mint a new session instead of reusing the document's. The old checkpoint is untouched.
  pub force_new_session: bool,
  pub providers: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RefineOptions {
  /// Node to re-run from. Defaults to the terminal node.
  pub start_from: Option<String>,
  pub providers: Vec<String>,
}

pub struct Orchestrator {
  controller: GraphController,
  loader: Arc<dyn DocumentLoader>,
}

impl Orchestrator {
  pub fn new(controller: GraphController, loader: Arc<dyn DocumentLoader>) -> Self {
    Self { controller, loader }
  }

  pub fn controller(&self) -> &GraphController {
    &self.controller
  }

  fn check_providers(&self, providers: &[String]) -> Result<(), OrchestratorError> {
    let bridge = self.controller.bridge();
    match providers
      .iter()
      .find(|p| !bridge.is_some_and(|b| b.has_provider(p)))
    {
      Some(unknown) => Err(OrchestratorError::UnknownProvider(unknown.clone())),
      None => Ok(()),
    }
  }

  /// Runs the pipeline over `document_key`.
  ///
  /// When the session's checkpoint stops short of the terminal node (an interrupted or failed
  /// run), execution continues after it. Otherwise the pipeline runs from the entry node on a
  /// fresh state in the same session. An interrupt raised once this call has begun stops the run
  /// before its first node.
  #[instrument(level = "trace", skip(self, options))]
  pub async fn analyze(
    &self,
    document_key: &str,
    options: AnalyzeOptions,
  ) -> Result<ExecutionState, OrchestratorError> {
    self.controller.begin_request();
    self.check_providers(&options.providers)?;
    let doc = Arc::new(self.loader.load(document_key).await?);
    let store = self.controller.store();
    let graph = self.controller.graph();
    let session = store
      .session_for(&doc.key, options.force_new_session)
      .await;

    let resumable = if session.has_checkpoint {
      store
        .load(&session.session_id)
        .await
        .filter(|cp| cp.position != graph.terminal())
        .and_then(|cp| {
          let next = graph.next_after(&cp.position)?.to_string();
          Some((cp.state, next))
        })
    } else {
      None
    };

    let (state, start_node) = match resumable {
      Some((mut state, next)) => {
        info!(session_id = %session.session_id, next = %next, "resuming unfinished analysis");
        self.note_fingerprint(&mut state, &doc, &next);
        (state, Some(next))
      }
      None => {
        let mut state = ExecutionState::new(&session.session_id, &doc.key);
        state.document_fingerprint = Some(doc.fingerprint.clone());
        (state, None)
      }
    };
    self.execute(state, start_node, doc, options.providers).await
  }

  /// Re-runs the pipeline from `start_from` on top of the session's last completed analysis.
  /// Results of earlier nodes are kept as they are; the iteration counter is incremented. A
  /// checkpoint left by an unfinished run does not count as a prior analysis.
  #[instrument(level = "trace", skip(self, options))]
  pub async fn refine(
    &self,
    document_key: &str,
    options: RefineOptions,
  ) -> Result<ExecutionState, OrchestratorError> {
    self.controller.begin_request();
    self.check_providers(&options.providers)?;
    let doc = Arc::new(self.loader.load(document_key).await?);
    let graph = self.controller.graph();
    let start = options
      .start_from
      .unwrap_or_else(|| graph.terminal().to_string());
    if !graph.contains(&start) {
      return Err(OrchestratorError::UnknownNode(start));
    }
    let session_id = derive_session_id(&doc.key);
    let checkpoint = self
      .controller
      .store()
      .load(&session_id)
      .await
      .ok_or_else(|| OrchestratorError::NoPriorAnalysis(doc.key.clone()))?;
    if checkpoint.position != graph.terminal() {
      warn!(
        session_id = %session_id,
        position = %checkpoint.position,
        "last analysis did not finish; run analyze to complete it before refining"
      );
      return Err(OrchestratorError::NoPriorAnalysis(doc.key.clone()));
    }

    let mut state = checkpoint.state;
    state.iteration += 1;
    self.note_fingerprint(&mut state, &doc, &start);
    info!(session_id = %session_id, start = %start, iteration = state.iteration, "refining");
    self
      .execute(state, Some(start), doc, options.providers)
      .await
  }

  /// Records a warning when the document changed since `state` was produced. The checkpoint
  /// is still used as-is.
  fn note_fingerprint(&self, state: &mut ExecutionState, doc: &Document, node: &str) {
    let changed = state
      .document_fingerprint
      .as_deref()
      .is_some_and(|fp| fp != doc.fingerprint);
    if changed {
      let message = "document changed since the checkpoint was taken; results of earlier nodes may be stale";
      warn!(session_id = %state.session_id, node, "{message}");
      state.push_error(RunError::new(node, message));
      self.controller.bus().publish(ProgressEvent::new(
        &state.session_id,
        ProgressKind::Message,
        Some(node),
        message,
        Severity::Warning,
      ));
    }
    state.document_fingerprint = Some(doc.fingerprint.clone());
  }

  async fn execute(
    &self,
    state: ExecutionState,
    start_node: Option<String>,
    document: Arc<Document>,
    providers: Vec<String>,
  ) -> Result<ExecutionState, OrchestratorError> {
    let options = RunOptions {
      start_node,
      document: Some(document),
      providers,
    };
    match self.controller.run_requested(state, options).await? {
      RunOutcome::Completed(state) => Ok(state),
      RunOutcome::Interrupted {
        state,
        last_completed,
      } => Err(OrchestratorError::Interrupted {
        session_id: state.session_id.clone(),
        last_completed,
        state: Box::new(state),
      }),
    }
  }

  /// Session for `document_key` and whether it can be refined.
  pub async fn get_session(&self, document_key: &str) -> Result<SessionInfo, OrchestratorError> {
    let key = self.loader.resolve_key(document_key).await?;
    Ok(self.controller.store().session_for(&key, false).await.info())
  }

  /// Deletes the document's checkpoint. Returns whether there was one.
  #[instrument(level = "trace", skip(self))]
  pub async fn clear_session(&self, document_key: &str) -> Result<bool, OrchestratorError> {
    let key = self.loader.resolve_key(document_key).await?;
    let session_id = derive_session_id(&key);
    let removed = self.controller.store().clear(&session_id).await?;
    info!(session_id = %session_id, removed, "session cleared");
    Ok(removed)
  }

  pub fn interrupt(&self) {
    self.controller.interrupt();
  }

  pub fn interrupt_handle(&self) -> InterruptHandle {
    self.controller.interrupt_handle()
  }

  pub fn state(&self) -> ControllerState {
    self.controller.state()
  }

  /// Calls `listener` for every progress event from now on. Requires a tokio runtime.
  pub fn subscribe<F>(&self, listener: F) -> JoinHandle<()>
  where
    F: FnMut(ProgressEvent) + Send + 'static,
  {
    self.controller.bus().subscribe(listener)
  }

  pub fn subscribe_stream(&self) -> UnboundedReceiverStream<ProgressEvent> {
    self.controller.bus().subscribe_stream()
  }
}
