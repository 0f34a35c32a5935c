//! Durable mapping from session id to the latest checkpoint.
//!
//! - [CheckpointStore]: the port the controller and orchestrator talk to.
//! - [FileCheckpointStore]: one `checkpoint.json` per session directory under a state root.
//! - [MemoryCheckpointStore]: process-local store for tests and embedding.
//!
//! Session ids are derived deterministically from the document key (UUID v5), so the same
//! document maps to the same session across process restarts unless a fresh one is forced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::checkpoint_io::{self, CHECKPOINT_FILENAME};
use crate::error::StoreError;
use crate::types::{Checkpoint, ExecutionState, Session};

/// Namespace for document-key derived session ids.
const SESSION_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d52_a8e0_5c1d_7b9f_3e21);

/// Session id for `document_key`; stable across processes.
pub fn derive_session_id(document_key: &str) -> String {
  Uuid::new_v5(&SESSION_NAMESPACE, document_key.as_bytes()).to_string()
}

/// A fresh, random session id.
pub fn mint_session_id() -> String {
  Uuid::new_v4().to_string()
}

/// Session ids become directory names, so only `[A-Za-z0-9_-]` is accepted.
pub(crate) fn validate_session_id(session_id: &str) -> Result<(), StoreError> {
  let ok = !session_id.is_empty()
    && session_id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  if ok {
    Ok(())
  } else {
    Err(StoreError::InvalidSessionId(session_id.to_string()))
  }
}

fn snapshot(session_id: &str, state: &ExecutionState, position: &str) -> Checkpoint {
  Checkpoint {
    session_id: session_id.to_string(),
    ..Checkpoint::new(state.clone(), position)
  }
}

/// Persists and retrieves the current checkpoint of each session.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
  /// Overwrites the current checkpoint for `session_id`. Readers never observe a partial write.
  async fn save(
    &self,
    session_id: &str,
    state: &ExecutionState,
    position: &str,
  ) -> Result<Checkpoint, StoreError>;

  /// Current checkpoint, or `None` when absent or unreadable.
  async fn load(&self, session_id: &str) -> Option<Checkpoint>;

  /// Removes the session's checkpoint. Returns whether anything was removed.
  async fn clear(&self, session_id: &str) -> Result<bool, StoreError>;

  async fn exists(&self, session_id: &str) -> bool {
    self.load(session_id).await.is_some()
  }

  /// Resolves the session for a document. With `force_new` a fresh id is minted and any
  /// checkpoint under the derived id is left untouched.
  async fn session_for(&self, document_key: &str, force_new: bool) -> Session {
    let session_id = if force_new {
      mint_session_id()
    } else {
      derive_session_id(document_key)
    };
    let has_checkpoint = !force_new && self.exists(&session_id).await;
    Session {
      session_id,
      document_key: document_key.to_string(),
      has_checkpoint,
    }
  }
}

/// Per-session async locks making save/load of one id mutually exclusive. An entry lives only
/// while some caller holds or waits on it.
#[derive(Default)]
struct SessionLocks {
  locks: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
  async fn acquire(&self, session_id: &str) -> SessionGuard<'_> {
    let lock = {
      let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
      locks.entry(session_id.to_string()).or_default().clone()
    };
    SessionGuard {
      locks: self,
      session_id: session_id.to_string(),
      guard: lock.lock_owned().await,
    }
  }

  fn release(&self, session_id: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    // The map and the releasing guard account for two references; more means waiters.
    let idle = locks
      .get(session_id)
      .is_some_and(|l| Arc::ptr_eq(l, lock) && Arc::strong_count(lock) <= 2);
    if idle {
      locks.remove(session_id);
    }
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

struct SessionGuard<'a> {
  locks: &'a SessionLocks,
  session_id: String,
  guard: tokio::sync::OwnedMutexGuard<()>,
}

impl Drop for SessionGuard<'_> {
  fn drop(&mut self) {
    let lock = tokio::sync::OwnedMutexGuard::mutex(&self.guard);
    self.locks.release(&self.session_id, lock);
  }
}

/// File-backed store: `<root>/<session_id>/checkpoint.json`.
pub struct FileCheckpointStore {
  root: PathBuf,
  locks: SessionLocks,
}

impl FileCheckpointStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      locks: SessionLocks::default(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  #[cfg(test)]
  pub(crate) fn locked_sessions(&self) -> usize {
    self.locks.len()
  }

  /// Directory holding everything persisted for `session_id`.
  pub fn session_dir(&self, session_id: &str) -> PathBuf {
    self.root.join(session_id)
  }

  fn checkpoint_path(&self, session_id: &str) -> PathBuf {
    self.session_dir(session_id).join(CHECKPOINT_FILENAME)
  }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
  #[instrument(level = "trace", skip(self, state))]
  async fn save(
    &self,
    session_id: &str,
    state: &ExecutionState,
    position: &str,
  ) -> Result<Checkpoint, StoreError> {
    validate_session_id(session_id)?;
    let cp = snapshot(session_id, state, position);
    let _guard = self.locks.acquire(session_id).await;
    let path = self.checkpoint_path(session_id);
    let to_write = cp.clone();
    tokio::task::spawn_blocking(move || checkpoint_io::save_checkpoint(&path, &to_write))
      .await
      .map_err(std::io::Error::other)??;
    debug!(session_id, position, "checkpoint saved");
    Ok(cp)
  }

  #[instrument(level = "trace", skip(self))]
  async fn load(&self, session_id: &str) -> Option<Checkpoint> {
    if let Err(e) = validate_session_id(session_id) {
      warn!(error = %e, "refusing to load checkpoint");
      return None;
    }
    let _guard = self.locks.acquire(session_id).await;
    let path = self.checkpoint_path(session_id);
    match tokio::task::spawn_blocking(move || checkpoint_io::load_checkpoint(&path)).await {
      Ok(Ok(cp)) if cp.session_id == session_id => Some(cp),
      Ok(Ok(cp)) => {
        warn!(
          session_id,
          found = %cp.session_id,
          "checkpoint belongs to another session; ignoring"
        );
        None
      }
      Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
      Ok(Err(e)) => {
        warn!(session_id, error = %e, "checkpoint unreadable; treating as absent");
        None
      }
      Err(e) => {
        warn!(session_id, error = %e, "checkpoint load task failed");
        None
      }
    }
  }

  #[instrument(level = "trace", skip(self))]
  async fn clear(&self, session_id: &str) -> Result<bool, StoreError> {
    validate_session_id(session_id)?;
    let _guard = self.locks.acquire(session_id).await;
    match tokio::fs::remove_dir_all(self.session_dir(session_id)).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e.into()),
    }
  }
}

/// In-memory store. Each save swaps the whole checkpoint under a lock.
#[derive(Default)]
pub struct MemoryCheckpointStore {
  checkpoints: RwLock<HashMap<String, Checkpoint>>,
}

impl MemoryCheckpointStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self
      .checkpoints
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
  async fn save(
    &self,
    session_id: &str,
    state: &ExecutionState,
    position: &str,
  ) -> Result<Checkpoint, StoreError> {
    validate_session_id(session_id)?;
    let cp = snapshot(session_id, state, position);
    self
      .checkpoints
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(session_id.to_string(), cp.clone());
    Ok(cp)
  }

  async fn load(&self, session_id: &str) -> Option<Checkpoint> {
    self
      .checkpoints
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(session_id)
      .cloned()
  }

  async fn clear(&self, session_id: &str) -> Result<bool, StoreError> {
    Ok(
      self
        .checkpoints
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(session_id)
        .is_some(),
    )
  }
}
