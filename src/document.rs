//! Documents and the loader port through which the orchestrator reads them.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::error::OrchestratorError;

const CONTENT_NAMESPACE: Uuid = Uuid::from_u128(0x0b7e_44d1_5a2f_4c86_9e3a_d2f0_61c8_a9b4);

/// A loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
  /// Logical key the session is derived from.
  pub key: String,
  pub content: String,
  /// Stable fingerprint of `content`.
  pub fingerprint: String,
}

impl Document {
  pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
    let content = content.into();
    Self {
      key: key.into(),
      fingerprint: fingerprint(&content),
      content,
    }
  }
}

/// Content fingerprint (UUID v5 over the bytes; stable across processes).
pub fn fingerprint(content: &str) -> String {
  Uuid::new_v5(&CONTENT_NAMESPACE, content.as_bytes()).to_string()
}

/// Reads documents for the orchestrator.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
  /// Canonical key for `key` (e.g. an absolute path), without reading content.
  async fn resolve_key(&self, key: &str) -> Result<String, OrchestratorError>;

  async fn load(&self, key: &str) -> Result<Document, OrchestratorError>;
}

/// Loads documents from the filesystem; keys are canonicalized paths.
#[derive(Debug, Default, Clone)]
pub struct FsDocumentLoader;

fn map_io(path: &str, e: std::io::Error) -> OrchestratorError {
  if e.kind() == std::io::ErrorKind::NotFound {
    OrchestratorError::DocumentNotFound(path.to_string())
  } else {
    OrchestratorError::io(format!("reading {path}"), e)
  }
}

#[async_trait]
impl DocumentLoader for FsDocumentLoader {
  async fn resolve_key(&self, key: &str) -> Result<String, OrchestratorError> {
    let canonical = tokio::fs::canonicalize(Path::new(key))
      .await
      .map_err(|e| map_io(key, e))?;
    Ok(canonical.to_string_lossy().into_owned())
  }

  #[instrument(level = "trace", skip(self))]
  async fn load(&self, key: &str) -> Result<Document, OrchestratorError> {
    let resolved = self.resolve_key(key).await?;
    let content = tokio::fs::read_to_string(&resolved)
      .await
      .map_err(|e| map_io(key, e))?;
    Ok(Document::new(resolved, content))
  }
}

/// In-memory documents keyed verbatim. Useful for tests and for embedding callers that
/// already hold the text.
#[derive(Debug, Default, Clone)]
pub struct StaticDocumentLoader {
  documents: HashMap<String, String>,
}

impl StaticDocumentLoader {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_document(mut self, key: impl Into<String>, content: impl Into<String>) -> Self {
    self.documents.insert(key.into(), content.into());
    self
  }
}

#[async_trait]
impl DocumentLoader for StaticDocumentLoader {
  async fn resolve_key(&self, key: &str) -> Result<String, OrchestratorError> {
    if self.documents.contains_key(key) {
      Ok(key.to_string())
    } else {
      Err(OrchestratorError::DocumentNotFound(key.to_string()))
    }
  }

  async fn load(&self, key: &str) -> Result<Document, OrchestratorError> {
    self
      .documents
      .get(key)
      .map(|content| Document::new(key, content.clone()))
      .ok_or_else(|| OrchestratorError::DocumentNotFound(key.to_string()))
  }
}
