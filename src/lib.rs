//! # analysis-orchestrator
//!
//! Resumable, interruptible execution of document-analysis pipelines, with research data
//! pulled from rate-limited external providers through a caching bridge.
//!
//! ## Architecture
//!
//! - [controller::GraphController] walks a [graph::PipelineGraph] node by node and writes a
//!   checkpoint ([checkpoint_store::CheckpointStore]) after every node, publishing progress on a
//!   [progress::ProgressBus]. Interruption is cooperative at node boundaries.
//! - [orchestrator::Orchestrator] maps documents to sessions and exposes analyze / refine /
//!   session management on top of the controller.
//! - [bridge::ResearchBridge] serves research requests from a TTL cache, or through a
//!   per-provider token bucket ([rate_limiter]) and bounded retry ([retry]) to a
//!   [provider::ResearchProvider].

pub mod bridge;
pub mod cache;
#[cfg(test)]
mod cache_test;
pub mod checkpoint_io;
#[cfg(test)]
mod checkpoint_io_test;
pub mod checkpoint_store;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod graph;
#[cfg(test)]
mod graph_test;
pub mod graphs;
pub mod interrupt;
pub mod nodes;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod rate_limiter;
pub mod results_io;
#[cfg(test)]
mod results_io_test;
pub mod retry;
pub mod types;

pub use bridge::{BridgeError, ProviderSettings, ResearchBridge};
pub use checkpoint_store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::{OrchestratorConfig, ProviderConfig};
pub use controller::{GraphController, RunOptions, RunOutcome};
pub use document::{Document, DocumentLoader, FsDocumentLoader, StaticDocumentLoader};
pub use error::{GraphError, OrchestratorError, StoreError};
pub use graph::{AnalysisNode, NodeContext, NodeFailure, NodeOutput, PipelineGraph};
pub use graphs::analysis_pipeline;
pub use interrupt::InterruptHandle;
pub use orchestrator::{AnalyzeOptions, Orchestrator, RefineOptions};
pub use progress::ProgressBus;
pub use types::{Checkpoint, ControllerState, ExecutionState, ProgressEvent, SessionInfo};
