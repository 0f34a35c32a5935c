//! Data model shared by the controller, checkpoint store, progress bus and research bridge.
//!
//! Everything here is a plain value type; persistence and scheduling live in sibling modules.

mod checkpoint;
#[cfg(test)]
mod checkpoint_test;
mod controller_state;
#[cfg(test)]
mod controller_state_test;
mod execution_state;
#[cfg(test)]
mod execution_state_test;
mod progress_event;
mod research;
#[cfg(test)]
mod research_test;
mod session;

pub use checkpoint::{CHECKPOINT_VERSION, Checkpoint};
pub use controller_state::ControllerState;
pub use execution_state::{ExecutionState, NodeResult, RunError};
pub use progress_event::{ProgressEvent, ProgressKind, Severity};
pub use research::{ResearchHit, ResearchRequest, ResearchResult, normalize_query};
pub use session::{Session, SessionInfo};
