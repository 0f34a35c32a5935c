//! Built-in analysis nodes.

mod fn_node;
#[cfg(test)]
mod fn_node_test;
pub(crate) mod ingest_node;
#[cfg(test)]
mod ingest_node_test;
mod report_node;
#[cfg(test)]
mod report_node_test;
mod research_node;

pub use fn_node::FnNode;
pub use ingest_node::IngestNode;
pub use report_node::ReportNode;
pub use research_node::ResearchNode;
