//! Query side: scan session logs and render decoded records.

pub mod query_runner;
pub mod table_renderer;

pub use query_runner::{run_query, QuerySummary, RecordRenderer};
pub use table_renderer::AsciiTableRenderer;
