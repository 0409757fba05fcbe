//! catalog-hybrid
//!
//! Query-time ranking (semantic + lexical fusion), the filtered ranked
//! product listing built on top of it, and the indexing pipeline that keeps
//! the vector index fed.
pub mod engine;
pub mod filtered;
pub mod pipeline;

pub use engine::HybridSearchEngine;
pub use filtered::FilteredRankedSearch;
pub use pipeline::{progress_bar, IndexingPipeline, IndexingSummary};
