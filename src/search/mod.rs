// src/search/mod.rs
//! Query generation, the agent handoff, and compilation of its results

pub mod extract;
pub mod handoff;
pub mod queries;

pub use extract::{compile_records, Extractor, HandoffRecord};
pub use handoff::{HandoffTicket, SearchHandoff};
pub use queries::{generate_queries, MAX_QUERIES};
