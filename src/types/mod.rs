pub mod job;
pub mod records;
pub mod response;

pub use job::{JobPosting, Listing, RawSearchResult, StoredJob};
pub use records::{EmailLogEntry, SearchRunEntry, StoreStats, UpsertOutcome};
