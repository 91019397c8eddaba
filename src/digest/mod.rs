// src/digest/mod.rs
//! Ranked email digest of unsent jobs

pub mod formatter;
pub mod sender;

pub use formatter::{DigestFormatter, MatchTier, RenderedDigest};
pub use sender::{DigestOutcome, DigestSender};
