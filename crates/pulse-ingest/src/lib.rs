//! Ingestion and enrichment pipeline for LivePulse.
//!
//! Fetches raw items from configured sources (RSS/Atom feeds, HTML listing
//! pages, JSON APIs), normalizes them into canonical [`pulse_core::Article`]
//! records, deduplicates by content fingerprint, classifies topics, scores
//! sentiment, and hands enriched articles to a storage collaborator.
//!
//! The entry point is [`run_pipeline`]; everything else is the machinery
//! behind it, exported for tests and for the CLI's dry-run mode.

pub mod classify;
pub mod client;
pub mod dedup;
pub mod error;
pub mod normalize;
pub mod pipeline;
mod retry;
pub mod sentiment;
pub mod sources;
pub mod store;
pub mod types;

pub use client::FetchClient;
pub use dedup::{classify_candidate, RunFingerprintSet};
pub use error::{IngestError, RunError};
pub use normalize::{normalize, NormalizeLimits};
pub use pipeline::run_pipeline;
pub use sentiment::{score_and_label, score_text};
pub use sources::SourceAdapter;
pub use store::{ArticleStore, MemoryStore, StoreError, UpsertFailure};
pub use types::{FetchOutcome, RawItem};
