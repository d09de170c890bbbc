#![deny(missing_docs)]
//! Mediamark pipeline: asset localization, media expansion, and orchestration.
//!
//! Two transform stages run in sequence over each document's tree during a
//! build: the [asset localizer](localize) copies every referenced local
//! media file into a content-addressed public location and rewrites the
//! reference, then the [media expander](expand) turns directive and legacy
//! image syntax into final-form nodes. [`pipeline::MediaPipeline`] wires
//! both stages together with the persisted usage ledger.

/// Pipeline configuration.
pub mod config;
/// Pipeline error types.
pub mod error;
/// Media expansion (directives and legacy image syntax to final nodes).
pub mod expand;
/// Persisted usage ledger and its storage backends.
pub mod ledger;
/// Asset localization (copy-on-miss, content-addressed rewriting).
pub mod localize;
/// Document and batch orchestration.
pub mod pipeline;
/// Content-addressed placement and path utilities.
pub mod placement;

pub use config::{DedupeMode, MediaConfig};
pub use error::PipelineError;
pub use expand::MediaExpander;
pub use ledger::{JsonFileStore, LedgerEntry, LedgerStore, MemoryStore, UsageLedger};
pub use localize::AssetLocalizer;
pub use pipeline::{BatchResult, BatchStats, Document, DocumentInput, MediaPipeline, PostIdFn};
