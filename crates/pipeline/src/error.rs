use std::io;
use std::path::PathBuf;

use thiserror::Error;

use mediamark_core::CoreError;

/// Errors that abort a document's media processing.
///
/// Reference-level problems (missing file, unprobeable image bytes) never
/// surface here; they are absorbed at the reference and logged. What does
/// surface is what the author or environment must fix: a referenced asset
/// that cannot be materialized, or a ledger that cannot be persisted.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document failed to parse.
    #[error(transparent)]
    Parse(#[from] CoreError),
    /// Copying asset bytes into the public directory failed.
    #[error("failed to copy asset {src} to {dest}")]
    CopyAsset {
        /// Source file.
        src: PathBuf,
        /// Target public path.
        dest: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing the usage ledger failed.
    #[error("failed to write usage ledger {path}")]
    LedgerSave {
        /// Ledger file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Other I/O failure during document processing.
    #[error(transparent)]
    Io(#[from] io::Error),
}
