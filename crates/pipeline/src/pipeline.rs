//! Document and batch orchestration.
//!
//! Per document: preprocess (`.mdx` only) → parse → frontmatter extract →
//! localize → expand → ledger save. Documents are independent; the batch
//! API fans out with rayon while ledger access stays serialized behind one
//! mutex, the single-writer point the shared-resource policy requires.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;

use mediamark_core::error::CoreError;
use mediamark_core::frontmatter::extract_frontmatter;
use mediamark_core::parse::{ParseOptions, parse_document};
use mediamark_core::preprocess::rewrite_image_shorthand;
use mediamark_core::tree::Node;

use crate::config::MediaConfig;
use crate::error::PipelineError;
use crate::expand::MediaExpander;
use crate::ledger::{JsonFileStore, LedgerStore, UsageLedger};
use crate::localize::AssetLocalizer;
use crate::placement;

/// A document moving through the pipeline.
#[derive(Debug, Clone)]
pub struct Document {
    /// Originating file path.
    pub path: PathBuf,
    /// Frontmatter object; the `image` field is rewritten in place.
    pub frontmatter: serde_json::Value,
    /// Parsed and progressively rewritten tree.
    pub tree: Node,
}

/// Custom document-id derivation injected by the caller.
pub type PostIdFn = Arc<dyn Fn(&Path) -> String + Send + Sync>;

/// One file handed to the batch API.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Source file path.
    pub path: PathBuf,
    /// Raw source text.
    pub source: String,
}

/// Per-document outcome of a batch run.
#[derive(Debug)]
pub struct BatchResult {
    /// Source file path, matching the input.
    pub path: PathBuf,
    /// The processed document, or the error that aborted it.
    pub result: Result<Document, PipelineError>,
}

/// Batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    /// Documents processed.
    pub total: usize,
    /// Documents that completed.
    pub succeeded: usize,
    /// Documents that aborted with an error.
    pub failed: usize,
}

/// The two-stage media pipeline plus its shared usage ledger.
pub struct MediaPipeline {
    config: MediaConfig,
    store: Box<dyn LedgerStore>,
    ledger: Mutex<UsageLedger>,
    post_id: Option<PostIdFn>,
}

impl MediaPipeline {
    /// Build a pipeline, loading the ledger once. A missing or corrupt
    /// ledger starts empty; load never fails a build.
    pub fn new(config: MediaConfig, store: Box<dyn LedgerStore>) -> Self {
        let ledger = Mutex::new(store.load());
        Self {
            config,
            store,
            ledger,
            post_id: None,
        }
    }

    /// Pipeline with JSON file persistence at the configured ledger path.
    pub fn from_config(config: MediaConfig) -> Self {
        let store = JsonFileStore::new(&config.usage_log_path);
        Self::new(config, Box::new(store))
    }

    /// Override the default post-id derivation.
    pub fn with_post_id(mut self, derive: PostIdFn) -> Self {
        self.post_id = Some(derive);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Current ledger contents.
    pub fn ledger_snapshot(&self) -> UsageLedger {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Process one document from raw source: preprocess (`.mdx` only),
    /// parse, then run both transform stages and persist the ledger.
    pub fn process_source(
        &self,
        path: impl Into<PathBuf>,
        source: &str,
    ) -> Result<Document, PipelineError> {
        let path = path.into();
        let is_mdx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mdx"));

        let text = if is_mdx {
            rewrite_image_shorthand(source)
        } else {
            Cow::Borrowed(source)
        };
        let options = if is_mdx {
            ParseOptions::mdx()
        } else {
            ParseOptions::markdown()
        };

        let frontmatter = extract_frontmatter(source).map_err(CoreError::from)?;
        let tree = parse_document(&text, &options).map_err(PipelineError::Parse)?;

        let mut doc = Document {
            path,
            frontmatter: frontmatter.value,
            tree,
        };
        self.process_document(&mut doc)?;
        Ok(doc)
    }

    /// Run both transform stages over an already-parsed document, then
    /// rewrite the ledger in full.
    pub fn process_document(&self, doc: &mut Document) -> Result<(), PipelineError> {
        let post_id = self.post_id_for(&doc.path);
        let doc_dir = doc
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        AssetLocalizer::new(&self.config, &self.ledger, post_id, doc_dir).run(doc)?;
        MediaExpander::new(&self.config.video_attrs).run(&mut doc.tree);

        let snapshot = self.ledger_snapshot();
        self.store.save(&snapshot)
    }

    /// Process many documents in parallel. Each document succeeds or fails
    /// on its own; ledger writes stay serialized behind the pipeline mutex.
    pub fn process_batch(&self, inputs: Vec<DocumentInput>) -> (Vec<BatchResult>, BatchStats) {
        let results: Vec<BatchResult> = inputs
            .into_par_iter()
            .map(|input| {
                let result = self.process_source(input.path.clone(), &input.source);
                BatchResult {
                    path: input.path,
                    result,
                }
            })
            .collect();

        let total = results.len();
        let succeeded = results.iter().filter(|r| r.result.is_ok()).count();
        let stats = BatchStats {
            total,
            succeeded,
            failed: total - succeeded,
        };
        (results, stats)
    }

    fn post_id_for(&self, path: &Path) -> String {
        match &self.post_id {
            Some(derive) => derive(path),
            None => placement::derive_post_id(path, &self.config.content_root_marker),
        }
    }
}
