//! Asset localization.
//!
//! Finds every reference to a local media file across four surfaces — the
//! frontmatter `image` field, `img`/`video` directives, Markdown image
//! nodes, and JSX elements with a `src` attribute — copies each referenced
//! file into the content-addressed public tree, and rewrites the reference
//! to its public path while attaching media metadata to the node.
//!
//! Remote (`http(s)://`) and already-rooted (`/...`) references are excluded
//! by a cheap prefix test before any filesystem access. A reference whose
//! file does not exist is left untouched, silently.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use mediamark_core::frontmatter;
use mediamark_core::tree::{
    JsxAttribute, JsxNode, JsxValue, MediaKind, MediaMeta, Node, VisitAction, visit_mut,
};

use crate::config::MediaConfig;
use crate::error::PipelineError;
use crate::ledger::UsageLedger;
use crate::pipeline::Document;
use crate::placement;

/// One document's localization pass. Copies are deferred and executed as a
/// batch when [`run`](AssetLocalizer::run) finishes.
pub struct AssetLocalizer<'a> {
    cfg: &'a MediaConfig,
    ledger: &'a Mutex<UsageLedger>,
    post_id: String,
    doc_dir: PathBuf,
    now: DateTime<Utc>,
    copies: Vec<CopyJob>,
}

struct CopyJob {
    src: PathBuf,
    dest: PathBuf,
}

/// Outcome of localizing one reference.
struct Localized {
    public_rel: String,
    ext: String,
    kind: MediaKind,
    width: Option<u32>,
    height: Option<u32>,
}

impl Localized {
    fn meta(&self) -> MediaMeta {
        MediaMeta {
            kind: self.kind,
            ext: self.ext.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<'a> AssetLocalizer<'a> {
    /// Localizer for one document, resolving references against `doc_dir`.
    pub fn new(
        cfg: &'a MediaConfig,
        ledger: &'a Mutex<UsageLedger>,
        post_id: String,
        doc_dir: PathBuf,
    ) -> Self {
        Self {
            cfg,
            ledger,
            post_id,
            doc_dir,
            now: Utc::now(),
            copies: Vec::new(),
        }
    }

    /// Scan all four surfaces in fixed order, rewrite matched references,
    /// then execute the deferred copies.
    pub fn run(mut self, doc: &mut Document) -> Result<(), PipelineError> {
        // 1. Frontmatter image field.
        if let Some(raw) = frontmatter::image_field(&doc.frontmatter).map(str::to_string)
            && let Some(local) = self.rewrite_local(&raw)
        {
            frontmatter::set_image_field(&mut doc.frontmatter, local.public_rel);
        }

        // 2. img/video directives carrying a src attribute.
        visit_mut(&mut doc.tree, &mut |node| {
            if let Node::TextDirective(d) | Node::LeafDirective(d) = node
                && (d.name == "img" || d.name == "video")
                && let Some(src) = d.attribute("src").map(str::to_string)
                && let Some(local) = self.rewrite_local(&src)
            {
                d.set_attribute("src", local.public_rel.clone());
                d.media = Some(local.meta());
            }
            VisitAction::Continue
        });

        // 3. Markdown image nodes.
        visit_mut(&mut doc.tree, &mut |node| {
            if let Node::Image(img) = node {
                let raw = img.url.clone();
                if let Some(local) = self.rewrite_local(&raw) {
                    img.url = local.public_rel.clone();
                    img.media = Some(local.meta());
                }
            }
            VisitAction::Continue
        });

        // 4. JSX elements with a src attribute (flow or inline).
        visit_mut(&mut doc.tree, &mut |node| {
            if let Node::Jsx(jsx) = node {
                self.localize_jsx(jsx);
            }
            VisitAction::Continue
        });

        self.flush_copies()
    }

    fn localize_jsx(&mut self, jsx: &mut JsxNode) {
        let raw = match jsx.attribute("src").and_then(|a| a.value.as_ref()) {
            Some(JsxValue::Literal(s)) => s.clone(),
            Some(JsxValue::Expression(expr)) => match string_literal(expr) {
                Some(s) => s.to_string(),
                None => return,
            },
            None => return,
        };
        let Some(local) = self.rewrite_local(&raw) else {
            return;
        };

        if let Some(attr) = jsx.attribute_mut("src") {
            attr.value = Some(JsxValue::Literal(local.public_rel.clone()));
        }

        // Inject pixel dimensions when the probe succeeded and the author
        // supplied neither.
        if local.kind == MediaKind::Image
            && let (Some(width), Some(height)) = (local.width, local.height)
            && jsx.attribute("width").is_none()
            && jsx.attribute("height").is_none()
        {
            jsx.attributes.push(JsxAttribute {
                name: "width".to_string(),
                value: Some(JsxValue::Literal(width.to_string())),
            });
            jsx.attributes.push(JsxAttribute {
                name: "height".to_string(),
                value: Some(JsxValue::Literal(height.to_string())),
            });
        }

        jsx.media = Some(local.meta());
    }

    /// Resolve, hash, place, and record a single local reference.
    /// Returns `None` for references that are not local or not present.
    fn rewrite_local(&mut self, raw: &str) -> Option<Localized> {
        let rel = placement::extract_local_path(raw)?;
        let abs = self.doc_dir.join(&rel);
        if !abs.exists() {
            log::debug!("skipping missing local reference {}", abs.display());
            return None;
        }

        let ext = placement::file_ext(&rel)?;
        let hash = match placement::hash_file(&abs) {
            Ok(hash) => hash,
            Err(err) => {
                log::warn!("failed to read {} for hashing: {}", abs.display(), err);
                return None;
            }
        };

        let name = placement::hashed_name(&hash, &ext);
        let public_rel = placement::public_rel(self.cfg, &self.post_id, &name);
        let dest = placement::target_abs(self.cfg, &self.post_id, &name);

        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .touch(&hash, &ext, &public_rel, self.now);

        if !dest.exists() {
            self.copies.push(CopyJob {
                src: abs.clone(),
                dest,
            });
        }

        let (width, height) = if placement::is_image_ext(&ext) {
            match image::image_dimensions(&abs) {
                Ok((w, h)) => (Some(w), Some(h)),
                Err(err) => {
                    log::debug!("dimension probe failed for {}: {}", abs.display(), err);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Some(Localized {
            public_rel,
            kind: placement::kind_for_ext(&ext),
            ext,
            width,
            height,
        })
    }

    /// Execute the deferred copy batch. The existence check makes concurrent
    /// copies of identical content benign: same hash, same target, same bytes.
    fn flush_copies(self) -> Result<(), PipelineError> {
        for job in &self.copies {
            if let Some(parent) = job.dest.parent() {
                fs::create_dir_all(parent)?;
            }
            if job.dest.exists() {
                continue;
            }
            fs::copy(&job.src, &job.dest).map_err(|err| PipelineError::CopyAsset {
                src: job.src.clone(),
                dest: job.dest.clone(),
                source: err,
            })?;
            log::debug!(
                "copied {} -> {}",
                job.src.display(),
                job.dest.display()
            );
        }
        Ok(())
    }
}

/// Accept `'...'` / `"..."` expressions holding exactly one string literal.
fn string_literal(expr: &str) -> Option<&str> {
    let t = expr.trim();
    let mut chars = t.chars();
    let quote = match chars.next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return None,
    };
    let inner = t.get(1..t.len() - 1)?;
    (t.len() >= 2
        && t.ends_with(quote)
        && !inner.is_empty()
        && !inner.contains(['"', '\'']))
    .then_some(inner)
}
