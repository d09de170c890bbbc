#![deny(missing_docs)]
//! Mediamark core: document tree, attribute micro-grammars, and parsing utilities.

/// Attribute-string tokenizing and parsing shared by every media syntax.
pub mod attrs;
/// Inline/leaf directive micro-parsing (`:name[label]{attrs}`).
pub mod directive;
/// Core error types.
pub mod error;
/// Code fence tracking for raw-text rewrites.
pub mod fence;
/// YAML frontmatter extraction helpers.
pub mod frontmatter;
/// Markdown/MDX parsing into the mediamark document tree.
pub mod parse;
/// Raw-text preprocessing applied before parsing.
pub mod preprocess;
/// The document tree and its traversal primitives.
pub mod tree;

pub use attrs::{AttrBlock, StyleValue, derive_alt_from_url, parse_loose_attrs, tokenize};
pub use directive::{ParsedDirective, parse_directive_at};
pub use error::{CoreError, SourceLocation};
pub use fence::FenceTracker;
pub use frontmatter::{
    FrontmatterError, FrontmatterExtraction, extract_frontmatter, image_field, set_image_field,
};
pub use parse::{ParseOptions, parse_document};
pub use preprocess::rewrite_image_shorthand;
pub use tree::{
    Directive, ImageNode, JsxAttribute, JsxNode, JsxValue, MediaKind, MediaMeta, Node, RenderHints,
    VisitAction, visit_mut,
};
