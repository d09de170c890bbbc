//! The document tree and its traversal primitives.
//!
//! The tree keeps first-class variants only for the constructs the media
//! transforms read or rewrite; everything else is carried through as a
//! generic [`OtherNode`] so images nested in blockquotes, lists, and tables
//! are still reachable.

use markdown::mdast;

use crate::directive::{
    ParsedDirective, directive_head_suffix, find_directive, parse_attribute_map,
};

/// Media kind resolved from an extension or directive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
}

/// Metadata attached to a node by the asset localizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMeta {
    /// Resolved media kind.
    pub kind: MediaKind,
    /// Lowercased original extension, including the dot.
    pub ext: String,
    /// Pixel width, when the probe succeeded.
    pub width: Option<u32>,
    /// Pixel height, when the probe succeeded.
    pub height: Option<u32>,
}

/// Merged presentational metadata carried on an image node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderHints {
    /// Class names, in encounter order, deduplicated.
    pub classes: Vec<String>,
    /// Semicolon-joined style string.
    pub style: String,
    /// Free-form attributes; boolean attributes carry an empty value.
    pub extra: Vec<(String, String)>,
}

impl RenderHints {
    /// True when no hints have been collected.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.style.is_empty() && self.extra.is_empty()
    }

    /// Insert or overwrite a free-form attribute.
    pub fn set_extra(&mut self, name: &str, value: impl Into<String>) {
        match self.extra.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.into(),
            None => self.extra.push((name.to_string(), value.into())),
        }
    }

    /// Look up a free-form attribute.
    pub fn extra(&self, name: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A parent node holding only children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parent {
    /// Ordered child list.
    pub children: Vec<Node>,
}

/// A Markdown image node.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    /// Reference URL (rewritten to the public path by the localizer).
    pub url: String,
    /// Optional title; legacy syntax smuggles attributes through it.
    pub title: Option<String>,
    /// Alternative text. The expander guarantees this is never empty.
    pub alt: String,
    /// Localizer-attached media metadata.
    pub media: Option<MediaMeta>,
    /// Merged presentational hints.
    pub hints: RenderHints,
}

/// A `:name[label]{attrs}` (text) or `::name[label]{attrs}` (leaf) directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Directive name.
    pub name: String,
    /// Bracket label.
    pub label: Option<String>,
    /// Attribute map in encounter order; booleans carry `""`.
    pub attributes: Vec<(String, String)>,
    /// Localizer-attached media metadata.
    pub media: Option<MediaMeta>,
}

impl Directive {
    /// First value of the named attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite (or insert) the named attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.into(),
            None => self.attributes.push((name.to_string(), value.into())),
        }
    }
}

impl From<ParsedDirective> for Directive {
    fn from(parsed: ParsedDirective) -> Self {
        Self {
            name: parsed.name,
            label: parsed.label,
            attributes: parsed.attributes,
            media: None,
        }
    }
}

/// Value of a JSX attribute: a string literal or a raw expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsxValue {
    /// Literal string value (`src="a.png"`).
    Literal(String),
    /// Raw JS expression text (`src={"a.png"}`).
    Expression(String),
}

/// A single JSX attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value; `None` for shorthand booleans.
    pub value: Option<JsxValue>,
}

/// A JSX element (MDX flow or text form).
#[derive(Debug, Clone, PartialEq)]
pub struct JsxNode {
    /// Element name; `None` for fragments.
    pub name: Option<String>,
    /// Ordered attribute list.
    pub attributes: Vec<JsxAttribute>,
    /// Child nodes.
    pub children: Vec<Node>,
    /// True for the flow (block) form.
    pub flow: bool,
    /// Localizer-attached media metadata.
    pub media: Option<MediaMeta>,
}

impl JsxNode {
    /// Find an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&JsxAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Find an attribute by name, mutably.
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut JsxAttribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }
}

/// A construct the media transforms pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherNode {
    /// mdast-style kind name (`"blockquote"`, `"list"`, ...).
    pub kind: &'static str,
    /// Literal value for leaf constructs (code, math, expressions).
    pub value: Option<String>,
    /// Lifted children for parent constructs.
    pub children: Vec<Node>,
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Document root.
    Root(Parent),
    /// Paragraph.
    Paragraph(Parent),
    /// Raw text run.
    Text(String),
    /// Literal markup; the terminal replacement form for expanded video.
    Html(String),
    /// Markdown image.
    Image(ImageNode),
    /// Inline directive.
    TextDirective(Directive),
    /// Leaf (block) directive.
    LeafDirective(Directive),
    /// JSX element.
    Jsx(JsxNode),
    /// Any other construct, carried through.
    Other(OtherNode),
}

impl Node {
    /// Child list, when this node has one.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Root(p) | Node::Paragraph(p) => Some(&p.children),
            Node::Jsx(jsx) => Some(&jsx.children),
            Node::Other(other) => Some(&other.children),
            _ => None,
        }
    }

    /// Mutable child list, when this node has one.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root(p) | Node::Paragraph(p) => Some(&mut p.children),
            Node::Jsx(jsx) => Some(&mut jsx.children),
            Node::Other(other) => Some(&mut other.children),
            _ => None,
        }
    }

    /// Convert a parsed mdast tree into the mediamark tree.
    pub fn from_mdast(node: mdast::Node) -> Node {
        match node {
            mdast::Node::Root(root) => Node::Root(Parent {
                children: lift_children(root.children),
            }),
            other => {
                let mut lifted = Vec::with_capacity(1);
                lift_into(other, &mut lifted);
                match lifted.len() {
                    1 => lifted.remove(0),
                    _ => Node::Root(Parent { children: lifted }),
                }
            }
        }
    }
}

/// Signal returned by a [`visit_mut`] callback for each node.
#[derive(Debug)]
pub enum VisitAction {
    /// Keep the node and descend into its children.
    Continue,
    /// Keep the node but do not descend.
    Skip,
    /// Replace the node in its parent; the replacement is not revisited.
    Replace(Node),
}

/// Depth-first traversal over `node`'s descendants. The callback runs for
/// every child before its own children; replacements are spliced in place
/// and never revisited, so a visitor can safely rewrite nodes mid-walk.
pub fn visit_mut<F>(node: &mut Node, f: &mut F)
where
    F: FnMut(&mut Node) -> VisitAction,
{
    let Some(children) = node.children_mut() else {
        return;
    };
    let mut i = 0;
    while i < children.len() {
        match f(&mut children[i]) {
            VisitAction::Continue => visit_mut(&mut children[i], f),
            VisitAction::Skip => {}
            VisitAction::Replace(replacement) => children[i] = replacement,
        }
        i += 1;
    }
}

fn lift_children(children: Vec<mdast::Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    let mut iter = children.into_iter().peekable();
    while let Some(child) = iter.next() {
        match child {
            // In MDX sources the `{attrs}` of `:name[label]{attrs}` parses
            // as an expression node; stitch it back onto the preceding
            // directive head.
            mdast::Node::Text(text) => {
                if matches!(iter.peek(), Some(mdast::Node::MdxTextExpression(_)))
                    && let Some(head) = directive_head_suffix(&text.value)
                {
                    let Some(mdast::Node::MdxTextExpression(expr)) = iter.next() else {
                        unreachable!("peeked expression vanished");
                    };
                    if head.start > 0 {
                        lift_text(text.value[..head.start].to_string(), &mut out);
                    }
                    let directive = Directive {
                        name: head.name,
                        label: head.label,
                        attributes: parse_attribute_map(&expr.value),
                        media: None,
                    };
                    out.push(if head.leaf {
                        Node::LeafDirective(directive)
                    } else {
                        Node::TextDirective(directive)
                    });
                } else {
                    lift_text(text.value, &mut out);
                }
            }
            other => lift_into(other, &mut out),
        }
    }
    out
}

fn lift_into(node: mdast::Node, out: &mut Vec<Node>) {
    match node {
        mdast::Node::Paragraph(para) => out.push(lift_paragraph(para)),
        mdast::Node::Text(text) => lift_text(text.value, out),
        mdast::Node::Image(image) => out.push(Node::Image(ImageNode {
            url: image.url,
            title: image.title,
            alt: image.alt,
            media: None,
            hints: RenderHints::default(),
        })),
        mdast::Node::Html(html) => out.push(Node::Html(html.value)),
        mdast::Node::MdxJsxFlowElement(elem) => {
            out.push(lift_jsx(elem.name, elem.attributes, elem.children, true));
        }
        mdast::Node::MdxJsxTextElement(elem) => {
            out.push(lift_jsx(elem.name, elem.attributes, elem.children, false));
        }
        // Frontmatter is extracted from the raw source, not the tree.
        mdast::Node::Yaml(_) | mdast::Node::Toml(_) => {}
        mdast::Node::Root(root) => out.push(Node::Root(Parent {
            children: lift_children(root.children),
        })),
        other => out.push(lift_other(other)),
    }
}

/// A paragraph whose entire content is one leaf directive dissolves into
/// that directive, matching the block-level directive convention.
fn lift_paragraph(para: mdast::Paragraph) -> Node {
    let mut children = lift_children(para.children);
    if children.len() == 1 && matches!(children[0], Node::LeafDirective(_)) {
        return children.remove(0);
    }
    Node::Paragraph(Parent { children })
}

/// Split a text run into plain text and directive nodes.
fn lift_text(value: String, out: &mut Vec<Node>) {
    let mut cursor = 0;
    while let Some((at, parsed)) = find_directive(&value, cursor) {
        if at > cursor {
            out.push(Node::Text(value[cursor..at].to_string()));
        }
        cursor = at + parsed.len;
        let leaf = parsed.leaf;
        let directive = parsed.into();
        out.push(if leaf {
            Node::LeafDirective(directive)
        } else {
            Node::TextDirective(directive)
        });
    }
    if cursor < value.len() {
        out.push(Node::Text(value[cursor..].to_string()));
    }
}

fn lift_jsx(
    name: Option<String>,
    attributes: Vec<mdast::AttributeContent>,
    children: Vec<mdast::Node>,
    flow: bool,
) -> Node {
    let attributes = attributes
        .into_iter()
        .filter_map(|attr| match attr {
            mdast::AttributeContent::Property(prop) => Some(JsxAttribute {
                name: prop.name,
                value: prop.value.map(|v| match v {
                    mdast::AttributeValue::Literal(s) => JsxValue::Literal(s),
                    mdast::AttributeValue::Expression(expr) => JsxValue::Expression(expr.value),
                }),
            }),
            // Spread attributes carry no media references.
            mdast::AttributeContent::Expression(_) => None,
        })
        .collect();
    Node::Jsx(JsxNode {
        name,
        attributes,
        children: lift_children(children),
        flow,
        media: None,
    })
}

fn lift_other(node: mdast::Node) -> Node {
    let (kind, value, children) = match node {
        mdast::Node::Blockquote(n) => ("blockquote", None, n.children),
        mdast::Node::List(n) => ("list", None, n.children),
        mdast::Node::ListItem(n) => ("listItem", None, n.children),
        mdast::Node::Heading(n) => ("heading", None, n.children),
        mdast::Node::Strong(n) => ("strong", None, n.children),
        mdast::Node::Emphasis(n) => ("emphasis", None, n.children),
        mdast::Node::Delete(n) => ("delete", None, n.children),
        mdast::Node::Link(n) => ("link", None, n.children),
        mdast::Node::LinkReference(n) => ("linkReference", None, n.children),
        mdast::Node::Table(n) => ("table", None, n.children),
        mdast::Node::TableRow(n) => ("tableRow", None, n.children),
        mdast::Node::TableCell(n) => ("tableCell", None, n.children),
        mdast::Node::FootnoteDefinition(n) => ("footnoteDefinition", None, n.children),
        mdast::Node::Code(n) => ("code", Some(n.value), Vec::new()),
        mdast::Node::InlineCode(n) => ("inlineCode", Some(n.value), Vec::new()),
        mdast::Node::Math(n) => ("math", Some(n.value), Vec::new()),
        mdast::Node::InlineMath(n) => ("inlineMath", Some(n.value), Vec::new()),
        mdast::Node::MdxFlowExpression(n) => ("mdxFlowExpression", Some(n.value), Vec::new()),
        mdast::Node::MdxTextExpression(n) => ("mdxTextExpression", Some(n.value), Vec::new()),
        mdast::Node::MdxjsEsm(n) => ("mdxjsEsm", Some(n.value), Vec::new()),
        mdast::Node::ThematicBreak(_) => ("thematicBreak", None, Vec::new()),
        mdast::Node::Break(_) => ("break", None, Vec::new()),
        mdast::Node::ImageReference(_) => ("imageReference", None, Vec::new()),
        mdast::Node::FootnoteReference(_) => ("footnoteReference", None, Vec::new()),
        mdast::Node::Definition(_) => ("definition", None, Vec::new()),
        _ => ("node", None, Vec::new()),
    };
    Node::Other(OtherNode {
        kind,
        value,
        children: lift_children(children),
    })
}
