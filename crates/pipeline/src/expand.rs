//! Media expansion.
//!
//! Consumes the localized tree and produces final-form nodes. Two passes
//! run in order: directive expansion first (it can synthesize plain image
//! nodes), then the legacy paragraph walk that folds trailing `{...}`
//! blocks and MDX title-slot attributes into the image — so legacy
//! decoration still applies to images a directive produced.

use std::fmt::Write as _;

use mediamark_core::attrs::{self, AttrBlock, StyleValue};
use mediamark_core::tree::{
    Directive, ImageNode, MediaKind, Node, RenderHints, VisitAction, visit_mut,
};

use crate::placement;

/// Expands `img`/`video` directives and legacy image syntax.
pub struct MediaExpander {
    video_attrs: String,
}

impl MediaExpander {
    /// Expander with the given default `<video>` attribute string.
    pub fn new(video_attrs: impl Into<String>) -> Self {
        Self {
            video_attrs: video_attrs.into(),
        }
    }

    /// Run both expansion passes over the tree.
    pub fn run(&self, root: &mut Node) {
        self.expand_directives(root);
        self.expand_legacy(root);
    }

    fn expand_directives(&self, root: &mut Node) {
        visit_mut(root, &mut |node| {
            let directive = match node {
                Node::TextDirective(d) | Node::LeafDirective(d)
                    if d.name == "img" || d.name == "video" =>
                {
                    d
                }
                _ => return VisitAction::Continue,
            };

            let media = NormalizedMedia::from_directive(directive);
            if directive.name == "video" {
                VisitAction::Replace(Node::Html(self.video_html(&media)))
            } else {
                VisitAction::Replace(Node::Image(media.into_image(directive.media.take())))
            }
        });
    }

    fn expand_legacy(&self, root: &mut Node) {
        visit_mut(root, &mut |node| {
            if let Node::Paragraph(para) = node {
                self.expand_paragraph(&mut para.children);
            }
            VisitAction::Continue
        });
    }

    /// Walk a paragraph's children, decorating every image and replacing
    /// video-kind images with literal markup. Sibling removal is done by
    /// index so the walk never iterates a list it is mutating.
    fn expand_paragraph(&self, children: &mut Vec<Node>) {
        let mut i = 0;
        while i < children.len() {
            if !matches!(children[i], Node::Image(_)) {
                i += 1;
                continue;
            }

            let trailing = children.get(i + 1).and_then(|sibling| match sibling {
                Node::Text(text) => trailing_attr_block(text),
                _ => None,
            });
            if trailing.is_some() {
                children.remove(i + 1);
            }

            let Node::Image(img) = &mut children[i] else {
                unreachable!("matched image above");
            };

            let mut classes = std::mem::take(&mut img.hints.classes);
            let mut style = std::mem::take(&mut img.hints.style);
            let mut freeform = String::new();

            if let Some(title) = img.title.clone().filter(|t| !t.trim().is_empty())
                && let Some(block) = attrs::parse_title_attrs(&title)
            {
                if !block.is_empty() {
                    // The title carried attributes, not a tooltip.
                    img.title = None;
                }
                merge_block(&mut classes, &mut style, &mut freeform, block);
            }

            if let Some(block) = trailing {
                merge_block(&mut classes, &mut style, &mut freeform, block);
            }

            if img.alt.trim().is_empty() {
                img.alt = attrs::derive_alt_from_url(&img.url);
            }

            let classes = dedupe(classes);
            let is_video = matches!(&img.media, Some(m) if m.kind == MediaKind::Video)
                || has_video_ext(&img.url);

            if is_video {
                let chosen = if freeform.trim().is_empty() {
                    attrs::parse_loose_attrs(&self.video_attrs)
                } else {
                    attrs::parse_loose_attrs(&freeform)
                };
                let html = build_video_tag(&img.url, &classes.join(" "), &style, &chosen);
                children[i] = Node::Html(html);
                i += 1;
                continue;
            }

            img.hints.classes = classes;
            img.hints.style = style;

            if let Some(meta) = &img.media
                && let (Some(width), Some(height)) = (meta.width, meta.height)
                && img.hints.extra("width").is_none()
                && img.hints.extra("height").is_none()
            {
                img.hints.set_extra("width", width.to_string());
                img.hints.set_extra("height", height.to_string());
            }

            for (key, value) in attrs::parse_loose_attrs(&freeform) {
                img.hints.set_extra(&key, value.unwrap_or_default());
            }

            i += 1;
        }
    }

    fn video_html(&self, media: &NormalizedMedia) -> String {
        let chosen: Vec<(String, Option<String>)> = if media.extras.is_empty() {
            attrs::parse_loose_attrs(&self.video_attrs)
        } else {
            media
                .extras
                .iter()
                .map(|(key, value)| {
                    let value = (!value.is_empty()).then(|| value.clone());
                    (key.clone(), value)
                })
                .collect()
        };
        build_video_tag(&media.url, &media.classes.join(" "), &media.style, &chosen)
    }
}

/// Directive attributes normalized into one shape: `src` is the URL,
/// `class`/`className` merge into one class list, `style` flattens to a
/// declaration string, everything else is free-form.
struct NormalizedMedia {
    url: String,
    alt: Option<String>,
    classes: Vec<String>,
    style: String,
    extras: Vec<(String, String)>,
}

impl NormalizedMedia {
    fn from_directive(directive: &Directive) -> Self {
        let url = directive.attribute("src").unwrap_or_default().to_string();
        let alt = directive
            .label
            .clone()
            .filter(|label| !label.trim().is_empty())
            .or_else(|| directive.attribute("alt").map(str::to_string));

        let mut classes = Vec::new();
        let mut style = String::new();
        let mut extras = Vec::new();
        for (key, value) in &directive.attributes {
            match key.as_str() {
                "src" | "alt" => {}
                "class" | "className" => {
                    classes.extend(value.split_whitespace().map(str::to_string));
                }
                "style" => attrs::append_style(&mut style, &StyleValue::parse(value).flatten()),
                _ => extras.push((key.clone(), value.clone())),
            }
        }

        Self {
            url,
            alt,
            classes,
            style,
            extras,
        }
    }

    fn into_image(self, media: Option<mediamark_core::tree::MediaMeta>) -> ImageNode {
        let alt = match self.alt {
            Some(alt) if !alt.trim().is_empty() => alt,
            _ => attrs::derive_alt_from_url(&self.url),
        };
        ImageNode {
            url: self.url,
            title: None,
            alt,
            media,
            hints: RenderHints {
                classes: dedupe(self.classes),
                style: self.style,
                extra: self.extras,
            },
        }
    }
}

/// Emit the literal `<video>` markup. Boolean attributes render bare;
/// valued attributes render double-quoted with their values escaped.
fn build_video_tag(
    src: &str,
    class_str: &str,
    style: &str,
    attrs: &[(String, Option<String>)],
) -> String {
    let mut open = String::from("<video");
    if !class_str.is_empty() {
        write!(open, " class=\"{}\"", escape_attr(class_str)).ok();
    }
    if !style.is_empty() {
        write!(open, " style=\"{}\"", escape_attr(style)).ok();
    }
    for (key, value) in attrs {
        match value {
            None => {
                write!(open, " {}", key).ok();
            }
            Some(value) => {
                write!(open, " {}=\"{}\"", key, escape_attr(value)).ok();
            }
        }
    }
    open.push('>');

    format!(
        "{}\n  <source src=\"{}\" type=\"{}\">\n  Your browser does not support the video tag.\n</video>",
        open,
        escape_attr(src),
        mime_for(src)
    )
}

fn escape_attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

/// MIME type by extension; anything unrecognized falls back to mp4.
fn mime_for(src: &str) -> &'static str {
    let lower = src.to_ascii_lowercase();
    if lower.ends_with(".webm") {
        "video/webm"
    } else if lower.ends_with(".ogg") {
        "video/ogg"
    } else {
        "video/mp4"
    }
}

fn has_video_ext(url: &str) -> bool {
    placement::file_ext(url).is_some_and(|ext| placement::is_video_ext(&ext))
}

/// `{...}` or `\{...}` occupying the whole text run.
fn trailing_attr_block(text: &str) -> Option<AttrBlock> {
    let t = text.trim();
    let t = t.strip_prefix('\\').unwrap_or(t);
    let inner = t.strip_prefix('{')?.strip_suffix('}')?;
    if inner.contains('}') {
        return None;
    }
    Some(AttrBlock::parse(t))
}

/// Classes append across dialects; a later `attrs=` replaces an earlier one.
fn merge_block(
    classes: &mut Vec<String>,
    style: &mut String,
    freeform: &mut String,
    block: AttrBlock,
) {
    classes.extend(block.classes);
    attrs::append_style(style, &block.style);
    if !block.freeform.is_empty() {
        *freeform = block.freeform;
    }
}

/// Drop duplicate classes, preserving first occurrence.
fn dedupe(classes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(classes.len());
    for class in classes {
        if !class.is_empty() && !out.contains(&class) {
            out.push(class);
        }
    }
    out
}
