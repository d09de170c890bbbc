//! Inline/leaf directive micro-parsing.
//!
//! markdown-rs has no directive construct, so `:name[label]{attrs}` and
//! `::name[label]{attrs}` runs arrive as plain text. This parser recognizes
//! them character by character during tree conversion. A bare `:name` with
//! neither label nor attributes is never treated as a directive; prose is
//! full of colons.

use crate::attrs::{tokenize, unquote};

/// A directive recognized inside raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    /// Directive name (`img`, `video`, ...).
    pub name: String,
    /// Bracket label, when present.
    pub label: Option<String>,
    /// Attribute map in encounter order. Boolean attributes carry `""`;
    /// `.x` / `#x` shorthands become `class` / `id` entries.
    pub attributes: Vec<(String, String)>,
    /// True for the `::name` (leaf) form.
    pub leaf: bool,
    /// Bytes consumed from the input, including the leading colons.
    pub len: usize,
}

/// Try to parse a directive starting exactly at byte offset `start`.
pub fn parse_directive_at(text: &str, start: usize) -> Option<ParsedDirective> {
    let s = &text[start..];

    let colons = s.chars().take_while(|&c| c == ':').count();
    if colons == 0 || colons > 2 {
        // Three or more is container syntax, which this pipeline never emits.
        return None;
    }
    let leaf = colons == 2;
    let mut pos = colons;

    let name_len = name_length(&s[pos..])?;
    let name = s[pos..pos + name_len].to_string();
    pos += name_len;

    let mut label = None;
    if s[pos..].starts_with('[') {
        let end = s[pos + 1..].find(']')?;
        label = Some(s[pos + 1..pos + 1 + end].to_string());
        pos += end + 2;
    }

    let mut attributes = Vec::new();
    let mut has_attrs = false;
    if s[pos..].starts_with('{') {
        let end = s[pos + 1..].find('}')?;
        attributes = parse_attribute_map(&s[pos + 1..pos + 1 + end]);
        has_attrs = true;
        pos += end + 2;
    }

    if label.is_none() && !has_attrs {
        return None;
    }

    Some(ParsedDirective {
        name,
        label,
        attributes,
        leaf,
        len: pos,
    })
}

/// Scan forward from byte offset `from` for the next directive whose leading
/// colon sits at a plausible boundary (start of text, after whitespace, or
/// after an opening parenthesis). Returns the offset and the parse.
pub fn find_directive(text: &str, from: usize) -> Option<(usize, ParsedDirective)> {
    let mut prev: Option<char> = if from == 0 {
        None
    } else {
        text[..from].chars().next_back()
    };

    for (i, c) in text[from..].char_indices() {
        let at = from + i;
        if c == ':'
            && prev.is_none_or(|p| p.is_whitespace() || p == '(')
            && let Some(parsed) = parse_directive_at(text, at)
        {
            return Some((at, parsed));
        }
        prev = Some(c);
    }
    None
}

/// A directive head (`:name[label]`) found at the end of a text run, with
/// its attribute block carried by a following MDX expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DirectiveHead {
    /// Byte offset where the head's colons begin.
    pub start: usize,
    /// Directive name.
    pub name: String,
    /// Bracket label, when present.
    pub label: Option<String>,
    /// True for the `::name` form.
    pub leaf: bool,
}

/// In MDX sources the brace block of `:name[label]{attrs}` parses as an
/// expression node, leaving only `:name[label]` at the end of the preceding
/// text. Recognize that suffix so tree conversion can stitch the two halves
/// back together.
pub(crate) fn directive_head_suffix(text: &str) -> Option<DirectiveHead> {
    let bytes = text.as_bytes();
    let mut colon = text.rfind(':')?;
    let mut leaf = false;
    if colon > 0 && bytes[colon - 1] == b':' {
        colon -= 1;
        leaf = true;
        if colon > 0 && bytes[colon - 1] == b':' {
            return None;
        }
    }

    let boundary = text[..colon]
        .chars()
        .next_back()
        .is_none_or(|p| p.is_whitespace() || p == '(');
    if !boundary {
        return None;
    }

    let after = &text[colon + if leaf { 2 } else { 1 }..];
    let name_len = name_length(after)?;
    let name = after[..name_len].to_string();
    let rest = &after[name_len..];

    let label = match rest.strip_prefix('[') {
        Some(inner) => {
            let end = inner.find(']')?;
            if !inner[end + 1..].is_empty() {
                return None;
            }
            Some(inner[..end].to_string())
        }
        None if rest.is_empty() => None,
        None => return None,
    };

    Some(DirectiveHead {
        start: colon,
        name,
        label,
        leaf,
    })
}

/// Name: ASCII alphabetic start, then alphanumerics and hyphens.
fn name_length(s: &str) -> Option<usize> {
    let mut chars = s.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    let len = 1 + chars
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .count();
    Some(len)
}

/// Directive attribute dialect: quoted or unquoted values, booleans,
/// `.class` / `#id` shorthands.
pub(crate) fn parse_attribute_map(inner: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    for token in tokenize(inner) {
        if let Some(class) = token.strip_prefix('.') {
            if !class.is_empty() {
                attributes.push(("class".to_string(), class.to_string()));
            }
        } else if let Some(id) = token.strip_prefix('#') {
            if !id.is_empty() {
                attributes.push(("id".to_string(), id.to_string()));
            }
        } else if let Some((key, value)) = token.split_once('=') {
            if key.is_empty() {
                attributes.push((token.to_string(), String::new()));
            } else {
                let value = unquote(value).unwrap_or(value);
                attributes.push((key.to_string(), value.to_string()));
            }
        } else {
            attributes.push((token.to_string(), String::new()));
        }
    }
    attributes
}
