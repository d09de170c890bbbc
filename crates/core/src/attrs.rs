//! Attribute-string tokenizing and parsing shared by every media syntax.
//!
//! Four authoring dialects (trailing `{...}` blocks, MDX title-slot attrs,
//! directive attribute maps, loose video attribute strings) converge on the
//! tokenizer and parsers in this module. The grammar is deliberately
//! forgiving: tokens that fit no known shape degrade to bare class names.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Tokenize an attribute string, splitting on whitespace while keeping
/// quoted substrings (double or single) intact.
pub fn tokenize(attrs: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut token_start: Option<usize> = None;
    let mut in_quotes = false;
    let mut quote_char = '"';

    for (i, c) in attrs.char_indices() {
        match c {
            '"' | '\'' if !in_quotes => {
                if token_start.is_none() {
                    token_start = Some(i);
                }
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
            }
            c if c.is_whitespace() && !in_quotes => {
                if let Some(start) = token_start.take() {
                    tokens.push(&attrs[start..i]);
                }
            }
            _ => {
                if token_start.is_none() {
                    token_start = Some(i);
                }
            }
        }
    }

    if let Some(start) = token_start {
        tokens.push(&attrs[start..]);
    }

    tokens
}

/// Result of parsing a `{class="..." style="..." attrs="..."}` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrBlock {
    /// Collected class names, in encounter order.
    pub classes: Vec<String>,
    /// Merged style string (repeated `style=` occurrences joined with `; `).
    pub style: String,
    /// Free-form attribute string from `attrs=` tokens.
    pub freeform: String,
}

impl AttrBlock {
    /// Parse an attribute block. Surrounding braces are optional; smart
    /// quotes are normalized to their ASCII forms first.
    pub fn parse(raw: &str) -> Self {
        let mut block = Self::default();
        let trimmed = raw.trim();
        let inner = match trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(inner) => inner,
            None => trimmed,
        };
        let normalized = normalize_quotes(inner);

        for token in tokenize(&normalized) {
            if let Some(value) = quoted_value_for(token, "class") {
                block
                    .classes
                    .extend(value.split_whitespace().map(str::to_string));
            } else if let Some(value) = quoted_value_for(token, "style") {
                if !value.trim().is_empty() {
                    append_style(&mut block.style, value.trim());
                }
            } else if let Some(value) = quoted_value_for(token, "attrs") {
                let value = value.trim();
                if !value.is_empty() {
                    if !block.freeform.is_empty() {
                        block.freeform.push(' ');
                    }
                    block.freeform.push_str(value);
                }
            } else if let Some(name) = token.strip_prefix('.') {
                if !name.is_empty() {
                    block.classes.push(name.to_string());
                }
            } else {
                block.classes.push(token.to_string());
            }
        }

        block
    }

    /// True when the block carried no classes, style, or free-form attrs.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.style.is_empty() && self.freeform.is_empty()
    }
}

/// Append a style fragment, joining with `; ` when styles already exist.
pub fn append_style(existing: &mut String, addition: &str) {
    if addition.is_empty() {
        return;
    }
    if !existing.is_empty() {
        existing.push_str("; ");
    }
    existing.push_str(addition);
}

fn normalize_quotes(s: &str) -> Cow<'_, str> {
    if s.chars().any(|c| matches!(c, '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}')) {
        Cow::Owned(
            s.chars()
                .map(|c| match c {
                    '\u{201c}' | '\u{201d}' => '"',
                    '\u{2018}' | '\u{2019}' => '\'',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(s)
    }
}

/// Extracts the quoted value of a `key="..."` / `key='...'` token.
/// Returns `None` unless the whole token has exactly that shape.
fn quoted_value_for<'t>(token: &'t str, key: &str) -> Option<&'t str> {
    let rest = token.strip_prefix(key)?.strip_prefix('=')?;
    unquote(rest)
}

pub(crate) fn unquote(value: &str) -> Option<&str> {
    let mut chars = value.chars();
    let quote = match chars.next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return None,
    };
    let inner = &value[1..];
    let end = inner.rfind(quote)?;
    // The closing quote must terminate the token.
    (end == inner.len() - 1).then(|| &inner[..end])
}

/// Parse a loose attribute string like `controls playsinline foo="bar"` into
/// `(key, value)` pairs; tokens without a quoted value are booleans (`None`).
pub fn parse_loose_attrs(input: &str) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    for token in tokenize(input) {
        let parsed = token.split_once('=').and_then(|(key, value)| {
            if key.is_empty() {
                return None;
            }
            unquote(value).map(|v| (key.to_string(), Some(v.to_string())))
        });
        out.push(parsed.unwrap_or_else(|| (token.to_string(), None)));
    }
    out
}

/// Parse attributes smuggled through an image's title slot.
///
/// Accepts a full `{...}` block, or a bare string that clearly uses the
/// attribute micro-syntax (`class=`/`style=`/`attrs=` keys or `.class`
/// tokens). Anything else is a genuine tooltip title and yields `None`.
pub fn parse_title_attrs(title: &str) -> Option<AttrBlock> {
    let t = title.trim();
    if t.is_empty() {
        return None;
    }
    if t.starts_with('{') && t.ends_with('}') {
        return Some(AttrBlock::parse(t));
    }
    if contains_attr_key(t, "class=")
        || contains_attr_key(t, "style=")
        || contains_attr_key(t, "attrs=")
        || has_dot_token(t)
    {
        return Some(AttrBlock::parse(t));
    }
    None
}

/// `key=` preceded by a word boundary (start of string or non-word char).
fn contains_attr_key(s: &str, key: &str) -> bool {
    let mut from = 0;
    while let Some(pos) = s[from..].find(key) {
        let at = from + pos;
        let boundary = at == 0
            || s[..at]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_alphanumeric() && c != '_');
        if boundary {
            return true;
        }
        from = at + key.len();
    }
    false
}

/// A `.name` token at the start of the string or after whitespace.
fn has_dot_token(s: &str) -> bool {
    let mut prev: Option<char> = None;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '.'
            && prev.is_none_or(char::is_whitespace)
            && chars
                .peek()
                .is_some_and(|&next| !next.is_whitespace() && next != '"' && next != '\'')
        {
            return true;
        }
        prev = Some(c);
    }
    false
}

/// Style attribute value: a plain CSS string, or a `{key: value, ...}`
/// object normalized at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleValue {
    /// Already a CSS declaration string.
    Plain(String),
    /// Key/value pairs from object-ish syntax.
    Pairs(Vec<(String, String)>),
}

impl StyleValue {
    /// Classify a raw style value.
    pub fn parse(raw: &str) -> Self {
        let t = raw.trim();
        if let Some(inner) = t.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let mut pairs = Vec::new();
            for part in inner.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                match part.split_once(':') {
                    Some((key, value)) if !key.trim().is_empty() => {
                        pairs.push((
                            strip_quotes(key.trim()).to_string(),
                            strip_quotes(value.trim()).to_string(),
                        ));
                    }
                    // Not object syntax after all; keep the raw string.
                    _ => return Self::Plain(t.to_string()),
                }
            }
            return Self::Pairs(pairs);
        }
        Self::Plain(t.to_string())
    }

    /// Produce the semicolon-joined declaration string.
    pub fn flatten(&self) -> String {
        match self {
            Self::Plain(s) => s.trim().to_string(),
            Self::Pairs(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{}:{}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}

/// Derive a readable alt text from a URL's filename: extension stripped,
/// percent-decoded, `-`/`_` runs collapsed to single spaces. Never empty.
pub fn derive_alt_from_url(url: &str) -> String {
    const FALLBACK: &str = "Image";

    let base = url
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let file = base.rsplit('/').next().unwrap_or_default();
    let stem = strip_extension(file);
    let decoded = percent_decode_str(stem).decode_utf8_lossy();

    let mut human = String::with_capacity(decoded.len());
    let mut pending_space = false;
    for ch in decoded.chars() {
        if ch == '-' || ch == '_' {
            pending_space = true;
        } else {
            if pending_space && !human.is_empty() {
                human.push(' ');
            }
            pending_space = false;
            human.push(ch);
        }
    }

    let human = human.trim().to_string();
    if human.is_empty() {
        FALLBACK.to_string()
    } else {
        human
    }
}

/// Strip a trailing `.ext` where ext is ASCII alphanumeric and non-empty.
fn strip_extension(file: &str) -> &str {
    match file.rfind('.') {
        Some(dot) => {
            let ext = &file[dot + 1..];
            if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
                &file[..dot]
            } else {
                file
            }
        }
        None => file,
    }
}
