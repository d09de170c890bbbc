//! YAML frontmatter extraction helpers.

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Frontmatter pulled off the top of a document.
#[derive(Debug)]
pub struct FrontmatterExtraction {
    /// Parsed frontmatter as a JSON value (always an object).
    pub value: JsonValue,
    /// Byte offset where the document body begins.
    pub body_start: usize,
}

impl FrontmatterExtraction {
    fn empty() -> Self {
        Self {
            value: JsonValue::Object(Default::default()),
            body_start: 0,
        }
    }
}

/// Errors emitted while locating or parsing frontmatter.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    /// Opening `---` fence without a closing one.
    #[error("unterminated YAML frontmatter block: expected closing '---'")]
    Unterminated,
    /// YAML failed to parse.
    #[error("frontmatter parse error: {0}")]
    Parse(String),
    /// Top-level YAML node was not a mapping.
    #[error("frontmatter must be a YAML mapping at the top level")]
    InvalidRootType,
}

/// Extract YAML frontmatter from a document. Documents without a leading
/// `---` fence yield an empty object and `body_start == 0`.
pub fn extract_frontmatter(input: &str) -> Result<FrontmatterExtraction, FrontmatterError> {
    let (content, bom_len) = strip_bom(input);

    let mut cursor = 0;
    // Skip leading blank lines; the first real line must open the fence.
    let opening = loop {
        let Some((line, next)) = next_line(content, cursor) else {
            return Ok(FrontmatterExtraction::empty());
        };
        if line.trim().is_empty() {
            cursor = next;
            continue;
        }
        if !is_fence(line) {
            return Ok(FrontmatterExtraction::empty());
        }
        break next;
    };

    let mut scan = opening;
    loop {
        let Some((line, next)) = next_line(content, scan) else {
            return Err(FrontmatterError::Unterminated);
        };
        if is_fence(line) {
            let block = content[opening..scan].trim_end_matches(['\r', '\n']);
            return Ok(FrontmatterExtraction {
                value: parse_block(block)?,
                body_start: bom_len + next,
            });
        }
        scan = next;
    }
}

/// The `image` string field, when present.
pub fn image_field(frontmatter: &JsonValue) -> Option<&str> {
    frontmatter.get("image")?.as_str()
}

/// Overwrite the `image` field in place.
pub fn set_image_field(frontmatter: &mut JsonValue, url: impl Into<String>) {
    if let Some(map) = frontmatter.as_object_mut() {
        map.insert("image".to_string(), JsonValue::String(url.into()));
    }
}

fn parse_block(block: &str) -> Result<JsonValue, FrontmatterError> {
    if block.trim().is_empty() {
        return Ok(JsonValue::Object(Default::default()));
    }
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|err| FrontmatterError::Parse(err.to_string()))?;
    let json =
        serde_json::to_value(yaml).map_err(|err| FrontmatterError::Parse(err.to_string()))?;
    match json {
        JsonValue::Null => Ok(JsonValue::Object(Default::default())),
        JsonValue::Object(_) => Ok(json),
        _ => Err(FrontmatterError::InvalidRootType),
    }
}

fn strip_bom(input: &str) -> (&str, usize) {
    match input.strip_prefix('\u{feff}') {
        Some(stripped) => (stripped, '\u{feff}'.len_utf8()),
        None => (input, 0),
    }
}

/// Next line starting at `start`, with the offset just past its newline.
fn next_line(input: &str, start: usize) -> Option<(&str, usize)> {
    if start >= input.len() {
        return None;
    }
    match input[start..].find('\n') {
        Some(pos) => Some((&input[start..start + pos], start + pos + 1)),
        None => Some((&input[start..], input.len())),
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_end_matches('\r') == "---"
}
