//! Raw-text preprocessing applied before parsing.
//!
//! MDX treats `{...}` as expression syntax, so the legacy shorthand
//! `![alt](url){attrs}` cannot survive MDX parsing as-authored. This rewrite
//! converts every occurrence into directive syntax the rest of the pipeline
//! handles uniformly:
//!
//! ```text
//! ![A cat](cat.png){.rounded}   ->   :img[A cat]{src="cat.png" .rounded}
//! ```
//!
//! The caller gates this on the authoring format (`.mdx` files only).

use std::borrow::Cow;

use crate::fence::FenceTracker;

/// Rewrite `![alt](url){attrs}` occurrences into `:img` directive syntax.
/// Lines inside fenced code blocks pass through untouched.
pub fn rewrite_image_shorthand(input: &str) -> Cow<'_, str> {
    let mut fence = FenceTracker::new();
    let mut out = String::with_capacity(input.len());
    let mut changed = false;

    for line in input.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let body = body.strip_suffix('\r').unwrap_or(body);
        let ending = &line[body.len()..];

        if fence.advance(body) {
            out.push_str(body);
            out.push_str(ending);
            continue;
        }

        match rewrite_line(body) {
            Some(rewritten) => {
                changed = true;
                out.push_str(&rewritten);
            }
            None => out.push_str(body),
        }
        out.push_str(ending);
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(input)
    }
}

fn rewrite_line(line: &str) -> Option<String> {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    let mut changed = false;

    while let Some(pos) = rest.find("![") {
        match match_shorthand(&rest[pos..]) {
            Some(m) => {
                out.push_str(&rest[..pos]);
                out.push_str(":img[");
                out.push_str(m.alt);
                out.push_str("]{src=\"");
                out.push_str(m.url);
                out.push('"');
                if !m.attrs.trim().is_empty() {
                    out.push(' ');
                    out.push_str(m.attrs);
                }
                out.push('}');
                rest = &rest[pos + m.len..];
                changed = true;
            }
            None => {
                out.push_str(&rest[..pos + 2]);
                rest = &rest[pos + 2..];
            }
        }
    }
    out.push_str(rest);

    changed.then_some(out)
}

struct Shorthand<'a> {
    alt: &'a str,
    url: &'a str,
    attrs: &'a str,
    len: usize,
}

/// Match `![alt](url){attrs}` at the start of `s`. Alt may not contain `]`,
/// the url may not contain whitespace or `)`, attrs may not contain `}`;
/// whitespace between `)` and `{` is allowed.
fn match_shorthand(s: &str) -> Option<Shorthand<'_>> {
    let after_bang = s.strip_prefix("![")?;
    let alt_end = after_bang.find(']')?;
    let alt = &after_bang[..alt_end];

    let after_alt = after_bang[alt_end + 1..].strip_prefix('(')?;
    let url_end = after_alt.find(|c: char| c == ')' || c.is_whitespace())?;
    if !after_alt[url_end..].starts_with(')') || url_end == 0 {
        return None;
    }
    let url = &after_alt[..url_end];

    let after_url = &after_alt[url_end + 1..];
    let gap = after_url.len() - after_url.trim_start().len();
    let after_gap = after_url[gap..].strip_prefix('{')?;
    let attrs_end = after_gap.find('}')?;
    let attrs = &after_gap[..attrs_end];

    let len = 2 + alt_end + 1 + 1 + url_end + 1 + gap + 1 + attrs_end + 1;
    Some(Shorthand {
        alt,
        url,
        attrs,
        len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_basic_shorthand() {
        let out = rewrite_image_shorthand("![A cat](cat.png){.rounded}");
        assert_eq!(out, ":img[A cat]{src=\"cat.png\" .rounded}");
    }

    #[test]
    fn rewrites_empty_alt_and_attrs() {
        let out = rewrite_image_shorthand("![](cat.png){}");
        assert_eq!(out, ":img[]{src=\"cat.png\"}");
    }

    #[test]
    fn allows_space_before_brace() {
        let out = rewrite_image_shorthand("![x](a.png) {class=\"b\"}");
        assert_eq!(out, ":img[x]{src=\"a.png\" class=\"b\"}");
    }

    #[test]
    fn plain_image_without_block_untouched() {
        let input = "![alt](cat.png) and text";
        assert_eq!(rewrite_image_shorthand(input), input);
    }

    #[test]
    fn multiple_occurrences_on_one_line() {
        let out = rewrite_image_shorthand("![a](1.png){.x} mid ![b](2.png){.y}");
        assert_eq!(
            out,
            ":img[a]{src=\"1.png\" .x} mid :img[b]{src=\"2.png\" .y}"
        );
    }

    #[test]
    fn fenced_code_untouched() {
        let input = "```md\n![a](1.png){.x}\n```\n![b](2.png){.y}\n";
        let out = rewrite_image_shorthand(input);
        assert!(out.contains("![a](1.png){.x}"));
        assert!(out.contains(":img[b]{src=\"2.png\" .y}"));
    }

    #[test]
    fn url_with_space_is_not_shorthand() {
        let input = "![a](my file.png){.x}";
        assert_eq!(rewrite_image_shorthand(input), input);
    }

    #[test]
    fn borrows_when_nothing_matches() {
        let input = "plain paragraph\n";
        assert!(matches!(
            rewrite_image_shorthand(input),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn preserves_crlf_line_endings() {
        let out = rewrite_image_shorthand("![a](1.png){.x}\r\nnext\r\n");
        assert_eq!(out, ":img[a]{src=\"1.png\" .x}\r\nnext\r\n");
    }
}
