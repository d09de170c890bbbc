//! Content-addressed placement and path utilities.
//!
//! Placement is a pure function of (content hash, extension, dedupe mode,
//! document id): computing it twice yields the same path, and identical
//! bytes always land on the same name, so copies are idempotent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mediamark_core::tree::MediaKind;

use crate::config::{DedupeMode, MediaConfig};

/// Extensions whose dimensions are worth probing.
pub const IMAGE_EXTS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".webp", ".gif", ".bmp", ".tiff", ".avif",
];

/// Extensions treated as video.
pub const VIDEO_EXTS: &[&str] = &[".mp4", ".webm", ".ogg"];

/// True for a lowercased image extension.
pub fn is_image_ext(ext: &str) -> bool {
    IMAGE_EXTS.iter().any(|e| ext.eq_ignore_ascii_case(e))
}

/// True for a lowercased video extension.
pub fn is_video_ext(ext: &str) -> bool {
    VIDEO_EXTS.iter().any(|e| ext.eq_ignore_ascii_case(e))
}

/// True for any recognized media extension.
pub fn is_media_ext(ext: &str) -> bool {
    is_image_ext(ext) || is_video_ext(ext)
}

/// Media kind for a lowercased extension.
pub fn kind_for_ext(ext: &str) -> MediaKind {
    if is_video_ext(ext) {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// Lowercased extension (with dot) of a path or URL, when present.
pub fn file_ext(path_or_url: &str) -> Option<String> {
    let file = path_or_url.rsplit(['/', '\\']).next()?;
    let dot = file.rfind('.')?;
    let ext = &file[dot..];
    (ext.len() > 1).then(|| ext.to_ascii_lowercase())
}

/// SHA-1 hex digest over a file's full bytes.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mut sha = sha1_smol::Sha1::new();
    sha.update(&bytes);
    Ok(sha.digest().to_string())
}

/// Content-addressed file name: `{sha1}{ext}`.
pub fn hashed_name(hash: &str, ext: &str) -> String {
    format!("{}{}", hash, ext)
}

/// Site-relative public path for a hashed asset.
pub fn public_rel(cfg: &MediaConfig, post_id: &str, name: &str) -> String {
    match cfg.dedupe_mode {
        DedupeMode::Global => format!("/{}/hash/{}", cfg.public_base, name),
        DedupeMode::PerPost => format!("/{}/images/{}/{}", cfg.public_base, post_id, name),
    }
}

/// Filesystem target for a hashed asset, under the output root.
pub fn target_abs(cfg: &MediaConfig, post_id: &str, name: &str) -> PathBuf {
    let mut path = cfg.output_root.join(&cfg.public_base);
    match cfg.dedupe_mode {
        DedupeMode::Global => path.push("hash"),
        DedupeMode::PerPost => {
            path.push("images");
            for segment in post_id.split('/') {
                path.push(segment);
            }
        }
    }
    path.push(name);
    path
}

/// Derive a document id from its source path: everything after the last
/// content-root marker segment, markdown extension stripped, separators
/// normalized to `/`. Falls back to the bare file name when the marker is
/// absent.
pub fn derive_post_id(path: &Path, marker: &str) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let marker_seg = format!("/{}/", marker.trim_matches('/'));

    let rel = match normalized.rfind(&marker_seg) {
        Some(at) => &normalized[at + marker_seg.len()..],
        None => normalized.rsplit('/').next().unwrap_or(&normalized),
    };

    strip_markdown_ext(rel).to_string()
}

fn strip_markdown_ext(name: &str) -> &str {
    for ext in [".md", ".mdx", ".markdown"] {
        if name.len() > ext.len() && name[name.len() - ext.len()..].eq_ignore_ascii_case(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// Extract a local file path from a possibly decorated reference string.
///
/// Strips one wrapping `<...>`; rejects remote and `/`-rooted references;
/// accepts a clean single token with a known media extension; otherwise
/// falls back to scanning for the first embedded filename-with-extension,
/// an artifact of older authoring that put class/style hints inside the
/// URL slot.
pub fn extract_local_path(raw: &str) -> Option<String> {
    let mut s = raw.trim();
    if s.len() >= 2 && s.starts_with('<') && s.ends_with('>') {
        s = s[1..s.len() - 1].trim();
    }
    if s.is_empty() || is_remote_or_rooted(s) {
        return None;
    }

    if let Some(ext) = file_ext(s)
        && is_media_ext(&ext)
        && !s.chars().any(char::is_whitespace)
    {
        return Some(s.to_string());
    }

    for token in s.split(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '<' | '>')
    }) {
        if token.is_empty() {
            continue;
        }
        if let Some(found) = media_prefix(token) {
            return Some(found.to_string());
        }
    }
    None
}

fn is_remote_or_rooted(s: &str) -> bool {
    if s.starts_with('/') {
        return true;
    }
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Shortest prefix of `token` ending in a recognized media extension.
fn media_prefix(token: &str) -> Option<&str> {
    for (i, _) in token.char_indices().filter(|&(_, c)| c == '.') {
        for ext in IMAGE_EXTS.iter().chain(VIDEO_EXTS) {
            let end = i + ext.len();
            if let Some(candidate) = token.get(i..end)
                && candidate.eq_ignore_ascii_case(ext)
            {
                return Some(&token[..end]);
            }
        }
    }
    None
}
