//! Filename derivation and sanitization for downloaded assets.
//!
//! Documents are stored under the last path segment of their percent-decoded
//! locator; audio books get a directory named after their slug.

use std::path::{Component, Path};

use url::Url;

/// Name used when a locator yields no usable file name.
const FALLBACK_FILENAME: &str = "download.bin";

/// Derives a filesystem-safe file name from a content locator.
///
/// `https://host/files/Buku%20Siswa.pdf` becomes `Buku Siswa.pdf`. Locators
/// that are not absolute URLs are treated as plain paths.
#[must_use]
pub fn file_name_from_locator(locator: &str) -> String {
    let last_segment = match Url::parse(locator) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .to_string(),
        Err(_) => locator
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string(),
    };

    let decoded = match urlencoding::decode(&last_segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => last_segment.clone(),
    };
    // A decoded segment may itself contain separators (`a%2Fb.pdf`).
    let name = decoded.rsplit(['/', '\\']).next().unwrap_or("");

    if name.trim().is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    sanitize_filename(name)
}

/// Derives a single safe directory name from an opaque slug.
#[must_use]
pub fn safe_dir_name(slug: &str) -> String {
    let component = sanitize_filename_component(slug);
    if component.is_empty() {
        "_".to_string()
    } else {
        component
    }
}

/// Collapses anything outside `[A-Za-z0-9-_.]` (Unicode letters allowed) to `_`.
pub(crate) fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if is_safe_filename_segment(trimmed) {
        trimmed.to_string()
    } else {
        trimmed.replace('.', "_")
    }
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
