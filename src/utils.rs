//! Utility functions for attachment naming and path handling

use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Get a path that does not exist yet, adding " (1)", " (2)", ... before the extension
///
/// # Examples
///
/// ```
/// use coursesync::utils::get_unique_path;
/// use std::path::Path;
///
/// let unique = get_unique_path(Path::new("/tmp/does-not-exist/slides.pdf")).unwrap();
/// assert_eq!(unique, Path::new("/tmp/does-not-exist/slides.pdf"));
/// ```
pub fn get_unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Other(format!("cannot extract file stem from {}", path.display())))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path.parent().ok_or_else(|| {
        Error::Other(format!(
            "cannot extract parent directory from {}",
            path.display()
        ))
    })?;

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(Error::Other(format!(
        "could not find a unique file name for {} after {} attempts",
        path.display(),
        MAX_RENAME_ATTEMPTS
    )))
}

/// Make an externally supplied file name safe to use as a single path component
///
/// Path separators, control characters and characters rejected by common
/// filesystems become `_`; leading dots are stripped so the result is never
/// hidden or a parent reference. An empty result becomes "attachment".
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.').trim();
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extract a file name (with extension) from response headers or the URL
///
/// Prefers `Content-Disposition` (`filename=` or RFC 5987 `filename*=`),
/// then the last URL path segment, then "attachment".
pub fn file_name_from_response(headers: &HeaderMap, url: &str) -> String {
    if let Some(content_disposition) = headers.get(reqwest::header::CONTENT_DISPOSITION)
        && let Ok(value) = content_disposition.to_str()
    {
        // Format: attachment; filename="file.pdf" or filename*=UTF-8''file.pdf
        for part in value.split(';') {
            let part = part.trim();
            if let Some(encoded) = part.strip_prefix("filename*=") {
                if let Some(idx) = encoded.rfind('\'')
                    && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
                {
                    return sanitize_file_name(&decoded);
                }
            } else if let Some(filename) = part.strip_prefix("filename=") {
                return sanitize_file_name(filename.trim_matches('"'));
            }
        }
    }

    if let Ok(parsed_url) = url::Url::parse(url)
        && let Some(mut segments) = parsed_url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
    {
        let decoded = urlencoding::decode(last_segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| last_segment.to_string());
        return sanitize_file_name(&decoded);
    }

    "attachment".to_string()
}
