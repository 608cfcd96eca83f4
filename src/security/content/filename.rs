use rand::RngCore;
use thiserror::Error;

/// Upper bound on a sanitized filename, extension included.
pub const MAX_FILENAME_BYTES: usize = 255;

/// Matched case-insensitively against the final path component.
const FORBIDDEN_PATTERNS: &[&str] = &[
    "../",
    "\\.\\",
    "<script",
    "javascript:",
    "vbscript:",
    "file://",
    "data:",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("filename contains forbidden pattern {pattern:?}")]
    ForbiddenPattern { pattern: &'static str },
}

/// Reduce an untrusted filename to a single safe path component.
///
/// Directory components are dropped, names carrying traversal or
/// script/URL-scheme markers are rejected, characters outside
/// `[A-Za-z0-9._-]` become `_`, and the length is capped at
/// [`MAX_FILENAME_BYTES`] keeping the extension. A name that ends up empty,
/// `.` or `..` is replaced with `safe_file_<16 hex>.bin`.
///
/// Sanitizing an already sanitized name returns it unchanged.
pub fn sanitize(filename: &str) -> Result<String, SanitizeError> {
    let base = filename.rsplit('/').next().unwrap_or_default();

    let lowered = base.to_lowercase();
    if let Some(pattern) = FORBIDDEN_PATTERNS
        .iter()
        .copied()
        .find(|pattern| lowered.contains(pattern))
    {
        return Err(SanitizeError::ForbiddenPattern { pattern });
    }

    let replaced: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let capped = cap_length(replaced);
    if capped.is_empty() || capped == "." || capped == ".." {
        return Ok(random_safe_name());
    }
    Ok(capped)
}

/// `name` is pure ASCII here, so byte and char offsets agree.
fn cap_length(name: String) -> String {
    if name.len() <= MAX_FILENAME_BYTES {
        return name;
    }
    match name.rfind('.').filter(|&dot| dot > 0) {
        Some(dot) if name.len() - dot < MAX_FILENAME_BYTES => {
            let ext = &name[dot..];
            let stem = &name[..MAX_FILENAME_BYTES - ext.len()];
            format!("{stem}{ext}")
        }
        _ => name[..MAX_FILENAME_BYTES].to_string(),
    }
}

fn random_safe_name() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill_bytes(&mut bytes);
    format!("safe_file_{}.bin", hex::encode(bytes))
}
