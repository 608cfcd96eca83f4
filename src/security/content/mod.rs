//! Upload inspection: size gate, MIME/extension checks, executable and
//! script markers, and entropy.

mod detection;
mod entropy;
mod filename;

pub use detection::{detect_content_mime, extension_of};
pub use entropy::{
    ENTROPY_SAMPLE_BYTES, EntropyAssessment, HIGH_ENTROPY_THRESHOLD, shannon_entropy,
};
pub use filename::{MAX_FILENAME_BYTES, SanitizeError, sanitize};

use crate::config::UploadConfig;
use serde::Serialize;
use std::collections::HashSet;

/// Byte sequences that suggest active content, matched case-insensitively.
const SCRIPT_PATTERNS: &[&[u8]] = &[
    b"<script",
    b"javascript:",
    b"vbscript:",
    b"<?php",
    b"<%",
    b"${",
    b"eval(",
];

/// Outcome of inspecting one upload.
///
/// Only `issues` block storage; `warnings` are informational and returned to
/// the client alongside the stored file.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationVerdict {
    pub is_safe: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub mime_type: String,
    pub entropy: f64,
    pub entropy_assessment: EntropyAssessment,
}

#[derive(Debug, Clone)]
pub struct ContentValidator {
    max_bytes: u64,
    allowed_mime_types: HashSet<String>,
    allowed_extensions: HashSet<String>,
}

impl ContentValidator {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_bytes: config.max_upload_bytes,
            allowed_mime_types: config
                .allowed_mime_types
                .iter()
                .map(|m| m.to_ascii_lowercase())
                .collect(),
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Inspect `content` uploaded under `filename`. Pure; never touches disk.
    pub fn validate(&self, content: &[u8], filename: &str) -> ValidationVerdict {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        let size = content.len() as u64;
        if size > self.max_bytes {
            issues.push(format!(
                "File too large: {size} bytes > {} bytes",
                self.max_bytes
            ));
        }

        let mime_type = detect_content_mime(content, filename);
        if !self.allowed_mime_types.contains(&mime_type) {
            warnings.push(format!("Uncommon MIME type: {mime_type}"));
        }

        match extension_of(filename) {
            Some(ext) if self.allowed_extensions.contains(&ext) => {}
            Some(ext) => warnings.push(format!("Uncommon file extension: {ext}")),
            None => warnings.push("Missing file extension".to_string()),
        }

        if has_executable_header(content) {
            warnings.push("Executable file detected".to_string());
        }

        if contains_script_marker(content) {
            warnings.push("Potentially dangerous script content detected".to_string());
        }

        let sample = &content[..content.len().min(ENTROPY_SAMPLE_BYTES)];
        let entropy = shannon_entropy(sample);
        if !content.is_empty() && entropy >= HIGH_ENTROPY_THRESHOLD {
            warnings.push(format!(
                "High entropy content detected ({entropy:.2} bits/byte, likely encrypted or compressed)"
            ));
        }

        ValidationVerdict {
            is_safe: issues.is_empty(),
            issues,
            warnings,
            mime_type,
            entropy,
            entropy_assessment: EntropyAssessment::from_entropy(entropy),
        }
    }
}

fn has_executable_header(content: &[u8]) -> bool {
    content.starts_with(b"MZ") || content.starts_with(b"\x7fELF")
}

fn contains_script_marker(content: &[u8]) -> bool {
    SCRIPT_PATTERNS.iter().any(|pattern| {
        content
            .windows(pattern.len())
            .any(|window| window.eq_ignore_ascii_case(pattern))
    })
}
