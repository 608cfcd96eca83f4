/// Interpreters and read-only inspection tools a script command may start
/// with.
#[must_use]
pub fn default_allowed_commands() -> Vec<String> {
    [
        "python", "python3", "node", "bash", "sh", "grep", "awk", "sed", "cat", "head", "tail",
        "file", "strings", "hexdump", "xxd", "openssl", "base64", "md5sum", "sha256sum",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `(rule name, case-insensitive pattern)` pairs checked against the full
/// command string.
pub const DEFAULT_DENY_RULES: &[(&str, &str)] = &[
    ("recursive_delete", r"\brm\s+-[a-z]*r[a-z]*f|\brm\s+-[a-z]*f[a-z]*r"),
    ("device_redirect", r">\s*/dev"),
    ("curl_pipe", r"\bcurl\b.*\|"),
    ("wget_pipe", r"\bwget\b.*\|"),
    ("pipe_to_fetch", r"\|\s*(curl|wget)\b"),
    ("netcat", r"\b(nc|ncat|netcat)\s+\S"),
    ("nested_shell", r"\b(ba|z|da|k)?sh\s+(-\S*\s+)*-[a-z]*c"),
    ("backtick_substitution", r"`"),
    ("command_substitution", r"\$\("),
    ("parameter_expansion", r"\$\{"),
    ("process_substitution", r"[<>]\("),
    ("and_chain", r"&&"),
    ("or_chain", r"\|\|"),
    ("sequence", r";"),
    ("newline", r"[\r\n]"),
];

#[must_use]
pub fn default_allowed_mime_types() -> Vec<String> {
    vec![
        // Text
        "text/plain".into(),
        "text/csv".into(),
        "text/html".into(),
        "text/xml".into(),
        "application/json".into(),
        "application/xml".into(),
        // Archives
        "application/zip".into(),
        "application/x-tar".into(),
        "application/gzip".into(),
        "application/x-gzip".into(),
        "application/x-7z-compressed".into(),
        "application/x-rar-compressed".into(),
        "application/vnd.rar".into(),
        // Executables kept for analysis
        "application/x-executable".into(),
        "application/x-dosexec".into(),
        "application/vnd.microsoft.portable-executable".into(),
        "application/x-mach-binary".into(),
        "application/x-elf".into(),
        // Images
        "image/jpeg".into(),
        "image/png".into(),
        "image/gif".into(),
        "image/bmp".into(),
        "image/webp".into(),
        "image/tiff".into(),
        // Documents
        "application/pdf".into(),
        "application/msword".into(),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document".into(),
        "application/vnd.ms-excel".into(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".into(),
        // Source code
        "application/x-python-code".into(),
        "application/javascript".into(),
        "text/x-python".into(),
        "text/x-c".into(),
        "text/x-java-source".into(),
        "application/octet-stream".into(),
    ]
}

#[must_use]
pub fn default_allowed_extensions() -> Vec<String> {
    [
        ".txt", ".csv", ".json", ".xml", ".html", ".htm", ".zip", ".tar", ".gz", ".7z", ".rar",
        ".exe", ".dll", ".so", ".dylib", ".bin", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp",
        ".tiff", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".py", ".js", ".c", ".cpp", ".h",
        ".java", ".log", ".conf", ".cfg", ".ini",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
