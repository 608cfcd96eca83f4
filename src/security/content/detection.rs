use std::path::Path;

/// Magic-byte sniffing via `infer`.
#[must_use]
pub fn detect_mime(data: &[u8]) -> Option<String> {
    infer::get(data).map(|info| info.mime_type().to_string())
}

#[must_use]
pub fn detect_mime_from_extension(filename: &str) -> Option<String> {
    let ext = extension_of(filename)?;
    let mime = match ext.as_str() {
        ".txt" | ".log" | ".conf" | ".cfg" | ".ini" => mime::TEXT_PLAIN.essence_str(),
        ".csv" => mime::TEXT_CSV.essence_str(),
        ".html" | ".htm" => mime::TEXT_HTML.essence_str(),
        ".xml" => mime::TEXT_XML.essence_str(),
        ".json" => mime::APPLICATION_JSON.essence_str(),
        ".js" => "application/javascript",
        ".py" => "text/x-python",
        ".c" | ".h" | ".cpp" => "text/x-c",
        ".java" => "text/x-java-source",
        ".pdf" => mime::APPLICATION_PDF.essence_str(),
        ".zip" => "application/zip",
        ".tar" => "application/x-tar",
        ".gz" => "application/gzip",
        ".7z" => "application/x-7z-compressed",
        ".rar" => "application/vnd.rar",
        ".exe" | ".dll" => "application/vnd.microsoft.portable-executable",
        ".jpg" | ".jpeg" => mime::IMAGE_JPEG.essence_str(),
        ".png" => mime::IMAGE_PNG.essence_str(),
        ".gif" => mime::IMAGE_GIF.essence_str(),
        ".bmp" => mime::IMAGE_BMP.essence_str(),
        ".webp" => "image/webp",
        ".tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime.to_string())
}

/// Sniff, then trust the extension, then fall back to text or opaque bytes.
#[must_use]
pub fn detect_content_mime(data: &[u8], filename: &str) -> String {
    detect_mime(data)
        .or_else(|| detect_mime_from_extension(filename))
        .unwrap_or_else(|| {
            if !data.is_empty() && !data.contains(&0) && std::str::from_utf8(data).is_ok() {
                mime::TEXT_PLAIN.essence_str().to_string()
            } else {
                mime::APPLICATION_OCTET_STREAM.essence_str().to_string()
            }
        })
}

/// Lowercased extension with its leading dot, if the name has one.
#[must_use]
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}
