use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_CHUNK: usize = 8192;

/// Bytes kept from one child stream, bounded by `cap`.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    bytes: Vec<u8>,
    truncated: bool,
}

pub type SharedCapture = Arc<Mutex<CaptureBuffer>>;

/// Read `reader` to EOF, keeping at most `cap` bytes. Anything beyond is
/// drained and discarded so the child never blocks on a full pipe.
pub async fn capture_bounded<R>(mut reader: R, cap: usize, sink: SharedCapture)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let mut buffer = sink.lock().unwrap_or_else(PoisonError::into_inner);
        let room = cap.saturating_sub(buffer.bytes.len());
        if n > room {
            buffer.truncated = true;
        }
        let keep = n.min(room);
        buffer.bytes.extend_from_slice(&chunk[..keep]);
    }
}

/// Decode what was captured, appending a marker when output was cut.
pub fn finish(sink: &SharedCapture, cap: usize) -> (String, bool) {
    let buffer = sink.lock().unwrap_or_else(PoisonError::into_inner);
    if !buffer.truncated {
        return (String::from_utf8_lossy(&buffer.bytes).into_owned(), false);
    }
    let mut text = String::from_utf8_lossy(trim_partial_char(&buffer.bytes)).into_owned();
    text.push_str(&truncation_marker(cap));
    (text, true)
}

/// Drop a multi-byte character the cap cut in half.
fn trim_partial_char(bytes: &[u8]) -> &[u8] {
    let mut tail = bytes.len().saturating_sub(4);
    while tail > 0 && bytes[tail] & 0xC0 == 0x80 {
        tail -= 1;
    }
    match std::str::from_utf8(&bytes[tail..]) {
        Err(e) if e.error_len().is_none() => &bytes[..tail + e.valid_up_to()],
        _ => bytes,
    }
}

pub fn truncation_marker(cap: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if cap >= MIB && cap % MIB == 0 {
        format!("\n... [output truncated at {}MB]", cap / MIB)
    } else {
        format!("\n... [output truncated at {cap} bytes]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn short_stream_is_kept_whole() {
        let sink = SharedCapture::default();
        capture_bounded(&b"hello"[..], 16, sink.clone()).await;

        assert_eq!(finish(&sink, 16), ("hello".to_string(), false));
    }

    #[tokio::test]
    async fn long_stream_is_capped_and_marked() {
        let data = vec![b'x'; 20_000];
        let sink = SharedCapture::default();
        capture_bounded(&data[..], 100, sink.clone()).await;

        let (text, truncated) = finish(&sink, 100);
        assert!(truncated);
        assert!(text.starts_with(&"x".repeat(100)));
        assert!(text.ends_with("[output truncated at 100 bytes]"));
        assert_eq!(text.len(), 100 + truncation_marker(100).len());
    }

    #[tokio::test]
    async fn exact_cap_is_not_truncated() {
        let sink = SharedCapture::default();
        capture_bounded(&[b'y'; 64][..], 64, sink.clone()).await;
        assert!(!finish(&sink, 64).1);
    }

    #[tokio::test]
    async fn cap_never_splits_a_character() {
        let sink = SharedCapture::default();
        capture_bounded("aaaaé€".as_bytes(), 5, sink.clone()).await;

        let (text, truncated) = finish(&sink, 5);
        assert!(truncated);
        assert!(!text.contains('\u{FFFD}'));
        assert_eq!(text, format!("aaaa{}", truncation_marker(5)));
    }

    #[test]
    fn complete_characters_at_the_cap_are_kept() {
        assert_eq!(trim_partial_char("abé".as_bytes()), "abé".as_bytes());
        assert_eq!(trim_partial_char(&"ab€".as_bytes()[..4]), b"ab");
        assert_eq!(trim_partial_char(b""), b"");
    }

    #[test]
    fn marker_uses_megabytes_for_round_caps() {
        assert_eq!(
            truncation_marker(1_048_576),
            "\n... [output truncated at 1MB]"
        );
    }
}
