use std::io::Write;

use crate::{
    error::RuntimeError,
    interpreter::evaluator::command::core::cmd_err,
    interpreter::value::{Value, stream::to_stream},
};

/// The `sniff` command inspects the first 512 bytes of a stream and returns
/// the detected content type as a string. The stream is rewound afterwards.
pub fn sniff(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let stream = to_stream(&args[0]).map_err(|err| cmd_err(cmd, err))?;

    let head = stream.read_at_most(512).map_err(|err| cmd_err(cmd, err))?;
    stream.rewind().map_err(|err| cmd_err(cmd, err))?;

    Ok(Some(Value::Str(detect_content_type(&head).to_string())))
}

/// Detects the content type of the given data, considering at most its
/// first 512 bytes. The algorithm follows the WHATWG mime-sniffing
/// signatures, falling back to a plain-text or binary guess.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = if data.len() > 512 { &data[..512] } else { data };

    // Leading whitespace is ignored for the tag-based signatures.
    let trimmed = {
        let start = data
            .iter()
            .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
            .unwrap_or(data.len());
        &data[start..]
    };

    const HTML_TAGS: &[&str] = &[
        "<!DOCTYPE HTML",
        "<HTML",
        "<HEAD",
        "<SCRIPT",
        "<IFRAME",
        "<H1",
        "<DIV",
        "<FONT",
        "<TABLE",
        "<A",
        "<STYLE",
        "<TITLE",
        "<B",
        "<BODY",
        "<BR",
        "<P",
        "<!--",
    ];

    for tag in HTML_TAGS {
        if let Some(rest) = match_ignore_case(trimmed, tag) {
            // A tag signature must be terminated by a space or bracket.
            if matches!(rest.first(), Some(b' ' | b'>')) {
                return "text/html; charset=utf-8";
            }
        }
    }

    if match_ignore_case(trimmed, "<?xml").is_some() {
        return "text/xml; charset=utf-8";
    }

    if data.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    if data.starts_with(b"%!PS-Adobe-") {
        return "application/postscript";
    }
    if data.starts_with(&[0xef, 0xbb, 0xbf]) {
        return "text/plain; charset=utf-8";
    }
    if data.starts_with(&[0xfe, 0xff]) {
        return "text/plain; charset=utf-16be";
    }
    if data.starts_with(&[0xff, 0xfe]) {
        return "text/plain; charset=utf-16le";
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if data.starts_with(&[0xff, 0xd8, 0xff]) {
        return "image/jpeg";
    }
    if data.len() >= 14 && &data[..4] == b"RIFF" && &data[8..14] == b"WEBPVP" {
        return "image/webp";
    }
    if data.starts_with(b"BM") {
        return "image/bmp";
    }
    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WAVE" {
        return "audio/wave";
    }
    if data.starts_with(b"OggS") {
        return "application/ogg";
    }
    if data.starts_with(b"ID3") {
        return "audio/mpeg";
    }
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        return "video/mp4";
    }
    if data.starts_with(b"PK\x03\x04") {
        return "application/zip";
    }
    if data.starts_with(&[0x1f, 0x8b, 0x08]) {
        return "application/x-gzip";
    }
    if data.starts_with(b"Rar!\x1a\x07") {
        return "application/x-rar-compressed";
    }
    if data.starts_with(b"wOFF") {
        return "font/woff";
    }
    if data.starts_with(b"wOF2") {
        return "font/woff2";
    }

    // Data with no binary control bytes reads as text.
    let binary = data.iter().any(|&b| {
        (b <= 0x08) || b == 0x0b || (0x0e..=0x1a).contains(&b) || (0x1c..=0x1f).contains(&b)
    });

    if binary {
        return "application/octet-stream";
    }
    "text/plain; charset=utf-8"
}

/// Matches the given prefix case-insensitively, returning the remainder of
/// the data after it.
fn match_ignore_case<'a>(data: &'a [u8], prefix: &str) -> Option<&'a [u8]> {
    let prefix = prefix.as_bytes();

    if data.len() < prefix.len() {
        return None;
    }

    let matches = data
        .iter()
        .zip(prefix)
        .all(|(a, b)| a.eq_ignore_ascii_case(b));

    if !matches {
        return None;
    }
    Some(&data[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_html_documents() {
        assert_eq!(
            detect_content_type(b"\n\t<!doctype html><html><body>hi</body></html>"),
            "text/html; charset=utf-8"
        );
        assert_eq!(detect_content_type(b"<HTML ></HTML>"), "text/html; charset=utf-8");
    }

    #[test]
    fn detects_common_binary_signatures() {
        assert_eq!(detect_content_type(b"\x89PNG\r\n\x1a\nrest"), "image/png");
        assert_eq!(detect_content_type(b"%PDF-1.7 ..."), "application/pdf");
        assert_eq!(detect_content_type(b"PK\x03\x04...."), "application/zip");
        assert_eq!(detect_content_type(&[0x1f, 0x8b, 0x08, 0x00]), "application/x-gzip");
    }

    #[test]
    fn plain_text_and_binary_fallbacks() {
        assert_eq!(detect_content_type(b"just some text"), "text/plain; charset=utf-8");
        assert_eq!(detect_content_type(&[0x00, 0x01, 0x02]), "application/octet-stream");
    }

    #[test]
    fn sniff_rewinds_the_stream() {
        use crate::interpreter::value::stream::BufStream;

        let val = BufStream::new(&b"<html ><body></body></html>"[..]).into_value();
        let mut out = Vec::new();

        let mime = sniff(&mut out, "sniff", vec![val.clone()]).unwrap().unwrap();
        assert_eq!(mime.sprint(), "text/html; charset=utf-8");

        // The full contents are still readable after sniffing.
        assert_eq!(val.sprint(), "<html ><body></body></html>");
    }
}
