//! An ordered (URI, time) catalog of captures across WARC files.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::header::{HeaderMap, HeaderParser};

use super::record::strip_uri_brackets;
use super::{Record, WARCError, WARCReader};

/// One indexed observation of a URI inside a WARC file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Target URI exactly as captured, with angle brackets stripped.
    pub target_uri: String,
    /// Capture timestamp.
    pub instant: DateTime<Utc>,
    /// Path of the WARC file the capture was read from.
    pub file_path: PathBuf,
    /// Byte offset of the record within `file_path`.
    pub offset: u64,
    sequence: u64,
}

impl Capture {
    /// The string used to order and group captures. Defined as the target
    /// URI verbatim (after angle-bracket stripping); no further
    /// canonicalization is performed.
    pub fn uri_key(&self) -> &str {
        &self.target_uri
    }
}

/// An ordered set of [Capture]s, sorted by `(uri_key, instant)` with ties
/// broken by insertion order, supporting URI-range queries and entrypoint
/// detection.
#[derive(Debug, Default)]
pub struct CaptureIndex {
    captures: Vec<Capture>,
    entrypoint: Option<Capture>,
    next_sequence: u64,
}

impl CaptureIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of captures held by the index.
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// Whether the index holds no captures.
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Inserts a capture, maintaining `(uri_key, instant)` ascending order
    /// with ties broken by insertion order.
    ///
    /// `is_html_candidate` marks whether this capture is eligible to become
    /// the entrypoint; the first candidate inserted becomes the entrypoint
    /// and is never displaced.
    pub fn insert(&mut self, target_uri: String, instant: DateTime<Utc>, file_path: PathBuf, offset: u64, is_html_candidate: bool) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let capture = Capture {
            target_uri,
            instant,
            file_path,
            offset,
            sequence,
        };

        if is_html_candidate && self.entrypoint.is_none() {
            self.entrypoint = Some(capture.clone());
        }

        let position = self.captures.partition_point(|existing| {
            (existing.uri_key(), existing.instant, existing.sequence)
                < (capture.uri_key(), capture.instant, capture.sequence)
        });
        self.captures.insert(position, capture);
    }

    /// Returns every capture whose uri-key equals `uri`'s uri-key, in
    /// ascending time order.
    pub fn query(&self, uri: &str) -> &[Capture] {
        let key = strip_uri_brackets(uri);

        let start = self
            .captures
            .partition_point(|capture| capture.uri_key() < key);
        let end = self
            .captures
            .partition_point(|capture| capture.uri_key() <= key);

        &self.captures[start..end]
    }

    /// Returns the first indexed HTML capture, if any.
    pub fn entrypoint(&self) -> Option<&Capture> {
        self.entrypoint.as_ref()
    }

    /// Streams a WARC file and indexes every `response`/`resource` record
    /// whose target URI scheme is `http` or `https`.
    ///
    /// Malformed files are reported as an error; callers that want
    /// log-and-skip behavior across many files should catch the error per
    /// file and continue with the next one, per the crate's propagation
    /// policy.
    pub fn index_file(&mut self, path: impl AsRef<Path>) -> Result<(), WARCError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = WARCReader::new(file)?;

        while let Some(metadata) = reader.begin_record()? {
            let version = metadata.version().to_string();
            let fields = metadata.header().clone();
            let offset = metadata.file_offset();

            let record = Record::from_fields(version, fields)?;
            let mut block = reader.read_block();

            let payload_content_type = if record.is_capture() {
                read_payload_content_type(&record, &mut block)?
            } else {
                None
            };

            let mut sink = std::io::sink();
            std::io::copy(&mut block, &mut sink)?;
            reader.end_record(block)?;

            if !record.is_capture() {
                continue;
            }

            let target_uri = match record.header().target_uri()? {
                Some(uri) => uri.to_string(),
                None => continue,
            };

            if !has_http_scheme(&target_uri) {
                continue;
            }

            let instant = record.header().date()?;
            let is_html = payload_content_type.as_deref() == Some("text/html");

            self.insert(target_uri, instant, path.to_path_buf(), offset, is_html);
        }

        Ok(())
    }
}

fn has_http_scheme(uri: &str) -> bool {
    let scheme = uri.split_once(':').map(|(scheme, _)| scheme).unwrap_or("");
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

/// Determines the payload content type of a capture record's body.
///
/// `resource` records (and any record not wrapping an HTTP message) report
/// their own `Content-Type` directly. `response`/`request` records whose
/// `Content-Type` is `application/http` carry the real payload type inside
/// the embedded HTTP message's own header block, which is read here without
/// buffering the rest of the body.
fn read_payload_content_type<R: Read>(
    record: &Record,
    block: &mut R,
) -> Result<Option<String>, WARCError> {
    let outer_content_type = record.header().content_type()?;

    if outer_content_type != Some("application/http") {
        return Ok(outer_content_type.map(str::to_string));
    }

    let mut header_bytes = Vec::new();
    let mut byte = [0u8; 1];
    let mut seen_blank_line = false;

    loop {
        let n = block.read(&mut byte)?;
        if n == 0 {
            break;
        }

        header_bytes.push(byte[0]);

        if header_bytes.ends_with(b"\r\n\r\n") {
            seen_blank_line = true;
            break;
        }
    }

    if !seen_blank_line {
        return Ok(None);
    }

    let body_headers = match parse_embedded_headers(&header_bytes) {
        Some(headers) => headers,
        None => return Ok(None),
    };

    Ok(body_headers
        .get_str("Content-Type")
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string()))
}

fn parse_embedded_headers(header_bytes: &[u8]) -> Option<HeaderMap> {
    let header_block = skip_request_or_status_line(header_bytes)?;
    HeaderParser::new().parse_header(header_block).ok()
}

fn skip_request_or_status_line(input: &[u8]) -> Option<&[u8]> {
    let position = input.windows(2).position(|window| window == b"\r\n")?;
    Some(&input[position + 2..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_index_ordering() {
        let mut index = CaptureIndex::new();

        index.insert(
            "http://a/".to_string(),
            datetime("2020-01-02T00:00:00Z"),
            PathBuf::from("a.warc"),
            0,
            false,
        );
        index.insert(
            "http://a/".to_string(),
            datetime("2020-01-01T00:00:00Z"),
            PathBuf::from("a.warc"),
            100,
            false,
        );
        index.insert(
            "http://a/".to_string(),
            datetime("2020-01-03T00:00:00Z"),
            PathBuf::from("a.warc"),
            200,
            false,
        );

        let results = index.query("http://a/");
        let instants: Vec<_> = results.iter().map(|c| c.instant).collect();

        assert_eq!(
            instants,
            vec![
                datetime("2020-01-01T00:00:00Z"),
                datetime("2020-01-02T00:00:00Z"),
                datetime("2020-01-03T00:00:00Z"),
            ]
        );
    }

    #[test]
    fn test_query_does_not_match_other_uris() {
        let mut index = CaptureIndex::new();
        index.insert(
            "http://a/".to_string(),
            datetime("2020-01-01T00:00:00Z"),
            PathBuf::from("a.warc"),
            0,
            false,
        );
        index.insert(
            "http://b/".to_string(),
            datetime("2020-01-01T00:00:00Z"),
            PathBuf::from("a.warc"),
            10,
            false,
        );

        assert_eq!(index.query("http://a/").len(), 1);
        assert_eq!(index.query("http://b/").len(), 1);
        assert_eq!(index.query("http://c/").len(), 0);
    }

    #[test]
    fn test_uri_key_is_not_canonicalized() {
        let mut index = CaptureIndex::new();
        index.insert(
            "http://Example.org/".to_string(),
            datetime("2020-01-01T00:00:00Z"),
            PathBuf::from("a.warc"),
            0,
            false,
        );

        assert_eq!(index.query("http://Example.org/").len(), 1);
        assert_eq!(index.query("http://example.org/").len(), 0);
    }

    #[test]
    fn test_entrypoint_determinism() {
        let mut index = CaptureIndex::new();

        index.insert(
            "http://x/".to_string(),
            datetime("2020-01-01T00:00:00Z"),
            PathBuf::from("a.warc"),
            0,
            false,
        );
        index.insert(
            "http://y/".to_string(),
            datetime("2020-01-01T00:00:01Z"),
            PathBuf::from("a.warc"),
            10,
            true,
        );
        index.insert(
            "http://z/".to_string(),
            datetime("2020-01-01T00:00:02Z"),
            PathBuf::from("a.warc"),
            20,
            true,
        );

        let entrypoint = index.entrypoint().unwrap();
        assert_eq!(entrypoint.target_uri, "http://y/");
    }
}
