//! Fluent record construction atop [WARCWriter].

use std::io::Write;

use chrono::{SecondsFormat, Utc};

use crate::header::HeaderMap;

use super::record::Digest;
use super::{TruncatedReason, WARCError, WARCWriter};

/// Builds a single WARC record with mandatory defaults, ready to be handed
/// to a [WARCWriter].
///
/// A fresh builder always carries a generated `WARC-Record-ID`, a `WARC-Date`
/// of "now", and `Content-Length: 0`; [RecordBuilder::body] is the usual way
/// to replace the length and attach a payload.
pub struct RecordBuilder {
    fields: HeaderMap,
    body: Vec<u8>,
}

impl RecordBuilder {
    /// Starts a builder for the given `WARC-Type` tag (e.g. `response`).
    pub fn new(record_type: impl Into<String>) -> Self {
        let mut fields = HeaderMap::new();

        fields.insert("WARC-Type", record_type.into());
        fields.insert(
            "WARC-Record-ID",
            format!("<urn:uuid:{}>", crate::uuid::new_v7()),
        );
        fields.insert(
            "WARC-Date",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        fields.insert("Content-Length", "0");

        Self {
            fields,
            body: Vec::new(),
        }
    }

    /// Sets the target URI of a capture record.
    pub fn target_uri(mut self, uri: impl AsRef<str>) -> Self {
        self.fields
            .insert("WARC-Target-URI", format!("<{}>", uri.as_ref()));
        self
    }

    /// Sets the record-ID this record refers to (revisit, conversion, metadata).
    pub fn refers_to(mut self, record_id: impl AsRef<str>) -> Self {
        self.fields
            .insert("WARC-Refers-To", format!("<{}>", record_id.as_ref()));
        self
    }

    /// Sets the truncation reason.
    pub fn truncated(mut self, reason: TruncatedReason) -> Self {
        let text = match reason {
            TruncatedReason::Length => "length",
            TruncatedReason::Time => "time",
            TruncatedReason::Disconnect => "disconnect",
            TruncatedReason::Unspecified => "unspecified",
        };
        self.fields.insert("WARC-Truncated", text);
        self
    }

    /// Sets the 1-based segment number of a segmented record.
    pub fn segment_number(mut self, number: u64) -> Self {
        self.fields
            .insert("WARC-Segment-Number", number.to_string());
        self
    }

    /// Sets the revisit profile URI.
    pub fn profile(mut self, uri: impl AsRef<str>) -> Self {
        self.fields.insert("WARC-Profile", uri.as_ref().to_string());
        self
    }

    /// Sets the payload digest.
    pub fn payload_digest(mut self, digest: &Digest) -> Self {
        self.fields
            .insert("WARC-Payload-Digest", format_digest(digest));
        self
    }

    /// Sets the block digest.
    pub fn block_digest(mut self, digest: &Digest) -> Self {
        self.fields
            .insert("WARC-Block-Digest", format_digest(digest));
        self
    }

    /// Sets an arbitrary header field, overwriting any existing value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Attaches the body content, updating `Content-Type` and
    /// `Content-Length` to match.
    pub fn body(mut self, content_type: impl AsRef<str>, content: impl Into<Vec<u8>>) -> Self {
        self.body = content.into();
        self.fields.insert("Content-Type", content_type.as_ref().to_string());
        self.fields
            .insert("Content-Length", self.body.len().to_string());
        self
    }

    /// Returns the header fields as they currently stand.
    pub fn fields(&self) -> &HeaderMap {
        &self.fields
    }

    /// Serializes this record to the given writer.
    ///
    /// Raises [WARCError::WrongBlockLength] if `Content-Length` does not
    /// match the attached body length.
    pub fn write<S: Write>(self, writer: &mut WARCWriter<S>) -> Result<(), WARCError> {
        writer.begin_record(&self.fields)?;

        {
            let mut block = writer.write_block();
            block.write_all(&self.body)?;
        }

        writer.end_record()
    }
}

fn format_digest(digest: &Digest) -> String {
    format!(
        "{}:{}",
        digest.algorithm,
        data_encoding::BASE32_NOPAD.encode(&digest.value)
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::warc::{HeaderMapExt, Record, WARCReader};

    use super::*;

    #[test]
    fn test_record_id_format() {
        let builder = RecordBuilder::new("warcinfo");
        let record_id = builder.fields().get_required("WARC-Record-ID").unwrap();

        let re_ish = record_id.trim_start_matches("<urn:uuid:").trim_end_matches('>');
        assert_eq!(re_ish.len(), 36);
        assert!(re_ish.chars().all(|c| c.is_ascii_hexdigit() || c == '-'));
    }

    #[test]
    fn test_end_to_end_response() {
        let mut buffer = Vec::new();
        let mut writer = WARCWriter::new(Cursor::new(&mut buffer));

        RecordBuilder::new("response")
            .target_uri("http://example.org/")
            .body("text/plain", b"OK".to_vec())
            .write(&mut writer)
            .unwrap();

        drop(writer);

        let mut reader = WARCReader::new(Cursor::new(buffer)).unwrap();
        let metadata = reader.begin_record().unwrap().unwrap();
        let record = Record::from_fields(metadata.version(), metadata.header().clone()).unwrap();

        assert_eq!(record.type_tag(), "response");
        assert_eq!(
            record.header().target_uri().unwrap(),
            Some("http://example.org/")
        );
        assert_eq!(record.header().content_length().unwrap(), 2);

        let mut block = reader.read_block();
        let mut body = Vec::new();
        std::io::Read::read_to_end(&mut block, &mut body).unwrap();
        reader.end_record(block).unwrap();

        assert_eq!(body, b"OK");
        assert!(reader.begin_record().unwrap().is_none());
    }
}
