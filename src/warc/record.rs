//! Typed WARC record variants and their well-known field accessors.

use chrono::{DateTime, Utc};

use crate::header::HeaderMap;

use super::{HeaderMapExt, WARCError};

/// A single digest value in `algorithm:base32value` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Digest algorithm name (e.g. `sha1`), as written in the field.
    pub algorithm: String,
    /// Decoded digest bytes.
    pub value: Vec<u8>,
}

impl std::str::FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (algorithm, encoded) = input.split_once(':').ok_or(DigestParseError)?;

        if algorithm.is_empty() || encoded.is_empty() {
            return Err(DigestParseError);
        }

        let trimmed = encoded.trim_end_matches('=');
        let value = data_encoding::BASE32_NOPAD
            .decode(trimmed.as_bytes())
            .map_err(|_| DigestParseError)?;

        Ok(Digest {
            algorithm: algorithm.to_string(),
            value,
        })
    }
}

/// Error parsing a [Digest] field.
#[derive(Debug, thiserror::Error)]
#[error("malformed digest value")]
pub struct DigestParseError;

/// `WARC-Truncated` reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncatedReason {
    /// Truncated because the record reached a length limit.
    Length,
    /// Truncated because of a time limit.
    Time,
    /// Truncated because the network connection was lost.
    Disconnect,
    /// Truncated for an unspecified reason.
    Unspecified,
}

impl std::str::FromStr for TruncatedReason {
    type Err = TruncatedReasonParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "length" => Ok(TruncatedReason::Length),
            "time" => Ok(TruncatedReason::Time),
            "disconnect" => Ok(TruncatedReason::Disconnect),
            "unspecified" => Ok(TruncatedReason::Unspecified),
            _ => Err(TruncatedReasonParseError),
        }
    }
}

/// Error parsing a [TruncatedReason].
#[derive(Debug, thiserror::Error)]
#[error("unrecognized WARC-Truncated reason")]
pub struct TruncatedReasonParseError;

/// Strips the WARC serialization convention of surrounding angle brackets
/// from a URI-like field value. Does not perform any other canonicalization.
pub fn strip_uri_brackets(value: &str) -> &str {
    if value.starts_with('<') && value.ends_with('>') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Common carrier shared by every record kind: the protocol version and the
/// parsed header fields, plus typed accessors for the well-known fields.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    version: String,
    fields: HeaderMap,
}

impl RecordHeader {
    /// Creates a `RecordHeader` from a version token and a parsed header map.
    pub fn new(version: impl Into<String>, fields: HeaderMap) -> Self {
        Self {
            version: version.into(),
            fields,
        }
    }

    /// Returns the record's protocol version (e.g. `WARC/1.1`).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the underlying header field map.
    pub fn fields(&self) -> &HeaderMap {
        &self.fields
    }

    /// Returns the underlying header field map mutably.
    pub fn fields_mut(&mut self) -> &mut HeaderMap {
        &mut self.fields
    }

    /// Returns the record's ID with the surrounding angle brackets stripped.
    pub fn record_id(&self) -> Result<&str, WARCError> {
        self.fields
            .get_required("WARC-Record-ID")
            .map(strip_uri_brackets)
    }

    /// Returns the record's type tag, exactly as written (e.g. `response`).
    pub fn record_type(&self) -> Result<&str, WARCError> {
        self.fields.get_required("WARC-Type")
    }

    /// Returns the record's timestamp.
    pub fn date(&self) -> Result<DateTime<Utc>, WARCError> {
        self.fields.get_parsed_required("WARC-Date")
    }

    /// Returns the declared body length.
    pub fn content_length(&self) -> Result<u64, WARCError> {
        self.fields.get_parsed_required("Content-Length")
    }

    /// Returns the target URI, with angle brackets stripped, if present.
    pub fn target_uri(&self) -> Result<Option<&str>, WARCError> {
        Ok(self
            .fields
            .get_sole("WARC-Target-URI")?
            .map(strip_uri_brackets))
    }

    /// Returns the content type of the body, excluding any parameters.
    pub fn content_type(&self) -> Result<Option<&str>, WARCError> {
        Ok(self
            .fields
            .get_sole("Content-Type")?
            .map(|value| value.split(';').next().unwrap_or(value).trim()))
    }

    /// Returns the truncation reason, or `None` if the record is not truncated.
    pub fn truncated(&self) -> Result<Option<TruncatedReason>, WARCError> {
        self.fields.get_parsed("WARC-Truncated")
    }

    /// Returns the 1-based segment number of a segmented record.
    pub fn segment_number(&self) -> Result<Option<u64>, WARCError> {
        self.fields.get_parsed("WARC-Segment-Number")
    }

    /// Returns the record-ID referred to by this record, if any.
    pub fn refers_to(&self) -> Result<Option<&str>, WARCError> {
        Ok(self.fields.get_sole("WARC-Refers-To")?.map(strip_uri_brackets))
    }

    /// Returns the payload digest, if present.
    pub fn payload_digest(&self) -> Result<Option<Digest>, WARCError> {
        self.parse_sole_digest("WARC-Payload-Digest")
    }

    /// Returns the block digest, if present.
    pub fn block_digest(&self) -> Result<Option<Digest>, WARCError> {
        self.parse_sole_digest("WARC-Block-Digest")
    }

    /// Returns the revisit profile URI, if present.
    pub fn profile(&self) -> Result<Option<&str>, WARCError> {
        self.fields.get_sole("WARC-Profile")
    }

    fn parse_sole_digest(&self, name: &str) -> Result<Option<Digest>, WARCError> {
        match self.fields.get_sole(name)? {
            Some(text) => text
                .parse::<Digest>()
                .map(Some)
                .map_err(|error| WARCError::InvalidFieldValue {
                    name: name.to_string(),
                    record_id: self.record_id().unwrap_or_default().to_string(),
                    source: Some(Box::new(error)),
                }),
            None => Ok(None),
        }
    }
}

/// A WARC record with its type-specific semantics made explicit.
///
/// Construction dispatches on `WARC-Type`; unrecognized tags are preserved
/// as [Record::Unknown] so forward-compatible readers never fail outright.
#[derive(Debug, Clone)]
pub enum Record {
    /// `warcinfo`: per-file metadata about the writing crawler/tool.
    WarcInfo(RecordHeader),
    /// `request`: a captured outgoing request.
    Request(RecordHeader),
    /// `response`: a captured incoming response.
    Response(RecordHeader),
    /// `resource`: a captured resource not transported as an HTTP message.
    Resource(RecordHeader),
    /// `revisit`: a reference to content already captured elsewhere.
    Revisit(RecordHeader),
    /// `conversion`: an alternative/derived form of another record's content.
    Conversion(RecordHeader),
    /// `continuation`: a later segment of a record split across files.
    Continuation(RecordHeader),
    /// `metadata`: descriptive information about another record.
    Metadata(RecordHeader),
    /// A record whose `WARC-Type` is not one of the known kinds.
    Unknown(String, RecordHeader),
}

impl Record {
    /// Builds the typed variant for the given version and header fields by
    /// dispatching on the `WARC-Type` field.
    pub fn from_fields(version: impl Into<String>, fields: HeaderMap) -> Result<Self, WARCError> {
        let header = RecordHeader::new(version, fields);
        let record_type = header.record_type()?.to_string();

        Ok(match record_type.as_str() {
            "warcinfo" => Record::WarcInfo(header),
            "request" => Record::Request(header),
            "response" => Record::Response(header),
            "resource" => Record::Resource(header),
            "revisit" => Record::Revisit(header),
            "conversion" => Record::Conversion(header),
            "continuation" => Record::Continuation(header),
            "metadata" => Record::Metadata(header),
            _ => Record::Unknown(record_type, header),
        })
    }

    /// Returns the common header carrier regardless of record kind.
    pub fn header(&self) -> &RecordHeader {
        match self {
            Record::WarcInfo(header)
            | Record::Request(header)
            | Record::Response(header)
            | Record::Resource(header)
            | Record::Revisit(header)
            | Record::Conversion(header)
            | Record::Continuation(header)
            | Record::Metadata(header)
            | Record::Unknown(_, header) => header,
        }
    }

    /// Returns the `WARC-Type` tag, exactly as matched during dispatch.
    pub fn type_tag(&self) -> &str {
        match self {
            Record::WarcInfo(_) => "warcinfo",
            Record::Request(_) => "request",
            Record::Response(_) => "response",
            Record::Resource(_) => "resource",
            Record::Revisit(_) => "revisit",
            Record::Conversion(_) => "conversion",
            Record::Continuation(_) => "continuation",
            Record::Metadata(_) => "metadata",
            Record::Unknown(tag, _) => tag,
        }
    }

    /// Returns whether this record kind is expected to carry a `WARC-Target-URI`.
    pub fn is_capture(&self) -> bool {
        matches!(
            self,
            Record::Response(_) | Record::Resource(_) | Record::Revisit(_)
        )
    }
}
