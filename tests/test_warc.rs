use std::io::{Cursor, Read, Write};

use warcaves::header::HeaderMap;
use warcaves::warc::{CaptureIndex, Record, RecordBuilder, RecordReader, WARCReader, WARCWriter};

fn write_minimal_warc() -> Vec<u8> {
    let mut output = Vec::new();
    let mut writer = WARCWriter::new(Cursor::new(&mut output));

    let mut header = HeaderMap::new();
    header.insert("WARC-Type", "resource");
    header.insert("WARC-Date", "2000-12-30T01:02:03Z");
    header.insert(
        "WARC-Record-ID",
        "<urn:uuid:00000001-0002-0003-0004-000000000005>",
    );
    header.insert("Content-Length", "10");

    writer.begin_record(&header).unwrap();
    let mut block_writer = writer.write_block();
    block_writer
        .write_all(b"\xf0\xf1\xf2\xf3\xf4\xf5\xf6\xf7\xf8\xf9")
        .unwrap();
    writer.end_record().unwrap();

    let mut header = HeaderMap::new();
    header.insert("WARC-Type", "resource");
    header.insert("WARC-Date", "2001-12-30T01:02:03Z");
    header.insert(
        "WARC-Record-ID",
        "<urn:uuid:10000001-0002-0003-0004-000000000005>",
    );
    header.insert("Content-Length", "16");

    writer.begin_record(&header).unwrap();
    let mut block_writer = writer.write_block();
    block_writer
        .write_all(b"\xf0\xf1\xf2\xf3\xf4\xf5\xf6\xf7\xf8\xf9\xfa\xfb\xfc\xfd\xfe\xff")
        .unwrap();
    writer.end_record().unwrap();

    drop(writer);
    output
}

#[test]
fn minimal_warc_read() {
    let bytes = write_minimal_warc();
    let mut reader = WARCReader::new(Cursor::new(bytes)).unwrap();

    let metadata = reader.begin_record().unwrap().unwrap();

    assert_eq!(metadata.version(), "WARC/1.1");
    assert_eq!(metadata.file_offset(), 0);
    assert_eq!(metadata.block_length(), 10);
    assert_eq!(
        metadata.header().get_str("WARC-Record-ID").unwrap(),
        "<urn:uuid:00000001-0002-0003-0004-000000000005>"
    );

    let mut block_buf = Vec::new();
    let mut block_reader = reader.read_block();
    block_reader.read_to_end(&mut block_buf).unwrap();

    assert_eq!(block_buf, b"\xf0\xf1\xf2\xf3\xf4\xf5\xf6\xf7\xf8\xf9");

    reader.end_record(block_reader).unwrap();

    let metadata = reader.begin_record().unwrap().unwrap();
    assert_eq!(
        metadata.header().get_str("WARC-Record-ID").unwrap(),
        "<urn:uuid:10000001-0002-0003-0004-000000000005>"
    );

    let mut block_reader = reader.read_block();
    let mut block_buf = Vec::new();
    block_reader.read_to_end(&mut block_buf).unwrap();
    reader.end_record(block_reader).unwrap();

    assert!(reader.begin_record().unwrap().is_none());
}

#[test]
fn record_reader_auto_drains_unread_body() {
    let bytes = write_minimal_warc();
    let mut reader = RecordReader::new(Cursor::new(bytes)).unwrap();

    let first = reader.next_record().unwrap().unwrap();
    assert!(matches!(first, Record::Resource(_)));
    assert_eq!(reader.position(), 0);
    // deliberately do not read the body here

    let second = reader.next_record().unwrap().unwrap();
    assert_eq!(
        second.header().record_id().unwrap(),
        "urn:uuid:10000001-0002-0003-0004-000000000005"
    );

    let mut body = Vec::new();
    reader.body().read_to_end(&mut body).unwrap();
    assert_eq!(
        body,
        b"\xf0\xf1\xf2\xf3\xf4\xf5\xf6\xf7\xf8\xf9\xfa\xfb\xfc\xfd\xfe\xff"
    );

    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn end_to_end_response_round_trip() {
    let mut buffer = Vec::new();
    let mut writer = WARCWriter::new(Cursor::new(&mut buffer));

    RecordBuilder::new("response")
        .target_uri("http://example.org/")
        .body("text/plain", b"OK".to_vec())
        .write(&mut writer)
        .unwrap();

    drop(writer);

    let mut reader = RecordReader::new(Cursor::new(buffer)).unwrap();
    let record = reader.next_record().unwrap().unwrap();

    assert_eq!(record.type_tag(), "response");
    assert_eq!(
        record.header().target_uri().unwrap(),
        Some("http://example.org/")
    );
    assert_eq!(record.header().content_length().unwrap(), 2);

    let mut body = Vec::new();
    reader.body().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"OK");

    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn capture_index_end_to_end_across_a_file() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!(
        "warcaves-test-{}-{}.warc",
        std::process::id(),
        std::ptr::addr_of!(dir) as usize
    ));

    {
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = WARCWriter::new(file);

        RecordBuilder::new("response")
            .target_uri("http://x.example/")
            .body("image/png", b"\x89PNG".to_vec())
            .write(&mut writer)
            .unwrap();

        RecordBuilder::new("response")
            .target_uri("http://y.example/")
            .body("text/html", b"<html></html>".to_vec())
            .write(&mut writer)
            .unwrap();

        RecordBuilder::new("response")
            .target_uri("http://y.example/")
            .body("text/html", b"<html>v2</html>".to_vec())
            .write(&mut writer)
            .unwrap();
    }

    let mut index = CaptureIndex::new();
    index.index_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(index.len(), 3);
    assert_eq!(index.query("http://y.example/").len(), 2);
    assert_eq!(index.entrypoint().unwrap().target_uri, "http://y.example/");
}
