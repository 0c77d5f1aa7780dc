use std::fs::File;
use std::io::{BufReader, Write};

use serde_json::{json, Value as JsonValue};
use strata::metadata::{read_preamble, write_preamble, StreamMetadata};
use strata::{
    deserialize_next_record, record_to_json, serialize_end_of_stream, serialize_record, NextRecord,
    SchemaTree, SerializationBuffer,
};

fn fixture_records() -> Vec<JsonValue> {
    vec![
        json!({"ts": 1706000001, "level": "INFO", "msg": "service started on port 8080"}),
        json!({"ts": 1706000002, "level": "WARN", "msg": "retrying request 2 of 5", "ctx": {"attempt": 2, "backoff_ms": 250.0}}),
        json!({"ts": 1706000003, "level": "INFO", "msg": "request finished", "ctx": {"attempt": 3, "backoff_ms": 500.0}}),
        json!({}),
        json!({"ts": 1706000004, "tags": ["slow", "db"], "extra": {}}),
    ]
}

#[test]
fn stream_appended_to_a_file_reads_back_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.ir");

    let records = fixture_records();
    {
        let mut metadata = StreamMetadata::default();
        metadata.time_zone_id = Some("UTC".into());

        let mut preamble = Vec::new();
        write_preamble(&metadata, &mut preamble).unwrap();

        let mut file = File::create(&path).unwrap();
        file.write_all(&preamble).unwrap();

        // Flush after every record, the way a producer appending to a live
        // stream would.
        let mut buf = SerializationBuffer::new();
        for record in &records {
            serialize_record(record, &mut buf).unwrap();
            file.write_all(buf.out()).unwrap();
            buf.flush_out();
        }
        serialize_end_of_stream(&mut buf);
        file.write_all(buf.out()).unwrap();
    }

    let mut reader = BufReader::new(File::open(&path).unwrap());
    let metadata = read_preamble(&mut reader).unwrap();
    assert_eq!(metadata.time_zone_id.as_deref(), Some("UTC"));

    let mut tree = SchemaTree::new();
    let mut schema = Vec::new();
    let mut values = Vec::new();
    let mut decoded = Vec::new();
    loop {
        match deserialize_next_record(&mut reader, &mut tree, &mut schema, &mut values).unwrap() {
            NextRecord::EndOfStream => break,
            NextRecord::Record => {
                let line = record_to_json(&tree, &schema, &values).unwrap();
                decoded.push(serde_json::from_str::<JsonValue>(&line).unwrap());
            }
        }
    }

    assert_eq!(decoded, records);
    // Both sides converged on the same schema: root plus ts, level, msg,
    // ctx, attempt, backoff_ms, tags, extra.
    assert_eq!(tree.size(), 9);
}
