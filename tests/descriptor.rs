//! Descriptor inspection through the public API

use std::collections::HashMap;

use serde_bencode::value::Value;
use rustorrent::TorrentInfo;

fn bval(s: &str) -> Value {
    Value::Bytes(s.as_bytes().to_vec())
}

fn dict(entries: Vec<(&str, Value)>) -> Value {
    let map: HashMap<Vec<u8>, Value> = entries
        .into_iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v))
        .collect();
    Value::Dict(map)
}

fn build_descriptor() -> Vec<u8> {
    let files = Value::List(vec![
        dict(vec![
            ("length", Value::Int(16_384)),
            ("path", Value::List(vec![bval("a.bin")])),
        ]),
        dict(vec![
            ("length", Value::Int(16_384)),
            ("path", Value::List(vec![bval("sub"), bval("b.bin")])),
        ]),
    ]);
    let info = dict(vec![
        ("name", bval("bundle")),
        ("files", files),
        ("piece length", Value::Int(16_384)),
        ("pieces", Value::Bytes(vec![0x11; 2 * 20])),
        ("private", Value::Int(1)),
    ]);
    let torrent = dict(vec![
        ("info", info),
        ("announce", bval("http://tracker.example/announce")),
        (
            "url-list",
            Value::List(vec![bval("http://mirror.example/bundle/")]),
        ),
        ("comment", bval("integration fixture")),
        ("created by", bval("rustorrent tests")),
        ("creation date", Value::Int(1_700_000_000)),
    ]);
    serde_bencode::to_bytes(&torrent).unwrap()
}

#[test]
fn inspect_descriptor_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.torrent");
    std::fs::write(&path, build_descriptor()).unwrap();

    let info = TorrentInfo::from_file(&path).unwrap();
    assert_eq!(info.name, "bundle");
    assert_eq!(info.num_files, 2);
    assert_eq!(info.total_size, 32_768);
    assert_eq!(info.num_pieces, 2);
    assert!(info.private);
    assert!(info.is_valid);
    assert_eq!(info.comment.as_deref(), Some("integration fixture"));
    assert_eq!(info.creator.as_deref(), Some("rustorrent tests"));
    assert_eq!(info.creation_date, Some(1_700_000_000));
    assert_eq!(info.web_seeds, vec!["http://mirror.example/bundle/"]);
    assert_eq!(info.trackers.len(), 1);

    assert_eq!(info.files[0].path, "a.bin");
    assert_eq!(info.files[1].path, "sub/b.bin");
    assert_eq!(info.files[1].file_name, "b.bin");
    assert_eq!(info.files[1].offset, 16_384);
}

#[test]
fn records_serialize_to_json() {
    let info = TorrentInfo::from_bytes(&build_descriptor()).unwrap();
    let json = serde_json::to_string(&info).unwrap();
    let parsed: TorrentInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, info);
}
