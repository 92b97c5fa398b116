//! Reading synthetic files end to end
//!
//! These tests build small files in memory (and on disk) and verify:
//! - Header, top key list and subdirectories are indexed
//! - Schema records are ingested before any object is decoded
//! - Cycles resolve to the highest by default
//! - Compressed payloads are inflated before decoding
//! - Limits and bad input fail with the right error kind

mod common;

use common::*;
use rootio_core::{ErrorKind, Value};
use rootio_file::{MemorySource, ReaderConfig, RootFile};
use std::io::Write;

fn sample_file() -> Vec<u8> {
    FileBuilder::new("synthetic")
        .streamer_info(schema_list(streamer_info_key_len()))
        .object(Stored::new("TNamed", "hpx", 1, tnamed_payload("hpx", "first")))
        .object(Stored::new("TNamed", "hpx", 2, tnamed_payload("hpx", "second")))
        .object(Stored::new(
            "Event",
            "event",
            1,
            event_payload(42, &[(1.5, 3), (2.25, 7)]),
        ))
        .object(
            Stored::new("TNamed", "packed", 1, tnamed_payload("packed", &"x".repeat(2_000)))
                .compressed(),
        )
        .directory(
            "calib",
            vec![Stored::new("TNamed", "gain", 1, tnamed_payload("gain", "1.02"))],
        )
        .build()
}

async fn open_sample() -> RootFile {
    RootFile::open(MemorySource::new(sample_file()), ReaderConfig::for_testing())
        .await
        .unwrap()
}

fn title_of(graph: &rootio_core::ObjectGraph) -> String {
    graph
        .root_object()
        .and_then(|o| o.get("fTitle"))
        .and_then(Value::as_str)
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_open_indexes_keys() {
    let file = open_sample().await;
    assert_eq!(file.title(), "synthetic");
    assert!(!file.header().is_large());

    let names: Vec<&str> = file.list("").iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["StreamerInfo", "calib", "event", "hpx", "packed"]);
    assert_eq!(file.keys().cycles("hpx"), vec![1, 2]);
    assert!(file.keys().contains("calib/gain"));
}

#[tokio::test]
async fn test_schema_records_ingested() {
    let file = open_sample().await;
    assert!(file.registry().contains("Track"));
    assert!(file.registry().contains("Event"));
    assert!(file.registry().knows_checksum(TRACK_CHECKSUM));

    let infos = file.streamer_infos().unwrap();
    let arr = infos
        .root_object()
        .and_then(|l| l.get("arr"))
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(arr.len(), 2);
}

#[tokio::test]
async fn test_read_object_with_container_of_objects() {
    let file = open_sample().await;
    let graph = file.read_object("event").await.unwrap();
    let event = graph.root_object().unwrap();
    assert_eq!(event.class_name(), "Event");
    assert_eq!(event.get("fRun"), Some(&Value::Int(42)));

    let tracks = event.get("fTracks").and_then(Value::as_array).unwrap();
    assert_eq!(tracks.len(), 2);
    let second = tracks[1].as_object().unwrap();
    assert_eq!(second.get("fPt"), Some(&Value::Float(2.25)));
    assert_eq!(second.get("fN"), Some(&Value::Int(7)));
}

#[tokio::test]
async fn test_cycles() {
    let file = open_sample().await;
    assert_eq!(title_of(&file.read_object("hpx").await.unwrap()), "second");
    assert_eq!(title_of(&file.read_object("hpx;1").await.unwrap()), "first");
    assert_eq!(title_of(&file.read_object("/hpx;2").await.unwrap()), "second");
}

#[tokio::test]
async fn test_compressed_payload() {
    let file = open_sample().await;
    let key = file.get_key("packed").unwrap();
    assert!(key.is_compressed());
    assert_eq!(title_of(&file.read_object("packed").await.unwrap()).len(), 2_000);
}

#[tokio::test]
async fn test_subdirectory_object() {
    let file = open_sample().await;
    let names: Vec<&str> = file.list("calib").iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["gain"]);
    assert_eq!(title_of(&file.read_object("calib/gain").await.unwrap()), "1.02");

    let err = file.read_object("calib").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_missing_key_not_found() {
    let file = open_sample().await;
    assert_eq!(file.read_object("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(file.read_object("hpx;9").await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_streamer_info_key_is_readable() {
    let file = open_sample().await;
    let graph = file.read_object("StreamerInfo").await.unwrap();
    assert_eq!(graph.root_object().unwrap().class_name(), "TList");
}

#[tokio::test]
async fn test_object_size_limit() {
    let config = ReaderConfig::for_testing().with_max_object_size(100);
    let file = RootFile::open(MemorySource::new(sample_file()), config);
    // The schema list itself exceeds 100 bytes
    let err = file.await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let config = ReaderConfig::default().with_max_depth(0);
    let err = RootFile::open(MemorySource::new(sample_file()), config)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}

#[tokio::test]
async fn test_not_a_root_file() {
    let mut bytes = sample_file();
    bytes[..4].copy_from_slice(b"JUNK");
    let err = RootFile::open(MemorySource::new(bytes), ReaderConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn test_file_without_schema_records() {
    let (warnings, _guard) = common::logs::capture_warnings();
    let bytes = FileBuilder::new("bare")
        .object(Stored::new("TNamed", "n", 1, tnamed_payload("n", "plain")))
        .build();
    let file = RootFile::open(MemorySource::new(bytes), ReaderConfig::default())
        .await
        .unwrap();
    assert!(file.streamer_infos().is_none());
    assert!(warnings.contains("no schema records"));
    assert_eq!(title_of(&file.read_object("n").await.unwrap()), "plain");
}

#[tokio::test]
async fn test_open_path_on_disk() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&sample_file()).unwrap();
    tmp.flush().unwrap();

    let file = RootFile::open_path(tmp.path(), ReaderConfig::default())
        .await
        .unwrap();
    let graph = file.read_object("event").await.unwrap();
    let json = serde_json::to_string(&graph.materialize()).unwrap();
    assert!(json.contains("fTracks"));
}
