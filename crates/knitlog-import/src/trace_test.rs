use super::*;

use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("outer failure")]
struct Outer(#[source] Inner);

#[derive(Debug, thiserror::Error)]
#[error("inner cause")]
struct Inner;

fn read_json(path: &Path) -> Value {
    let raw = std::fs::read_to_string(path).expect("trace file readable");
    serde_json::from_str(&raw).expect("trace file is JSON")
}

#[test]
fn blob_longer_than_limit_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let mut trace = ImportTrace::create(dir.path(), 10);
    let text = "ø".repeat(25);
    trace.record_text_blob("page_text", &text);

    let blob = trace.blob("page_text").unwrap();
    assert_eq!(blob.text.chars().count(), 10);
    assert_eq!(blob.length, 25);
    assert!(blob.truncated);
}

#[test]
fn blob_within_limit_is_kept_whole() {
    let blob = TextBlob::bounded("short", 10);
    assert_eq!(blob.text, "short");
    assert_eq!(blob.length, 5);
    assert!(!blob.truncated);
}

#[test]
fn saved_document_has_expected_top_level_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut trace = ImportTrace::create(dir.path(), 100);
    trace.add_event("import_started", json!({"url": "https://a.test"}));
    trace.record_ai_prompt("system text", "user text");
    trace.record_ai_response("{}");
    trace.record_error("ai_parse", &Outer(Inner));

    let path = trace.save().expect("first save writes");
    assert_eq!(path, dir.path().join(format!("{}.json", trace.trace_id())));

    let doc = read_json(&path);
    assert_eq!(doc["trace_id"], json!(trace.trace_id().to_string()));
    assert!(doc["created_at"].is_string());
    assert_eq!(doc["events"][0]["name"], "import_started");
    assert_eq!(doc["ai"]["prompt"]["text"], "user text");
    assert_eq!(doc["ai"]["response"]["length"], 2);
    assert_eq!(doc["errors"][0]["label"], "ai_parse");
    assert_eq!(doc["errors"][0]["message"], "outer failure");
    assert!(doc["errors"][0]["stack"]
        .as_str()
        .unwrap()
        .starts_with("caused by: inner cause"));
    assert!(doc.get("blobs").is_none());
}

#[test]
fn empty_optional_sections_are_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let mut trace = ImportTrace::create(dir.path(), 100);
    let doc = read_json(&trace.save().unwrap());
    assert!(doc.get("ai").is_none());
    assert!(doc.get("errors").is_none());
    assert_eq!(doc["events"], json!([]));
}

#[test]
fn save_happens_once_and_freezes_the_trace() {
    let dir = tempfile::tempdir().unwrap();
    let mut trace = ImportTrace::create(dir.path(), 100);
    assert!(trace.save().is_some());
    trace.add_event("late", json!(null));
    assert!(trace.events().is_empty());
    assert!(trace.save().is_none());
    assert!(trace.is_saved());
}

#[test]
fn unwritable_directory_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let mut trace = ImportTrace::create(blocker.join("traces"), 100);
    trace.add_event("import_started", json!({}));
    assert!(trace.save().is_none());
    assert!(trace.is_saved());
}
