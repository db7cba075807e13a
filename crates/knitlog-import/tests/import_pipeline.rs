//! End-to-end import runs over a mocked retailer page and a mocked
//! chat-completions endpoint.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use knitlog_core::ImportKind;
use knitlog_import::{
    HttpFetcher, ImportError, ImportRequest, Importer, ImporterSettings, OpenAiCompletion,
};

const PATTERN_PAGE: &str = r#"<!doctype html>
<html><head>
  <title>Ribbed Beanie - Free Pattern</title>
  <meta property="og:title" content="Ribbed Beanie">
</head><body>
  <h1>Ribbed Beanie</h1>
  <p>A stretchy ribbed beanie that fits most adult heads comfortably.</p>
  <ul>
    <li>Yarn: Worsted merino, 180 m</li>
    <li>Needles: 4.5 mm circular, 40 cm</li>
    <li>Gauge: 20 sts x 28 rows</li>
  </ul>
  <h2>Instructions</h2>
  <ol><li>Cast on 96 sts.</li><li>Work k2, p2 rib for 20 cm.</li><li>Decrease for the crown.</li></ol>
</body></html>"#;

const YARN_PAGE: &str = "<html><head><title>Merino Aran</title></head><body>
  <h1>Merino Aran</h1>
  <table>
    <tr><th>Length / weight</th><td>300m / 100g</td></tr>
    <tr><th>Needles</th><td>\u{c3}\u{a2}\u{20ac}\u{2039}4-4,5mm</td></tr>
    <tr><th>Fiber</th><td>100% merino wool</td></tr>
  </table>
</body></html>";

fn settings(dir: &Path) -> ImporterSettings {
    ImporterSettings {
        trace_dir: dir.to_path_buf(),
        trace_blob_limit: 5_000,
        fetch_timeout: Duration::from_secs(10),
        ai_timeout: Duration::from_secs(10),
        ai_max_input_chars: 8_000,
    }
}

fn importer(dir: &Path) -> Importer {
    let fetcher = HttpFetcher::new(5, "knitlog-test/0.1", 0, 0).expect("build fetcher");
    Importer::new(Arc::new(fetcher), settings(dir))
}

fn importer_with_ai(dir: &Path, ai_server: &MockServer) -> Importer {
    let service = OpenAiCompletion::new("sk-test", "gpt-test", &ai_server.uri(), 5)
        .expect("build completion client");
    importer(dir).with_completion(Arc::new(service))
}

async fn serve_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(html),
        )
        .mount(server)
        .await;
}

async fn serve_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn read_trace(path: &Path) -> Value {
    let raw = std::fs::read_to_string(path).expect("trace file exists");
    serde_json::from_str(&raw).expect("trace is JSON")
}

fn trace_files(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .expect("trace dir exists")
        .map(|entry| entry.expect("dir entry").path())
        .collect()
}

// ---------------------------------------------------------------------------
// Fetch failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connection_refused_yields_one_fetch_error_and_a_trace_without_ai() {
    let dir = tempfile::tempdir().expect("tempdir");
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let ai_server = MockServer::start().await;
    let request = ImportRequest {
        url: format!("http://127.0.0.1:{port}/patterns/beanie"),
        kind: ImportKind::Pattern,
        use_ai: true,
    };

    let err = importer_with_ai(dir.path(), &ai_server)
        .run(&request)
        .await
        .expect_err("nothing listens on the port");
    assert!(matches!(err, ImportError::Http { .. }), "got {err:?}");

    let files = trace_files(dir.path());
    assert_eq!(files.len(), 1, "exactly one trace file");
    let trace = read_trace(&files[0]);
    assert_eq!(trace["errors"].as_array().map(Vec::len), Some(1));
    assert!(trace.get("ai").is_none(), "no ai key expected: {trace}");
    assert!(ai_server
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Heuristic and AI paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn heuristic_pattern_import_reads_labels_and_steps() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start().await;
    serve_page(&server, "/patterns/beanie", PATTERN_PAGE).await;

    let outcome = importer(dir.path())
        .run(&ImportRequest {
            url: format!("{}/patterns/beanie", server.uri()),
            kind: ImportKind::Pattern,
            use_ai: false,
        })
        .await
        .expect("import succeeds");

    let record = outcome.record;
    assert_eq!(record.title, "Ribbed Beanie");
    assert_eq!(record.yarn.as_deref(), Some("Worsted merino, 180 m"));
    assert_eq!(record.needles.as_deref(), Some("4.5 mm circular, 40 cm"));
    assert_eq!((record.gauge_stitches, record.gauge_rows), (Some(20), Some(28)));
    let steps: Vec<(u32, &str)> = record
        .steps
        .iter()
        .map(|s| (s.step_number, s.title.as_str()))
        .collect();
    assert_eq!(
        steps,
        vec![
            (1, "Cast on 96 sts."),
            (2, "Work k2, p2 rib for 20 cm."),
            (3, "Decrease for the crown.")
        ]
    );
    assert!(!outcome.ai_used);
}

#[tokio::test]
async fn invalid_ai_json_falls_back_with_exactly_one_trace_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page_server = MockServer::start().await;
    serve_page(&page_server, "/patterns/beanie", PATTERN_PAGE).await;
    let ai_server = MockServer::start().await;
    serve_completion(&ai_server, "Here is the pattern: title Ribbed Beanie").await;

    let outcome = importer_with_ai(dir.path(), &ai_server)
        .run(&ImportRequest {
            url: format!("{}/patterns/beanie", page_server.uri()),
            kind: ImportKind::Pattern,
            use_ai: true,
        })
        .await
        .expect("AI failure never fails the import");

    assert!(!outcome.ai_used);
    assert_eq!(outcome.record.title, "Ribbed Beanie");
    assert_eq!(outcome.record.steps.len(), 3);

    let trace = read_trace(outcome.trace_path.as_deref().expect("trace saved"));
    let errors = trace["errors"].as_array().expect("errors recorded");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["label"], "ai_extraction");
}

#[tokio::test]
async fn duplicated_ai_notes_are_removed_from_the_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page_server = MockServer::start().await;
    serve_page(&page_server, "/patterns/beanie", PATTERN_PAGE).await;
    let ai_server = MockServer::start().await;
    serve_completion(
        &ai_server,
        r#"{"title":"Ribbed Beanie","description":"Instruction Notes: Knit 10 rows.","notes":"Instruction Notes: Knit 10 rows."}"#,
    )
    .await;

    let outcome = importer_with_ai(dir.path(), &ai_server)
        .run(&ImportRequest {
            url: format!("{}/patterns/beanie", page_server.uri()),
            kind: ImportKind::Pattern,
            use_ai: true,
        })
        .await
        .expect("import succeeds");

    assert!(outcome.ai_used);
    let record = &outcome.record;
    assert!(record.notes.is_none());

    let mut all = String::new();
    all.push_str(record.description.as_deref().unwrap_or_default());
    all.push_str(record.notes.as_deref().unwrap_or_default());
    for step in &record.steps {
        all.push_str(step.description.as_deref().unwrap_or_default());
    }
    assert_eq!(all.matches("Instruction Notes: Knit 10 rows.").count(), 1);
}

// ---------------------------------------------------------------------------
// Yarn numbers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn yarn_import_reads_length_weight_and_needles_through_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start().await;
    serve_page(&server, "/yarns/merino-aran", YARN_PAGE).await;

    let outcome = importer(dir.path())
        .run(&ImportRequest {
            url: format!("{}/yarns/merino-aran", server.uri()),
            kind: ImportKind::Yarn,
            use_ai: false,
        })
        .await
        .expect("import succeeds");

    let record = outcome.record;
    assert_eq!(record.title, "Merino Aran");
    assert_eq!(record.length_meters, Some(300));
    assert_eq!(record.weight_grams, Some(100));
    assert_eq!(record.recommended_needles.as_deref(), Some("4-4,5mm"));
    assert_eq!(record.fiber_content.as_deref(), Some("100% merino wool"));
}
