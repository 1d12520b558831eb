//! Pipeline integration tests with a stubbed model.
//!
//! No network access: every test injects a [`StructuredModel`] that returns a
//! canned reply (or error) and counts how often it was called.

use async_trait::async_trait;
use serde_json::{json, Value};
use sop2docx::{
    extract_document, migrate, migrate_bytes, migrate_to_file, render_record, ErrorKind,
    ExtractionRequest, MigrationConfig, MigrationError, MigrationProgressCallback, ModelReply,
    OutputFormat, SourceFormat, Stage, StructuredModel,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

const SMOKE_TEXT: &str = "Turn off power. Wear gloves. Remove cover screws.";

enum Reply {
    Json(Value),
    Fail,
}

struct StubModel {
    reply: Reply,
    calls: AtomicUsize,
    seen_text: Mutex<Vec<String>>,
}

impl StubModel {
    fn returning(value: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Json(value),
            calls: AtomicUsize::new(0),
            seen_text: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Reply::Fail,
            calls: AtomicUsize::new(0),
            seen_text: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn extract(&self, request: ExtractionRequest<'_>) -> Result<ModelReply, MigrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_text
            .lock()
            .unwrap()
            .push(request.document_text.to_string());
        match &self.reply {
            Reply::Json(v) => Ok(ModelReply::new(v.clone())),
            Reply::Fail => Err(MigrationError::ModelCallFailed {
                provider: "stub".into(),
                detail: "connection reset".into(),
            }),
        }
    }
}

#[derive(Default)]
struct StageRecorder {
    events: Mutex<Vec<(String, Stage)>>,
}

impl StageRecorder {
    fn saw(&self, what: &str, stage: Stage) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|(w, s)| w == what && *s == stage)
    }
}

impl MigrationProgressCallback for StageRecorder {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(("start".into(), stage));
    }

    fn on_stage_complete(&self, stage: Stage, _elapsed: Duration) {
        self.events.lock().unwrap().push(("done".into(), stage));
    }

    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.events.lock().unwrap().push(("error".into(), stage));
    }
}

fn smoke_reply() -> Value {
    json!({
        "title": "Test SOP",
        "document_id": "SOP-TEST-001",
        "version": "2.0",
        "department": "QA",
        "safety_warnings": ["Wear gloves"],
        "equipment": [],
        "steps": ["Turn off power", "Remove cover screws"],
        "confidence_score": 8
    })
}

fn with_field(field: &str, value: Value) -> Value {
    let mut v = smoke_reply();
    v[field] = value;
    v
}

fn without_field(field: &str) -> Value {
    let mut v = smoke_reply();
    v.as_object_mut().unwrap().remove(field);
    v
}

fn config_for(model: &Arc<StubModel>, out: &Path) -> MigrationConfig {
    MigrationConfig::builder()
        .provider(Arc::clone(model) as Arc<dyn StructuredModel>)
        .output_dir(out)
        .build()
        .unwrap()
}

fn write_source(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Text of every top-level paragraph of a DOCX file, in order.
fn docx_paragraphs(path: &Path) -> Vec<String> {
    let bytes = std::fs::read(path).unwrap();
    let doc = docx_rs::read_docx(&bytes).unwrap();
    let mut out = Vec::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            out.push(text);
        }
    }
    out
}

// ── Smoke ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn smoke_text_to_docx() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "legacy.txt", SMOKE_TEXT);
    let model = StubModel::returning(smoke_reply());

    let output = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap();

    let path = output.output_path.clone().unwrap();
    assert_eq!(path, out.path().join("Test_SOP_v2.0.docx"));
    assert!(path.exists());
    assert_eq!(model.calls(), 1);
    assert_eq!(model.seen_text.lock().unwrap()[0], SMOKE_TEXT);

    let paras = docx_paragraphs(&path);
    let heading = paras
        .iter()
        .position(|p| p == "Safety Warnings & Precautions")
        .unwrap();
    let warning = paras.iter().position(|p| p == "Wear gloves").unwrap();
    assert!(heading < warning);

    let steps: Vec<&String> = paras.iter().filter(|p| p.starts_with("Step ")).collect();
    assert_eq!(steps.len(), 2);
    assert!(steps[0].ends_with("Turn off power"));
    assert!(steps[1].ends_with("Remove cover screws"));

    assert_eq!(output.stats.source_format, Some(SourceFormat::PlainText));
    assert_eq!(output.stats.source_chars, SMOKE_TEXT.len());
}

// ── Reader ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_never_calls_model() {
    let out = TempDir::new().unwrap();
    let model = StubModel::returning(smoke_reply());
    let recorder = Arc::new(StageRecorder::default());
    let config = MigrationConfig::builder()
        .provider(Arc::clone(&model) as Arc<dyn StructuredModel>)
        .output_dir(out.path())
        .progress_callback(Arc::clone(&recorder) as Arc<dyn MigrationProgressCallback>)
        .build()
        .unwrap();

    let err = migrate("/no/such/dir/sop.txt", &config).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(model.calls(), 0);
    assert!(recorder.saw("error", Stage::Read));
    assert!(!recorder.saw("start", Stage::Extract));
    assert!(!recorder.saw("start", Stage::Render));
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn unsupported_extension_never_calls_model() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "legacy.rtf", SMOKE_TEXT);
    let model = StubModel::returning(smoke_reply());

    let err = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn blank_source_is_decode_error_before_model() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "blank.txt", " \n\n\t\n");
    let model = StubModel::returning(smoke_reply());

    let err = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DecodeError);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn plain_text_reaches_model_unchanged() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let body = "  1) isolate   power\n\n\tPPE: gloves!\r\nend";
    let input = write_source(&src, "odd.txt", body);
    let model = StubModel::returning(smoke_reply());

    extract_document(&input, &config_for(&model, out.path()))
        .await
        .unwrap();

    assert_eq!(model.seen_text.lock().unwrap()[0], body);
}

// ── Extractor ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn confidence_is_clamped() {
    let src = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);

    for (raw, expected) in [(json!(11), 10u8), (json!(0), 1), (json!(7.6), 8)] {
        let out = TempDir::new().unwrap();
        let model = StubModel::returning(with_field("confidence_score", raw));
        let output = extract_document(&input, &config_for(&model, out.path()))
            .await
            .unwrap();
        assert_eq!(output.record.confidence_score().get(), expected);
    }
}

#[tokio::test]
async fn missing_lists_become_empty() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let mut reply = without_field("safety_warnings");
    reply.as_object_mut().unwrap().remove("equipment");
    reply["steps"] = Value::Null;
    let model = StubModel::returning(reply);

    let output = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap();

    assert!(output.record.safety_warnings().is_empty());
    assert!(output.record.equipment().is_empty());
    assert!(output.record.steps().is_empty());
    assert!(output.output_path.unwrap().exists());
}

#[tokio::test]
async fn missing_title_is_schema_violation_and_writes_nothing() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(without_field("title"));

    let err = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn wrong_type_is_schema_violation() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(with_field("steps", json!("one long string")));

    let err = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
}

#[tokio::test]
async fn model_failure_renders_nothing() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::failing();
    let recorder = Arc::new(StageRecorder::default());
    let config = MigrationConfig::builder()
        .provider(Arc::clone(&model) as Arc<dyn StructuredModel>)
        .output_dir(out.path())
        .progress_callback(Arc::clone(&recorder) as Arc<dyn MigrationProgressCallback>)
        .build()
        .unwrap();

    let err = migrate(&input, &config).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExtractionFailure);
    assert!(err.kind().is_retryable());
    assert_eq!(model.calls(), 1);
    assert!(recorder.saw("error", Stage::Extract));
    assert!(!recorder.saw("start", Stage::Render));
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn repeated_extraction_is_independent() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(smoke_reply());
    let config = config_for(&model, out.path());

    let first = extract_document(&input, &config).await.unwrap();
    let second = extract_document(&input, &config).await.unwrap();

    assert_eq!(model.calls(), 2);
    assert_eq!(first.record, second.record);
    assert!(first.output_path.is_none());
    assert!(files_in(out.path()).is_empty());
}

#[tokio::test]
async fn caller_document_id_wins() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(smoke_reply());
    let config = MigrationConfig::builder()
        .provider(Arc::clone(&model) as Arc<dyn StructuredModel>)
        .output_dir(out.path())
        .document_id("SOP-2025-042")
        .build()
        .unwrap();

    let output = extract_document(&input, &config).await.unwrap();
    assert_eq!(output.record.document_id(), "SOP-2025-042");
}

// ── Renderer ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn steps_keep_their_order() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(with_field(
        "steps",
        json!(["Step A", "Step B", "Step C"]),
    ));

    let output = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap();

    let paras = docx_paragraphs(&output.output_path.unwrap());
    let steps: Vec<&String> = paras.iter().filter(|p| p.starts_with("Step ")).collect();
    assert_eq!(steps.len(), 3);
    assert!(steps[0].ends_with("Step A"));
    assert!(steps[1].ends_with("Step B"));
    assert!(steps[2].ends_with("Step C"));
}

#[tokio::test]
async fn warnings_and_equipment_keep_their_order() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let mut reply = with_field("safety_warnings", json!(["Zeta", "Alpha", "Mid"]));
    reply["equipment"] = json!(["Wrench", "Gauge", "Valve key"]);
    let model = StubModel::returning(reply);

    let output = migrate(&input, &config_for(&model, out.path()))
        .await
        .unwrap();
    assert_eq!(output.record.safety_warnings(), ["Zeta", "Alpha", "Mid"]);
    assert_eq!(output.record.equipment(), ["Wrench", "Gauge", "Valve key"]);

    let paras = docx_paragraphs(&output.output_path.unwrap());
    let pos = |text: &str| paras.iter().position(|p| p == text).unwrap();
    assert!(pos("Zeta") < pos("Alpha") && pos("Alpha") < pos("Mid"));
    assert!(pos("Wrench") < pos("Gauge") && pos("Gauge") < pos("Valve key"));
}

#[tokio::test]
async fn explicit_output_path_and_markdown() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(smoke_reply());
    let config = MigrationConfig::builder()
        .provider(Arc::clone(&model) as Arc<dyn StructuredModel>)
        .output_format(OutputFormat::Markdown)
        .build()
        .unwrap();
    let target = out.path().join("reports/pump.md");

    let output = migrate_to_file(&input, &target, &config).await.unwrap();

    assert_eq!(output.output_path.as_deref(), Some(target.as_path()));
    let md = std::fs::read_to_string(&target).unwrap();
    assert!(md.starts_with("# Test SOP"));
    assert!(md.contains("1. Turn off power\n2. Remove cover screws\n"));
}

#[tokio::test]
async fn unwritable_destination_is_write_error() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let blocker = out.path().join("not_a_dir");
    std::fs::write(&blocker, b"occupied").unwrap();
    let model = StubModel::returning(smoke_reply());

    let err = migrate(&input, &config_for(&model, &blocker))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::WriteError);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn render_record_is_deterministic() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(smoke_reply());
    let output = extract_document(&input, &config_for(&model, out.path()))
        .await
        .unwrap();

    let a = render_record(&output.record, out.path(), OutputFormat::Markdown).unwrap();
    let b = render_record(&output.record, out.path(), OutputFormat::Markdown).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.file_name().unwrap(), "Test_SOP_v2.0.md");
    assert_eq!(files_in(out.path()).len(), 1);
}

// ── Byte input ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_bytes_migrate() {
    let out = TempDir::new().unwrap();
    let model = StubModel::returning(smoke_reply());

    let output = migrate_bytes(
        SMOKE_TEXT.as_bytes().to_vec(),
        SourceFormat::PlainText,
        "upload.txt",
        &config_for(&model, out.path()),
    )
    .await
    .unwrap();

    assert!(output.output_path.unwrap().exists());
    assert_eq!(model.seen_text.lock().unwrap()[0], SMOKE_TEXT);
}

#[tokio::test]
async fn upload_declared_pdf_without_header_is_decode_error() {
    let out = TempDir::new().unwrap();
    let model = StubModel::returning(smoke_reply());

    let err = migrate_bytes(
        b"hello".to_vec(),
        SourceFormat::Pdf,
        "upload.pdf",
        &config_for(&model, out.path()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DecodeError);
    assert_eq!(model.calls(), 0);
}

#[test]
fn output_is_json_serialisable() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let input = write_source(&src, "a.txt", SMOKE_TEXT);
    let model = StubModel::returning(smoke_reply());
    let output = rt
        .block_on(extract_document(&input, &config_for(&model, out.path())))
        .unwrap();

    let v = serde_json::to_value(&output).unwrap();
    assert_eq!(v["record"]["title"], "Test SOP");
    assert_eq!(v["record"]["confidence_score"], 8);
    assert!(v["output_path"].is_null());
}
