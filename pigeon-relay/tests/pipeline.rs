//! End-to-end pipeline tests: intake → queue → worker → device

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, RgbImage};
use pigeon_printer::{PrintDocument, PrintError, PrintResult, PrinterDriver, SpoolPrinter};
use pigeon_relay::api::build_app;
use pigeon_relay::core::{BackgroundTasks, Config, ServerState};
use pigeon_relay::printing::{
    FontHandle, ImageSource, Job, JobPipeline, JobQueue, JobReceiver, JobReport, PrintWorker,
    Provenance, Renderer, Sender, Submitter, job_queue,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// ========== Recording device ==========

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Open(String),
    Page(u32),
    End,
    Close,
}

#[derive(Default, Clone)]
struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
    page_height: i32,
    fail_on_page: bool,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn documents(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Open(name) => Some(name),
                _ => None,
            })
            .collect()
    }
}

struct RecorderDocument(Recorder);

impl PrinterDriver for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn open_document(&self, doc_name: &str) -> PrintResult<Box<dyn PrintDocument>> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Open(doc_name.to_string()));
        Ok(Box::new(RecorderDocument(self.clone())))
    }
}

impl PrintDocument for RecorderDocument {
    fn max_page_height(&self) -> i32 {
        self.0.page_height
    }
    fn start_page(&mut self) -> PrintResult<()> {
        if self.0.fail_on_page {
            return Err(PrintError::Offline("printer unplugged".to_string()));
        }
        Ok(())
    }
    fn blit(&mut self, band: &RgbImage, _origin: (i32, i32)) -> PrintResult<()> {
        self.0.events.lock().unwrap().push(Event::Page(band.height()));
        Ok(())
    }
    fn end_page(&mut self) -> PrintResult<()> {
        Ok(())
    }
    fn end_document(&mut self) -> PrintResult<()> {
        self.0.events.lock().unwrap().push(Event::End);
        Ok(())
    }
    fn close(self: Box<Self>) -> PrintResult<()> {
        self.0.events.lock().unwrap().push(Event::Close);
        Ok(())
    }
}

// ========== Helpers ==========

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn ada() -> Sender {
    Sender::new("Ada", Some("ada".to_string()))
}

fn start_worker(
    driver: Recorder,
) -> (JobQueue, mpsc::UnboundedReceiver<JobReport>, CancellationToken) {
    let (queue, rx) = job_queue();
    let (report_tx, reports) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    let pipeline = JobPipeline::new(Renderer::new(384, FontHandle::Builtin), Arc::new(driver));
    let worker = PrintWorker::new(pipeline).with_reports(report_tx);
    tokio::spawn(worker.run(rx, shutdown.clone()));

    (queue, reports, shutdown)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_multipart(uri: &str, fields: &[(&str, &[u8])]) -> Request<Body> {
    let boundary = "pigeon-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        if *name == "file" {
            body.extend_from_slice(
                b"Content-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\n\
                  Content-Type: image/png\r\n\r\n",
            );
        } else {
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            );
        }
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

/// State whose queue nobody consumes, so positions stay put
fn idle_state(dir: &std::path::Path, max_text_length: usize) -> (ServerState, JobReceiver) {
    let mut config = Config::with_overrides(dir, 0);
    config.max_text_length = max_text_length;
    let (queue, rx) = job_queue();
    let submitter = Submitter::new(queue, max_text_length, config.spool_dir());
    (ServerState::new(config, submitter), rx)
}

// ========== Worker ==========

#[tokio::test]
async fn test_jobs_print_in_submission_order() {
    let recorder = Recorder {
        page_height: 3000,
        ..Default::default()
    };
    let (queue, mut reports, shutdown) = start_worker(recorder.clone());

    let jobs: Vec<Job> = (0..3).map(|i| Job::text(format!("job {}", i), None)).collect();
    let expected: Vec<String> = jobs.iter().map(Job::document_name).collect();
    for job in jobs {
        queue.enqueue(job);
    }

    for _ in 0..3 {
        assert!(reports.recv().await.unwrap().succeeded());
    }
    assert_eq!(recorder.documents(), expected);
    shutdown.cancel();
}

#[tokio::test]
async fn test_each_document_opened_and_closed_once() {
    let recorder = Recorder {
        page_height: 100,
        ..Default::default()
    };
    let (queue, mut reports, shutdown) = start_worker(recorder.clone());

    // 40 characters: 3 lines, 104px tall
    let job = Job::text("x".repeat(40), None);
    let name = job.document_name();
    queue.enqueue(job);

    let report = reports.recv().await.unwrap();
    assert_eq!(report.printed_pages, Some(vec![100, 4]));
    assert_eq!(
        recorder.events(),
        vec![
            Event::Open(name),
            Event::Page(100),
            Event::Page(4),
            Event::End,
            Event::Close
        ]
    );
    shutdown.cancel();
}

#[tokio::test]
async fn test_image_with_provenance_gets_one_header() {
    let recorder = Recorder {
        page_height: 0,
        ..Default::default()
    };
    let (queue, mut reports, shutdown) = start_worker(recorder.clone());

    let provenance = Provenance::now(&ada());
    queue.enqueue(Job::image(ImageSource::Bytes(png(192, 40)), Some(provenance)));

    let report = reports.recv().await.unwrap();
    // 80px body + 3 * 24 + 10 header, one page under the fallback height
    assert_eq!(report.printed_pages, Some(vec![162]));
    shutdown.cancel();
}

#[tokio::test]
async fn test_device_fault_does_not_stop_worker() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("upload.img");
    std::fs::write(&artifact, png(10, 10)).unwrap();

    let recorder = Recorder {
        fail_on_page: true,
        ..Default::default()
    };
    let (queue, mut reports, shutdown) = start_worker(recorder.clone());

    queue.enqueue(Job::image(ImageSource::File(artifact.clone()), None).with_artifact(&artifact));
    queue.enqueue(Job::text("after", None));

    let first = reports.recv().await.unwrap();
    assert!(first.rendered);
    assert_eq!(first.printed_pages, None);
    assert!(first.cleaned);
    assert!(!artifact.exists());

    // Second job still reaches the device, and the faulted one was closed
    let second = reports.recv().await.unwrap();
    assert!(second.rendered);
    let closes = recorder
        .events()
        .iter()
        .filter(|e| **e == Event::Close)
        .count();
    assert_eq!(closes, 2);
    shutdown.cancel();
}

#[tokio::test]
async fn test_worker_stops_on_shutdown() {
    let (_queue, rx) = job_queue();
    let shutdown = CancellationToken::new();
    let pipeline = JobPipeline::new(
        Renderer::new(384, FontHandle::Builtin),
        Arc::new(Recorder::default()),
    );
    let handle = tokio::spawn(PrintWorker::new(pipeline).run(rx, shutdown.clone()));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}

// ========== HTTP intake ==========

#[tokio::test]
async fn test_text_at_limit_reports_position_one() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _rx) = idle_state(dir.path(), 20);
    let app = build_app(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/print/text",
            serde_json::json!({ "display_name": "Ada", "handle": "ada", "text": "a".repeat(20) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["code"], "E0000");
    assert_eq!(body["data"]["position"], 1);

    let response = app
        .oneshot(post_json(
            "/api/print/text",
            serde_json::json!({ "display_name": "Ada", "text": "a".repeat(21) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["data"]["limit"], 20);
}

#[tokio::test]
async fn test_rejected_text_is_not_queued() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _rx) = idle_state(dir.path(), 5);
    let app = build_app(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/print/text",
            serde_json::json!({ "display_name": "Ada", "text": "too long" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queue_depth"], 0);
}

#[tokio::test]
async fn test_missing_display_name_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _rx) = idle_state(dir.path(), 50);

    let response = build_app(state)
        .oneshot(post_json(
            "/api/print/text",
            serde_json::json!({ "display_name": "  ", "text": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_upload_is_spooled_and_queued() {
    let dir = tempfile::tempdir().unwrap();
    let (state, mut rx) = idle_state(dir.path(), 50);
    let spool = state.config.spool_dir();
    let image = png(20, 20);

    let response = build_app(state)
        .oneshot(post_multipart(
            "/api/print/image",
            &[
                ("display_name", b"Ada".as_slice()),
                ("handle", b"@ada".as_slice()),
                ("file", image.as_slice()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["position"], 1);

    let job = rx.try_dequeue().unwrap();
    let artifact = job.artifact().unwrap();
    assert!(artifact.starts_with(&spool));
    assert_eq!(std::fs::read(artifact).unwrap(), image);
    assert_eq!(job.provenance.unwrap().handle.as_deref(), Some("ada"));
}

#[tokio::test]
async fn test_non_image_upload_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (state, mut rx) = idle_state(dir.path(), 50);

    let response = build_app(state)
        .oneshot(post_multipart(
            "/api/print/image",
            &[
                ("display_name", b"Ada".as_slice()),
                ("file", b"plain text, not pixels".as_slice()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_dequeue().is_none());
}

// ========== Full stack ==========

#[tokio::test]
async fn test_submission_reaches_spool_printer() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path(), 0);
    let pages = config.pages_dir();
    let driver = Arc::new(SpoolPrinter::new(&pages).unwrap());

    let mut tasks = BackgroundTasks::new();
    let state = ServerState::with_driver(&config, driver, &mut tasks);

    let response = build_app(state)
        .oneshot(post_json(
            "/api/print/text",
            serde_json::json!({ "display_name": "Ada", "text": "hello pigeon" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut printed = 0;
    for _ in 0..100 {
        printed = std::fs::read_dir(&pages).unwrap().count();
        if printed > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(printed, 1);

    tasks.shutdown().await;
}
