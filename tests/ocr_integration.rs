use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use ocrspace_http::{FetchError, OcrSpaceClient, OcrSpaceError, ParseOptions, RetryPolicy};
use serde_json::json;

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: String,
}

impl MockResponse {
    fn json(status: StatusCode, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(HeaderMap, String)>>>,
}

async fn parse_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push((headers, body));

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    (response.status, response.body)
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(HeaderMap, String)>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn parse_url(&self) -> String {
        format!("{}/parse/image", self.base_url)
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/parse/image", post(parse_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        requests: state.requests,
        task,
    }
}

fn test_client(server: &TestServer) -> OcrSpaceClient {
    OcrSpaceClient::new("test-key")
        .with_endpoint(server.parse_url())
        .with_policy(
            RetryPolicy::default()
                .with_timeout(Duration::from_millis(1_000))
                .with_max_retries(1)
                .with_base_backoff(Duration::from_millis(1)),
        )
}

fn success_body(text: &str) -> serde_json::Value {
    json!({
        "OCRExitCode": 1,
        "IsErroredOnProcessing": false,
        "ProcessingTimeInMilliseconds": "295",
        "ParsedResults": [{"ParsedText": text}]
    })
}

#[tokio::test]
async fn parse_returns_trimmed_text_and_raw_payload() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        success_body("  Receipt total: 12.50  "),
    )])
    .await;
    let client = test_client(&server);

    let result = client
        .parse_base64("QUJD", &ParseOptions::default())
        .await
        .expect("parse must succeed");

    assert_eq!(result.text, "Receipt total: 12.50");
    assert_eq!(result.raw["OCRExitCode"], 1);
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn parse_sends_expected_form_fields_and_api_key_header() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        success_body("hello"),
    )])
    .await;
    let client = test_client(&server);

    let options = ParseOptions {
        detect_orientation: true,
        ..ParseOptions::default()
    };
    client
        .parse_base64("QUJD", &options)
        .await
        .expect("parse must succeed");

    let requests = server
        .requests
        .lock()
        .expect("request log mutex must not be poisoned");
    let (headers, body) = requests.first().expect("one request must be recorded");

    assert_eq!(headers.get("apikey").expect("apikey present"), "test-key");
    assert_eq!(
        headers
            .get("content-type")
            .expect("content type present")
            .to_str()
            .expect("ascii"),
        "application/x-www-form-urlencoded"
    );
    assert!(body.contains("base64Image=data%3Aimage%2Fjpeg%3Bbase64%2CQUJD"));
    assert!(body.contains("language=eng"));
    assert!(body.contains("OCREngine=2"));
    assert!(body.contains("detectOrientation=true"));
    assert!(body.contains("scale=true"));
    assert!(body.contains("isTable=false"));
}

#[tokio::test]
async fn provider_failure_exit_code_maps_to_service_error() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({
            "OCRExitCode": 4,
            "IsErroredOnProcessing": true,
            "ErrorMessage": ["timed out waiting for engine", "image too large"]
        }),
    )])
    .await;
    let client = test_client(&server);

    let error = client
        .parse_base64("QUJD", &ParseOptions::default())
        .await
        .expect_err("parse must fail");

    match error {
        OcrSpaceError::Service { message, raw } => {
            assert_eq!(
                message,
                "OCR failed: timed out waiting for engine; image too large"
            );
            assert!(raw.is_some());
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_exit_code_maps_to_shape_error() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"totally": "unexpected"}),
    )])
    .await;
    let client = test_client(&server);

    let error = client
        .parse_base64("QUJD", &ParseOptions::default())
        .await
        .expect_err("parse must fail");

    assert!(matches!(
        error,
        OcrSpaceError::Service { ref message, .. } if message == "unexpected OCR API response shape"
    ));
}

#[tokio::test]
async fn empty_parsed_text_maps_to_no_readable_text() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        success_body("   \n  "),
    )])
    .await;
    let client = test_client(&server);

    let error = client
        .parse_base64("QUJD", &ParseOptions::default())
        .await
        .expect_err("parse must fail");

    assert!(matches!(
        error,
        OcrSpaceError::Service { ref message, .. } if message == "no readable text found"
    ));
}

#[tokio::test]
async fn transient_server_error_is_retried_through_the_core() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
        MockResponse::json(StatusCode::OK, success_body("recovered")),
    ])
    .await;
    let client = test_client(&server);

    let result = client
        .parse_base64("QUJD", &ParseOptions::default())
        .await
        .expect("parse must succeed after retry");

    assert_eq!(result.text, "recovered");
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn terminal_http_failure_keeps_its_fetch_kind() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::FORBIDDEN,
        json!({"error": "bad key"}),
    )])
    .await;
    let client = test_client(&server);

    let error = client
        .parse_base64("QUJD", &ParseOptions::default())
        .await
        .expect_err("parse must fail");

    match error {
        OcrSpaceError::Fetch(FetchError::Http { status, .. }) => assert_eq!(status, 403),
        other => panic!("expected fetch http error, got {other:?}"),
    }
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_json_success_body_is_decode_error() {
    let server = spawn_server(vec![MockResponse::text(StatusCode::OK, "not json at all")]).await;
    let client = test_client(&server);

    let error = client
        .parse_base64("QUJD", &ParseOptions::default())
        .await
        .expect_err("parse must fail");

    assert!(matches!(error, OcrSpaceError::Decode(_)));
}

#[tokio::test]
async fn parse_file_round_trips_through_base64() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        success_body("from file"),
    )])
    .await;
    let client = test_client(&server);

    let path = std::env::temp_dir().join("ocrspace-http-parse-file-test.jpg");
    tokio::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0])
        .await
        .expect("must write fixture");

    let result = client
        .parse_file(&path, &ParseOptions::default())
        .await
        .expect("parse must succeed");
    assert_eq!(result.text, "from file");

    let requests = server
        .requests
        .lock()
        .expect("request log mutex must not be poisoned");
    let (_, body) = requests.first().expect("one request must be recorded");
    // STANDARD base64 of ff d8 ff e0, url-encoded inside the data URL.
    assert!(body.contains("%2F9j%2F4A%3D%3D"));

    tokio::fs::remove_file(&path).await.ok();
}
