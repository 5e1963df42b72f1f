use std::io::Write;
use std::net::TcpStream;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use loopback_server::{app, json_ok, LoopbackServer, DRAIN_TIMEOUT};
use seams_core::{AssertionLog, Executor, HttpMethod, HttpRequest, HttpResponse, UreqExecutor};
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn key_value(_: &HttpRequest) -> HttpResponse {
    json_ok(r#"{"key":"value"}"#)
}

// --- router ---

#[tokio::test]
async fn router_answers_with_handler_reply() {
    let resp = app(key_value, "http://loopback.test")
        .oneshot(Request::builder().uri("/anything").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_bytes(resp).await, r#"{"key":"value"}"#);
}

#[tokio::test]
async fn router_hands_the_request_descriptor_to_the_handler() {
    let seen = Arc::new(Mutex::new(None));
    let router = {
        let seen = seen.clone();
        app(
            move |req: &HttpRequest| {
                *seen.lock().unwrap() = Some(req.clone());
                HttpResponse::new(204, "")
            },
            "http://loopback.test/",
        )
    };
    let resp = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/items?x=1")
                .header("Accept", "application/json")
                .body(r#"{"title":"t"}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let req = seen.lock().unwrap().take().unwrap();
    assert_eq!(req.method(), HttpMethod::Post);
    assert_eq!(req.url().as_str(), "http://loopback.test/items?x=1");
    assert_eq!(req.header("accept"), Some("application/json"));
    assert_eq!(req.body(), Some(&br#"{"title":"t"}"#[..]));
}

#[tokio::test]
async fn router_rejects_unknown_methods() {
    let resp = app(key_value, "http://loopback.test")
        .oneshot(Request::builder().method("BREW").uri("/").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn router_turns_handler_panic_into_500() {
    let resp = app(|_: &HttpRequest| panic!("expected GET"), "http://loopback.test")
        .oneshot(Request::builder().uri("/").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn router_rejects_invalid_status_from_handler() {
    let resp = app(|_: &HttpRequest| HttpResponse::new(1000, ""), "http://loopback.test")
        .oneshot(Request::builder().uri("/").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- live server ---

#[test]
fn round_trip_over_loopback() {
    let server = LoopbackServer::start(key_value).unwrap();
    let req = HttpRequest::get(server.url()).unwrap();

    let resp = UreqExecutor::new().execute(&req).unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.text().unwrap(), r#"{"key":"value"}"#);
    assert_eq!(server.hits(), 1);
    server.close().unwrap();
}

#[test]
fn url_has_no_trailing_slash() {
    let server = LoopbackServer::start(key_value).unwrap();
    assert_eq!(server.url(), format!("http://{}", server.addr()));
    assert!(!server.url().ends_with('/'));
    assert_eq!(server.url_for("/a/b"), format!("{}/a/b", server.url()));
}

#[test]
fn port_is_released_after_close() {
    let server = LoopbackServer::start(key_value).unwrap();
    let addr = server.addr();
    assert!(TcpStream::connect(addr).is_ok());

    server.close().unwrap();

    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn port_is_released_after_drop() {
    let addr = {
        let server = LoopbackServer::start(key_value).unwrap();
        server.addr()
    };
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn close_aborts_a_half_written_request() {
    let server = LoopbackServer::start(key_value).unwrap();
    let addr = server.addr();
    let mut stalled = TcpStream::connect(addr).unwrap();
    stalled.write_all(b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\n").unwrap();
    thread::sleep(Duration::from_millis(100));

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(server.close().is_ok());
    });

    assert_eq!(rx.recv_timeout(DRAIN_TIMEOUT * 10), Ok(true));
    assert!(TcpStream::connect(addr).is_err());
    drop(stalled);
}

#[test]
fn handler_expectations_use_the_assertion_log() {
    let log = AssertionLog::new();
    let server = {
        let log = log.clone();
        LoopbackServer::start(move |req: &HttpRequest| {
            log.expect_method(req, HttpMethod::Get);
            log.expect_header(req, "Accept", "application/json");
            json_ok(r#"{"key":"value"}"#)
        })
        .unwrap()
    };

    // Missing Accept header: recorded, but the reply is still delivered.
    let req = HttpRequest::get(server.url()).unwrap();
    let resp = UreqExecutor::new().execute(&req).unwrap();
    assert_eq!(resp.status, 200);
    server.close().unwrap();

    let failures = log.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].message.contains("Accept: application/json"));
}

#[test]
fn close_reports_handler_panics() {
    let server = LoopbackServer::start(|_: &HttpRequest| panic!("expected POST")).unwrap();
    let req = HttpRequest::get(server.url()).unwrap();

    let resp = UreqExecutor::new().execute(&req).unwrap();
    assert_eq!(resp.status, 500);

    let failures = server.close().unwrap_err();
    assert_eq!(failures.0.len(), 1);
    assert!(failures.0[0].contains("expected POST"));
}

#[test]
#[should_panic(expected = "loopback handler failure(s)")]
fn drop_panics_on_unreported_handler_panics() {
    let server = LoopbackServer::start(|_: &HttpRequest| panic!("boom")).unwrap();
    let req = HttpRequest::get(server.url()).unwrap();
    let _ = UreqExecutor::new().execute(&req);
    drop(server);
}
