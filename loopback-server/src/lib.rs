use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use seams_core::{ConstructionError, HttpRequest, HttpResponse};
use tokio::net::TcpListener;
use tracing::{debug, error};

mod server;

pub use server::{HandlerFailures, LoopbackServer, DRAIN_TIMEOUT};

/// Caller-supplied logic answering every request the server receives.
pub type Handler = dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync;

pub(crate) struct Shared {
    handler: Arc<Handler>,
    base_url: String,
    hits: AtomicU64,
    failures: Mutex<Vec<String>>,
}

impl Shared {
    pub(crate) fn new(handler: Arc<Handler>, base_url: String) -> Self {
        Self {
            handler,
            base_url,
            hits: AtomicU64::new(0),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    fn record(&self, failure: String) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    pub(crate) fn take_failures(&self) -> Vec<String> {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Router answering every method and path with `handler`.
///
/// `base_url` is prefixed to the request path to rebuild the absolute URL the
/// handler sees.
pub fn app<H>(handler: H, base_url: &str) -> Router
where
    H: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
{
    let base_url = base_url.trim_end_matches('/').to_string();
    router(Arc::new(Shared::new(Arc::new(handler), base_url)))
}

pub(crate) fn router(shared: Arc<Shared>) -> Router {
    Router::new().fallback(serve).with_state(shared)
}

/// Serve `handler` on `listener` until the process exits.
pub async fn run<H>(listener: TcpListener, handler: H) -> Result<(), std::io::Error>
where
    H: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
{
    let addr = listener.local_addr()?;
    axum::serve(listener, app(handler, &format!("http://{addr}"))).await
}

/// `200 OK` with `Content-Type: application/json`.
pub fn json_ok(body: impl Into<String>) -> HttpResponse {
    let body: String = body.into();
    let mut response = HttpResponse::ok(body);
    response
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

async fn serve(State(shared): State<Arc<Shared>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    respond(&shared, &parts, body)
}

fn respond(shared: &Shared, parts: &Parts, body: Vec<u8>) -> Response {
    shared.hits.fetch_add(1, Ordering::SeqCst);
    debug!(method = %parts.method, uri = %parts.uri, "loopback request");

    let inbound = match inbound_request(&shared.base_url, parts, body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "rejected inbound request");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let reply = match catch_unwind(AssertUnwindSafe(|| (shared.handler)(&inbound))) {
        Ok(reply) => reply,
        Err(payload) => {
            let message = panic_message(&*payload);
            error!(%message, "handler panicked");
            shared.record(format!(
                "handler panicked on {} {}: {message}",
                inbound.method(),
                inbound.url()
            ));
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    into_response(reply)
}

/// Rebuild the core request descriptor from what arrived on the wire.
fn inbound_request(
    base_url: &str,
    parts: &Parts,
    body: Vec<u8>,
) -> Result<HttpRequest, ConstructionError> {
    let path = parts.uri.path_and_query().map_or("/", |p| p.as_str());
    let mut request = HttpRequest::parse(parts.method.as_str(), &format!("{base_url}{path}"))?;
    for (name, value) in &parts.headers {
        // Opaque (non-text) values cannot be represented; skip them.
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value)?;
        }
    }
    if !body.is_empty() {
        request = request.with_body(body);
    }
    Ok(request)
}

fn into_response(reply: HttpResponse) -> Response {
    let HttpResponse {
        status,
        headers,
        body,
        ..
    } = reply;
    let Ok(status) = StatusCode::from_u16(status) else {
        error!(status, "handler returned an invalid status code");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let bytes = match body.into_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "draining handler body failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
