//! Production executor backed by a blocking [`ureq`] agent.
//!
//! Status codes are handed back as data: a 404 or 500 is a successful
//! execution with that status, only transport problems become errors.

use tracing::{debug, warn};

use crate::error::{ExecutionError, TransportErrorKind};
use crate::executor::Executor;
use crate::http::{Body, HttpRequest, HttpResponse};

/// An [`Executor`] that performs real network I/O through [`ureq`].
#[derive(Debug, Clone)]
pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl UreqExecutor {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use an agent configured by the caller (proxies, TLS roots, ...).
    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecutionError> {
        debug!(method = %request.method(), url = %request.url(), "executing request");

        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method()))
            .uri(request.url().as_str());
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        let result = match request.body() {
            Some(body) => {
                let req = builder
                    .body(body.to_vec())
                    .map_err(|e| ExecutionError::transport(TransportErrorKind::Other, e))?;
                self.agent.run(req)
            }
            None => {
                let req = builder
                    .body(())
                    .map_err(|e| ExecutionError::transport(TransportErrorKind::Other, e))?;
                self.agent.run(req)
            }
        };

        match result {
            Ok(resp) => Ok(convert_response(resp)),
            Err(e) => Err(map_ureq_error(e)),
        }
    }
}

/// Wrap a ureq response without reading its body.
fn convert_response(response: http::Response<ureq::Body>) -> HttpResponse {
    let (parts, body) = response.into_parts();
    debug!(status = parts.status.as_u16(), "received response");
    HttpResponse {
        status: parts.status.as_u16(),
        status_text: parts.status.canonical_reason().unwrap_or("").to_string(),
        headers: parts.headers,
        body: Body::from_reader(body.into_reader()),
    }
}

fn map_ureq_error(err: ureq::Error) -> ExecutionError {
    let kind = match &err {
        ureq::Error::HostNotFound => TransportErrorKind::Resolution,
        ureq::Error::ConnectionFailed | ureq::Error::Io(_) => TransportErrorKind::Connection,
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::Tls(_) => TransportErrorKind::Tls,
        ureq::Error::Protocol(_) => TransportErrorKind::Protocol,
        _ => TransportErrorKind::Other,
    };
    warn!(%kind, error = %err, "request failed");
    ExecutionError::transport(kind, err)
}
