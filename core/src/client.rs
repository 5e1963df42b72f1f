//! A client with a pluggable transport, plus the process-wide default client.
//!
//! # Design
//! `Client` is a cheap handle around an `Arc<dyn Executor>`. Swapping the
//! transport of the default client redirects every call made through the
//! free [`get`] helper without touching the code that calls it.

use std::fmt;
use std::sync::Arc;

use crate::error::ExecutionError;
use crate::executor::Executor;
use crate::global;
use crate::http::{HttpRequest, HttpResponse};
use crate::production::UreqExecutor;

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Executor>,
}

impl Client {
    /// A client whose transport is a fresh [`UreqExecutor`].
    pub fn new() -> Self {
        Self::with_transport(UreqExecutor::new())
    }

    pub fn with_transport(transport: impl Executor + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_shared(transport: Arc<dyn Executor>) -> Self {
        Self { transport }
    }

    /// Issue a plain GET with no extra headers.
    pub fn get(&self, url: &str) -> Result<HttpResponse, ExecutionError> {
        let request = HttpRequest::get(url)?;
        self.transport.execute(&request)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for Client {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecutionError> {
        self.transport.execute(request)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

/// GET `url` through the process-wide default client.
pub fn get(url: &str) -> Result<HttpResponse, ExecutionError> {
    global::default_client().get(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programmable::ProgrammableExecutor;

    #[test]
    fn get_goes_through_the_transport() {
        let client = Client::with_transport(ProgrammableExecutor::new(|req| {
            assert_eq!(req.method(), crate::HttpMethod::Get);
            assert!(req.headers().is_empty());
            Ok(HttpResponse::ok("Hello, World!"))
        }));
        let resp = client.get("https://example.com").unwrap();
        assert_eq!(resp.text().unwrap(), "Hello, World!");
    }

    #[test]
    fn get_rejects_bad_url_before_transport() {
        let client = Client::with_transport(ProgrammableExecutor::new(|_| {
            panic!("transport must not be reached")
        }));
        let err = client.get("not a url").unwrap_err();
        assert!(matches!(err, ExecutionError::Construction(_)));
    }
}
