//! Test double that answers requests from a caller-supplied function.

use std::fmt;

use tracing::debug;

use crate::error::{ExecutionError, TransportErrorKind};
use crate::executor::Executor;
use crate::http::{HttpRequest, HttpResponse};

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, ExecutionError> + Send + Sync;

/// An [`Executor`] that never touches the network.
///
/// The wrapped function sees every inbound request, so it can both record
/// expectations (see [`crate::AssertionLog`]) and fabricate the reply. Its
/// result is returned verbatim.
pub struct ProgrammableExecutor {
    respond: Box<Responder>,
}

impl ProgrammableExecutor {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
        }
    }

    /// Answer every request with `status` and a fresh copy of `body`.
    pub fn responding(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self::new(move |_| Ok(HttpResponse::new(status, body.clone())))
    }

    /// Fail every request with a transport error of `kind`.
    pub fn failing(kind: TransportErrorKind, message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_| Err(ExecutionError::transport(kind, message.clone())))
    }
}

impl Executor for ProgrammableExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecutionError> {
        debug!(method = %request.method(), url = %request.url(), "programmed response");
        (self.respond)(request)
    }
}

impl fmt::Debug for ProgrammableExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgrammableExecutor").finish_non_exhaustive()
    }
}
