//! The single substitution point between call sites and the network.

use std::sync::Arc;

use crate::error::ExecutionError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP request and yields exactly one response or one error.
///
/// Implemented by [`crate::UreqExecutor`] for real traffic and by
/// [`crate::ProgrammableExecutor`] for tests. A loopback server is reached
/// through the production executor pointed at the server's URL.
pub trait Executor: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecutionError>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecutionError> {
        (**self).execute(request)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecutionError> {
        (**self).execute(request)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExecutionError> {
        (**self).execute(request)
    }
}
