//! The three call sites.
//!
//! # Design
//! All three issue the same GET against [`crate::target_url`]. They differ
//! only in where the executor comes from, and therefore in how a test swaps
//! it out:
//!
//! - [`call_default`]: the free [`crate::get`] helper, i.e. the transport of
//!   the process-wide default client.
//! - [`call_shared`]: the process-wide shared executor.
//! - [`call_local`]: a production executor built on the spot. Only the target
//!   URL can be redirected, typically at a loopback server.
//!
//! [`call_with`] is the injected form the last two are built on. New code
//! should prefer it, since it needs no process-wide state.

use crate::client;
use crate::error::ExecutionError;
use crate::executor::Executor;
use crate::global;
use crate::http::{HttpRequest, HttpResponse};
use crate::production::UreqExecutor;

/// Build the fixed request: `GET url` with `Accept: application/json`.
pub fn fixed_request(url: &str) -> Result<HttpRequest, ExecutionError> {
    Ok(HttpRequest::get(url)?.with_header("Accept", "application/json")?)
}

/// Send the fixed request for `url` through `executor`, returning its result
/// unmodified.
pub fn call_with<E: Executor + ?Sized>(
    executor: &E,
    url: &str,
) -> Result<HttpResponse, ExecutionError> {
    let request = fixed_request(url)?;
    executor.execute(&request)
}

/// Plain GET through the default client.
pub fn call_default() -> Result<HttpResponse, ExecutionError> {
    client::get(&global::target_url())
}

pub fn call_shared() -> Result<HttpResponse, ExecutionError> {
    let executor = global::shared_executor();
    call_with(executor.as_ref(), &global::target_url())
}

pub fn call_local() -> Result<HttpResponse, ExecutionError> {
    let executor = UreqExecutor::new();
    call_with(&executor, &global::target_url())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;
    use crate::http::HttpMethod;
    use crate::programmable::ProgrammableExecutor;

    #[test]
    fn fixed_request_shape() {
        let req = fixed_request("https://example.com").unwrap();
        assert_eq!(req.method(), HttpMethod::Get);
        assert_eq!(req.header("Accept"), Some("application/json"));
        assert!(req.body().is_none());
    }

    #[test]
    fn call_with_passes_response_through() {
        let exec = ProgrammableExecutor::responding(200, r#"{"key":"value"}"#);
        let resp = call_with(&exec, "https://example.com").unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.text().unwrap(), r#"{"key":"value"}"#);
    }

    #[test]
    fn call_with_passes_error_through() {
        let exec = ProgrammableExecutor::failing(TransportErrorKind::Resolution, "no such host");
        let err = call_with(&exec, "https://example.com").unwrap_err();
        assert_eq!(err.kind(), Some(TransportErrorKind::Resolution));
    }

    #[test]
    fn call_with_rejects_invalid_url_without_executing() {
        let exec = ProgrammableExecutor::new(|_| panic!("executor must not run"));
        let err = call_with(&exec, "example.com").unwrap_err();
        assert!(matches!(err, ExecutionError::Construction(_)));
    }
}
