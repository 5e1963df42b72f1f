//! Side channel for request-shape expectations.
//!
//! # Design
//! A mock transport or loopback handler must still answer the request when
//! the request looks wrong, so expectations are recorded rather than raised.
//! The test owns a clone of the log and calls [`AssertionLog::verify`] once
//! the call site has returned.

use std::sync::{Arc, Mutex, PoisonError};

use url::Url;

use crate::error::AssertionFailure;
use crate::http::{HttpMethod, HttpRequest};

#[derive(Debug, Clone, Default)]
pub struct AssertionLog {
    failures: Arc<Mutex<Vec<AssertionFailure>>>,
}

impl AssertionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` unless `condition` holds. Returns `condition`.
    pub fn check(&self, condition: bool, message: impl Into<String>) -> bool {
        if !condition {
            self.record(message.into());
        }
        condition
    }

    pub fn expect_method(&self, request: &HttpRequest, expected: HttpMethod) -> bool {
        self.check(
            request.method() == expected,
            format!(
                "expected request method '{expected}', got: {}",
                request.method()
            ),
        )
    }

    /// Compare the first value of header `name` with `expected`.
    pub fn expect_header(&self, request: &HttpRequest, name: &str, expected: &str) -> bool {
        let actual = request.header(name);
        self.check(
            actual == Some(expected),
            format!(
                "expected request header '{name}: {expected}', got: {}",
                actual.unwrap_or("<missing>")
            ),
        )
    }

    /// Compare the request URL with `expected` after both are normalized,
    /// so `https://a.test` matches `https://a.test/` but `/v1/` stays
    /// distinct from `/v1`.
    pub fn expect_url(&self, request: &HttpRequest, expected: &str) -> bool {
        let actual = request.url();
        let matches = Url::parse(expected).is_ok_and(|expected| &expected == actual);
        self.check(
            matches,
            format!("expected request URL '{expected}', got: {actual}"),
        )
    }

    pub fn failures(&self) -> Vec<AssertionFailure> {
        self.lock().clone()
    }

    pub fn is_clean(&self) -> bool {
        self.lock().is_empty()
    }

    /// Panic with every recorded failure, if there are any.
    #[track_caller]
    pub fn verify(&self) {
        let failures = self.failures();
        if failures.is_empty() {
            return;
        }
        let lines: Vec<String> = failures.iter().map(|f| format!("  - {f}")).collect();
        panic!(
            "{} request expectation(s) failed:\n{}",
            failures.len(),
            lines.join("\n")
        );
    }

    fn record(&self, message: String) {
        tracing::debug!(%message, "request expectation failed");
        self.lock().push(AssertionFailure { message });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AssertionFailure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
