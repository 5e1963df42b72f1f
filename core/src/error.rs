//! Error types for request construction, execution and body draining.
//!
//! # Design
//! `ConstructionError` is raised before any I/O happens. `ExecutionError` is
//! the error half of every `Executor::execute` result; transport failures keep
//! their original error as `source` so the cause chain survives. Failed
//! request-shape assertions are deliberately absent here: they are reported
//! through [`crate::AssertionLog`] and never change what an executor returns.

use std::error::Error as StdError;
use std::fmt;

/// A request descriptor could not be built.
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    #[error("unsupported HTTP method `{0}`")]
    InvalidMethod(String),

    #[error("invalid URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Parsed, but not usable as a request target (e.g. `mailto:`).
    #[error("URL `{0}` cannot be used as a request target")]
    RelativeUrl(String),

    #[error("invalid header name `{0}`")]
    InvalidHeaderName(String),

    #[error("invalid header value `{0}`")]
    InvalidHeaderValue(String),
}

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS lookup failed.
    Resolution,
    /// Connection refused, reset or otherwise failed.
    Connection,
    Timeout,
    Tls,
    /// The peer spoke malformed HTTP.
    Protocol,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::Resolution => "name resolution failed",
            TransportErrorKind::Connection => "connection failed",
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Tls => "TLS failure",
            TransportErrorKind::Protocol => "protocol error",
            TransportErrorKind::Other => "transport failure",
        };
        f.write_str(s)
    }
}

/// Returned by `Executor::execute` when no response could be produced.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("transport error: {kind}")]
    Transport {
        kind: TransportErrorKind,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ExecutionError {
    pub fn transport(
        kind: TransportErrorKind,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        ExecutionError::Transport {
            kind,
            source: source.into(),
        }
    }

    /// The transport category, or `None` for construction failures.
    pub fn kind(&self) -> Option<TransportErrorKind> {
        match self {
            ExecutionError::Transport { kind, .. } => Some(*kind),
            ExecutionError::Construction(_) => None,
        }
    }
}

/// A response body could not be drained or decoded.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("reading body failed")]
    Io(#[from] std::io::Error),

    #[error("body is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// One failed request-shape expectation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AssertionFailure {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_keeps_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ExecutionError::transport(TransportErrorKind::Connection, io);
        assert_eq!(err.to_string(), "transport error: connection failed");
        assert_eq!(err.kind(), Some(TransportErrorKind::Connection));
        assert_eq!(err.source().unwrap().to_string(), "refused");
    }

    #[test]
    fn construction_error_is_transparent() {
        let err: ExecutionError = ConstructionError::InvalidMethod("BREW".into()).into();
        assert_eq!(err.to_string(), "unsupported HTTP method `BREW`");
        assert!(err.kind().is_none());
    }
}
