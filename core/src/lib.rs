//! Swappable HTTP execution for production code and tests.
//!
//! # Overview
//! Every outbound request goes through the [`Executor`] trait. Production
//! code uses [`UreqExecutor`]; tests substitute a [`ProgrammableExecutor`] or
//! point a production executor at a loopback server.
//!
//! # Design
//! - [`HttpRequest`] is validated on construction and immutable afterwards.
//! - [`HttpResponse`] bodies are lazy, single-pass streams.
//! - The process-wide default client, shared executor and target URL are
//!   only replaced through a [`Substitution`] guard, which serializes tests.
//! - Request-shape expectations are recorded in an [`AssertionLog`] and never
//!   alter what an executor returns.

pub mod assertions;
pub mod calls;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod global;
pub mod http;
pub mod production;
pub mod programmable;

pub use assertions::AssertionLog;
pub use calls::{call_default, call_local, call_shared, call_with, fixed_request};
pub use client::{get, Client};
pub use config::Config;
pub use error::{AssertionFailure, BodyError, ConstructionError, ExecutionError, TransportErrorKind};
pub use executor::Executor;
pub use global::{default_client, shared_executor, target_url, Substitution};
pub use http::{Body, HttpMethod, HttpRequest, HttpResponse};
pub use production::UreqExecutor;
pub use programmable::ProgrammableExecutor;
