//! Ephemeral loopback server with scoped teardown.
//!
//! # Design
//! The socket is bound and listening before [`LoopbackServer::start`]
//! returns, so a request sent right after it lands in the accept backlog even
//! if the serving thread has not been scheduled yet. Serving happens on a
//! dedicated thread with its own current-thread runtime, which lets
//! synchronous tests use the server without a runtime of their own.
//!
//! Teardown is tied to ownership: [`LoopbackServer::close`] or `Drop` stops
//! the server and joins the thread, so the port is released on every exit
//! path of a test. Open connections get [`DRAIN_TIMEOUT`] to finish; after
//! that the runtime is dropped, which aborts them.

use std::fmt;
use std::future::IntoFuture;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use seams_core::{HttpRequest, HttpResponse};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{router, Shared};

/// How long `close` waits for in-flight connections before aborting them.
pub const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Handler failures collected while the server was running.
#[derive(Debug)]
pub struct HandlerFailures(pub Vec<String>);

impl std::error::Error for HandlerFailures {}

impl fmt::Display for HandlerFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} loopback handler failure(s)", self.0.len())?;
        for failure in &self.0 {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

/// An HTTP server on `127.0.0.1` with a system-chosen port.
///
/// The base URL has the form `http://127.0.0.1:<port>` with no trailing
/// slash.
pub struct LoopbackServer {
    addr: SocketAddr,
    url: String,
    shared: Arc<Shared>,
    shutdown: Option<watch::Sender<bool>>,
    thread: Option<JoinHandle<Result<(), std::io::Error>>>,
}

impl LoopbackServer {
    pub fn start<H>(handler: H) -> Result<Self, std::io::Error>
    where
        H: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        let std_listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let addr = std_listener.local_addr()?;
        std_listener.set_nonblocking(true)?;

        let url = format!("http://{addr}");
        let shared = Arc::new(Shared::new(Arc::new(handler), url.clone()));
        let app = router(shared.clone());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (shutdown, signal) = watch::channel(false);

        let thread = std::thread::Builder::new()
            .name(format!("loopback-{}", addr.port()))
            .spawn(move || {
                // Dropping `runtime` at the end of this closure cancels any
                // connection task still running after the drain timeout.
                runtime.block_on(async move {
                    let listener = TcpListener::from_std(std_listener)?;
                    let drain = signal.clone();
                    let serve = axum::serve(listener, app)
                        .with_graceful_shutdown(stopped(signal))
                        .into_future();
                    tokio::select! {
                        result = serve => result,
                        () = async {
                            stopped(drain).await;
                            tokio::time::sleep(DRAIN_TIMEOUT).await;
                        } => {
                            warn!(timeout = ?DRAIN_TIMEOUT, "aborting connections still open");
                            Ok(())
                        }
                    }
                })
            })?;

        info!(%url, "loopback server listening");
        Ok(Self {
            addr,
            url,
            shared,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Absolute URL for `path` on this server.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of requests the handler has been asked to answer.
    pub fn hits(&self) -> u64 {
        self.shared.hits()
    }

    /// Stop serving, release the socket and report handler panics.
    pub fn close(mut self) -> Result<(), HandlerFailures> {
        self.stop();
        let failures = self.shared.take_failures();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HandlerFailures(failures))
        }
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        let Some(thread) = self.thread.take() else {
            return;
        };
        match thread.join() {
            Ok(Ok(())) => info!(url = %self.url, "loopback server stopped"),
            Ok(Err(e)) => error!(url = %self.url, error = %e, "loopback server failed"),
            Err(_) => error!(url = %self.url, "loopback server thread panicked"),
        }
    }
}

/// Resolves once `close` or `Drop` asks the server to stop.
async fn stopped(mut signal: watch::Receiver<bool>) {
    // A dropped sender also means stop.
    let _ = signal.wait_for(|stop| *stop).await;
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        self.stop();
        let failures = self.shared.take_failures();
        if !failures.is_empty() && !std::thread::panicking() {
            panic!("{}", HandlerFailures(failures));
        }
    }
}

impl fmt::Debug for LoopbackServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackServer")
            .field("url", &self.url)
            .field("hits", &self.hits())
            .finish_non_exhaustive()
    }
}
