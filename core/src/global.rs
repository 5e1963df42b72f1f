//! Process-wide substitution points.
//!
//! Three values live here: the default [`Client`] used by [`crate::get`], the
//! shared executor used by [`crate::call_shared`], and the target URL every
//! call site requests. They are global mutable state, so tests must only
//! replace them through a [`Substitution`] guard. The guard holds a
//! process-wide lock for its lifetime, which serializes such tests even when
//! the harness runs them in parallel, and restores the old values on drop.

use std::cell::Cell;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::debug;

use crate::client::Client;
use crate::config::Config;
use crate::executor::Executor;
use crate::production::UreqExecutor;

static DEFAULT_CLIENT: LazyLock<RwLock<Client>> = LazyLock::new(|| RwLock::new(Client::new()));

static SHARED_EXECUTOR: LazyLock<RwLock<Arc<dyn Executor>>> =
    LazyLock::new(|| RwLock::new(Arc::new(UreqExecutor::new())));

static TARGET_URL: LazyLock<RwLock<String>> =
    LazyLock::new(|| RwLock::new(Config::from_env().target_url));

static SERIAL: Mutex<()> = Mutex::new(());

thread_local! {
    // Set while this thread holds `SERIAL`; the lock is not reentrant.
    static HOLDS_SERIAL: Cell<bool> = const { Cell::new(false) };
}

pub fn default_client() -> Client {
    DEFAULT_CLIENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn shared_executor() -> Arc<dyn Executor> {
    SHARED_EXECUTOR
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn target_url() -> String {
    TARGET_URL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn replace<T>(slot: &LazyLock<RwLock<T>>, value: T) -> T {
    let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *guard, value)
}

/// Scoped replacement of the process-wide values.
///
/// ```no_run
/// use seams_core::{call_shared, ProgrammableExecutor, Substitution};
///
/// let _env = Substitution::begin()
///     .shared_executor(ProgrammableExecutor::responding(200, r#"{"key":"value"}"#));
/// let resp = call_shared().unwrap();
/// assert_eq!(resp.status, 200);
/// ```
#[must_use = "values are restored as soon as the substitution is dropped"]
pub struct Substitution {
    default_client: Option<Client>,
    shared_executor: Option<Arc<dyn Executor>>,
    target_url: Option<String>,
    _serial: MutexGuard<'static, ()>,
}

impl Substitution {
    /// Wait for any other active substitution to end, then start a new one.
    ///
    /// A test that panicked while holding the lock poisons it; that is
    /// ignored because its values were already restored during unwinding.
    ///
    /// # Panics
    /// If this thread already holds a `Substitution`. Chain the replacements
    /// on the existing guard instead.
    #[track_caller]
    pub fn begin() -> Self {
        if HOLDS_SERIAL.with(Cell::get) {
            panic!(
                "nested Substitution::begin on one thread; \
                 chain replacements on the existing guard"
            );
        }
        let serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        HOLDS_SERIAL.with(|held| held.set(true));
        Self {
            default_client: None,
            shared_executor: None,
            target_url: None,
            _serial: serial,
        }
    }

    /// Replace the transport of the default client.
    pub fn default_transport(self, transport: impl Executor + 'static) -> Self {
        self.default_client(Client::with_transport(transport))
    }

    pub fn default_client(mut self, client: Client) -> Self {
        let previous = replace(&DEFAULT_CLIENT, client);
        self.default_client.get_or_insert(previous);
        self
    }

    pub fn shared_executor(mut self, executor: impl Executor + 'static) -> Self {
        let executor: Arc<dyn Executor> = Arc::new(executor);
        let previous = replace(&SHARED_EXECUTOR, executor);
        self.shared_executor.get_or_insert(previous);
        self
    }

    pub fn target_url(mut self, url: impl Into<String>) -> Self {
        let previous = replace(&TARGET_URL, url.into());
        debug!(url = %target_url(), "target URL substituted");
        self.target_url.get_or_insert(previous);
        self
    }
}

impl Drop for Substitution {
    fn drop(&mut self) {
        if let Some(client) = self.default_client.take() {
            replace(&DEFAULT_CLIENT, client);
        }
        if let Some(executor) = self.shared_executor.take() {
            replace(&SHARED_EXECUTOR, executor);
        }
        if let Some(url) = self.target_url.take() {
            replace(&TARGET_URL, url);
        }
        HOLDS_SERIAL.with(|held| held.set(false));
    }
}
