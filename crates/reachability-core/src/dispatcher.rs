//! Dispatcher threads for queued signal delivery.
//!
//! A [`Dispatcher`] owns one named worker thread that executes queued
//! invocations strictly in the order they were posted. Queued signal
//! connections use it so that their slots always run on the same, known
//! execution context, no matter which thread emitted the signal.
//!
//! # How It Works
//!
//! 1. A queued slot invocation is wrapped in a [`QueuedInvocation`] closure.
//! 2. The invocation is sent over a `crossbeam-channel` to the worker thread.
//! 3. The worker executes invocations one at a time, in FIFO order.
//!
//! The worker exits once every `Dispatcher` handle has been dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::error::{CoreError, Result};
use crate::logging::targets;

/// Name of the process-wide dispatcher thread.
pub const GLOBAL_DISPATCHER_NAME: &str = "reachability-dispatcher";

static GLOBAL_DISPATCHER: OnceLock<Option<Dispatcher>> = OnceLock::new();

/// A type-erased queued invocation that can be executed later.
pub struct QueuedInvocation {
    invoke: Box<dyn FnOnce() + Send>,
    completion: Option<CompletionHandle>,
}

impl QueuedInvocation {
    /// Create a new queued invocation.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            invoke: Box::new(invoke),
            completion: None,
        }
    }

    /// Create a new queued invocation that signals `completion` once it ran.
    pub fn with_completion<F>(invoke: F, completion: CompletionHandle) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            invoke: Box::new(invoke),
            completion: Some(completion),
        }
    }

    /// Execute the invocation.
    pub fn execute(self) {
        let Self { invoke, completion } = self;
        if catch_unwind(AssertUnwindSafe(invoke)).is_err() {
            tracing::error!(target: targets::DISPATCHER, "queued invocation panicked");
        }
        if let Some(completion) = completion {
            completion.signal_done();
        }
    }
}

/// The sending half of a completion pair.
pub struct CompletionHandle {
    inner: Arc<CompletionState>,
}

impl CompletionHandle {
    fn signal_done(self) {
        let mut done = self.inner.done.lock();
        *done = true;
        self.inner.condvar.notify_all();
    }
}

/// A waiter for blocking on invocation completion.
pub struct CompletionWaiter {
    inner: Arc<CompletionState>,
}

impl CompletionWaiter {
    /// Block until the paired invocation has executed.
    pub fn wait(self) {
        let mut done = self.inner.done.lock();
        while !*done {
            self.inner.condvar.wait(&mut done);
        }
    }

    /// Block until the paired invocation has executed or `timeout` elapsed.
    ///
    /// Returns `true` if the invocation completed.
    pub fn wait_timeout(self, timeout: Duration) -> bool {
        let mut done = self.inner.done.lock();
        if *done {
            return true;
        }
        let result = self.inner.condvar.wait_for(&mut done, timeout);
        *done || !result.timed_out()
    }
}

struct CompletionState {
    done: Mutex<bool>,
    condvar: Condvar,
}

/// Create a completion handle/waiter pair.
pub fn completion_pair() -> (CompletionHandle, CompletionWaiter) {
    let state = Arc::new(CompletionState {
        done: Mutex::new(false),
        condvar: Condvar::new(),
    });

    (
        CompletionHandle {
            inner: state.clone(),
        },
        CompletionWaiter { inner: state },
    )
}

/// Handle to a dispatcher thread.
///
/// Cloning the handle is cheap; all clones post to the same thread.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    name: String,
    sender: Sender<QueuedInvocation>,
    thread_id: ThreadId,
}

impl Dispatcher {
    /// Spawn a new dispatcher thread with the given name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded();

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_dispatcher(receiver))
            .map_err(CoreError::DispatcherSpawn)?;

        tracing::debug!(target: targets::DISPATCHER, name = %name, "dispatcher started");

        Ok(Self {
            inner: Arc::new(DispatcherInner {
                name,
                sender,
                thread_id: handle.thread().id(),
            }),
        })
    }

    /// The process-wide dispatcher used by [`ConnectionType::Queued`](crate::ConnectionType::Queued).
    ///
    /// Returns `None` only if the thread could not be spawned.
    pub fn global() -> Option<&'static Dispatcher> {
        GLOBAL_DISPATCHER
            .get_or_init(|| match Dispatcher::new(GLOBAL_DISPATCHER_NAME) {
                Ok(dispatcher) => Some(dispatcher),
                Err(err) => {
                    tracing::error!(target: targets::DISPATCHER, error = %err, "failed to start global dispatcher");
                    None
                }
            })
            .as_ref()
    }

    /// The dispatcher's thread name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The id of the dispatcher's worker thread.
    pub fn thread_id(&self) -> ThreadId {
        self.inner.thread_id
    }

    /// Returns `true` when called from this dispatcher's worker thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.inner.thread_id
    }

    /// Queue a closure for execution on the dispatcher thread.
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_invocation(QueuedInvocation::new(f))
    }

    /// Queue a prepared invocation.
    pub fn post_invocation(&self, invocation: QueuedInvocation) -> Result<()> {
        self.inner
            .sender
            .send(invocation)
            .map_err(|_| CoreError::DispatcherClosed(self.inner.name.clone()))
    }

    /// Block until every invocation posted before this call has executed.
    ///
    /// Returns `false` on timeout or if the dispatcher is gone. Calling this
    /// from the dispatcher thread itself returns `true` immediately.
    pub fn flush(&self, timeout: Duration) -> bool {
        if self.is_current() {
            return true;
        }
        let (handle, waiter) = completion_pair();
        if self
            .post_invocation(QueuedInvocation::with_completion(|| {}, handle))
            .is_err()
        {
            return false;
        }
        waiter.wait_timeout(timeout)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.inner.name)
            .field("thread_id", &self.inner.thread_id)
            .finish()
    }
}

fn run_dispatcher(receiver: Receiver<QueuedInvocation>) {
    for invocation in receiver.iter() {
        invocation.execute();
    }
    tracing::debug!(target: targets::DISPATCHER, "dispatcher stopped");
}
