//! UI-thread dispatcher.
//!
//! Every piece of UI state lives on one thread. Other threads (input reader,
//! auto-repeat timer, user workers) hand it closures through a
//! [`DispatcherHandle`]; the UI loop runs them once per iteration with
//! [`Dispatcher::drain`]. The pending list sits behind one mutex, and a
//! condvar wakes the loop when something arrives.

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use log::trace;

use crate::error::{UsageError, fatal};

type Action<T> = Box<dyn FnOnce(&mut T) + Send>;

struct Pending<T> {
    actions: Vec<Action<T>>,
    woken: bool,
    closed: bool,
}

struct Shared<T> {
    pending: Mutex<Pending<T>>,
    signal: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Pending<T>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned by the UI thread.
pub struct Dispatcher<T> {
    shared: Arc<Shared<T>>,
    ui_thread: ThreadId,
}

impl<T> Dispatcher<T> {
    /// Create a dispatcher bound to the calling thread.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(Pending {
                    actions: Vec::new(),
                    woken: false,
                    closed: false,
                }),
                signal: Condvar::new(),
            }),
            ui_thread: thread::current().id(),
        }
    }

    pub fn handle(&self) -> DispatcherHandle<T> {
        DispatcherHandle {
            shared: Arc::clone(&self.shared),
            ui_thread: self.ui_thread,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.shared.lock().actions.is_empty()
    }

    /// Run every action posted so far against `state`. Actions posted while
    /// draining wait for the next call.
    pub fn drain(&self, state: &mut T) -> usize {
        let actions = {
            let mut pending = self.shared.lock();
            pending.woken = false;
            std::mem::take(&mut pending.actions)
        };
        let n = actions.len();
        for action in actions {
            action(state);
        }
        if n > 0 {
            trace!("dispatcher ran {n} actions");
        }
        n
    }

    /// Block until an action is posted, [`DispatcherHandle::wake`] is called,
    /// or `timeout` passes. Returns true if there is work.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self.shared.lock();
        while pending.actions.is_empty() && !pending.woken {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            pending = self
                .shared
                .signal
                .wait_timeout(pending, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
        let woken = pending.woken;
        pending.woken = false;
        woken || !pending.actions.is_empty()
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        let mut pending = self.shared.lock();
        pending.closed = true;
        pending.actions.clear();
    }
}

/// Cross-thread access to a [`Dispatcher`]. Cheap to clone.
pub struct DispatcherHandle<T> {
    shared: Arc<Shared<T>>,
    ui_thread: ThreadId,
}

impl<T> Clone for DispatcherHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            ui_thread: self.ui_thread,
        }
    }
}

impl<T: 'static> DispatcherHandle<T> {
    /// Queue `action` for the UI thread and return immediately.
    ///
    /// Returns false once the dispatcher is gone.
    pub fn post(&self, action: impl FnOnce(&mut T) + Send + 'static) -> bool {
        let mut pending = self.shared.lock();
        if pending.closed {
            return false;
        }
        pending.actions.push(Box::new(action));
        drop(pending);
        self.shared.signal.notify_all();
        true
    }

    /// Queue `action` after `delay`, from a short-lived timer thread.
    pub fn post_delayed(&self, delay: Duration, action: impl FnOnce(&mut T) + Send + 'static) {
        let handle = self.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            handle.post(action);
        });
    }

    /// Run `action` on the UI thread and block until it returns.
    ///
    /// Fatal when called from the UI thread itself, or if the dispatcher is
    /// dropped before the action runs.
    #[track_caller]
    pub fn invoke<R: Send + 'static>(
        &self,
        action: impl FnOnce(&mut T) -> R + Send + 'static,
    ) -> R {
        if thread::current().id() == self.ui_thread {
            fatal(UsageError::InvokeFromUiThread);
        }
        let (tx, rx) = mpsc::channel();
        let posted = self.post(move |state| {
            let _ = tx.send(action(state));
        });
        if !posted {
            fatal(UsageError::DispatcherClosed);
        }
        match rx.recv() {
            Ok(value) => value,
            Err(_) => fatal(UsageError::DispatcherClosed),
        }
    }

    /// Wake the UI loop without posting anything.
    pub fn wake(&self) {
        self.shared.lock().woken = true;
        self.shared.signal.notify_all();
    }
}
