//! One-shot cancellable context shared by an orchestrator and its components.
//!
//! A [`Context`] is cancelled at most once; the first reason wins and later
//! calls are ignored. Waiters can block a thread ([`Context::wait`]) or await
//! ([`Context::cancelled`]). Contexts form a tree: cancelling a parent cancels
//! every child created from it.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

/// Reason a context was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Termination signal received (SIGTERM, SIGINT, SIGQUIT, ...)
    Signal(i32),
    /// Cancellation requested programmatically
    Requested,
    /// The parent context was cancelled
    Parent,
    /// Process shutdown with the given exit code
    Shutdown(i32),
    /// The owning orchestrator was dropped
    Dropped,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(sig) => write!(f, "Signal({sig})"),
            Self::Requested => write!(f, "Requested"),
            Self::Parent => write!(f, "Parent"),
            Self::Shutdown(code) => write!(f, "Shutdown({code})"),
            Self::Dropped => write!(f, "Dropped"),
        }
    }
}

struct ContextInner {
    /// Fast-path flag, published after `reason`
    cancelled: AtomicBool,
    /// Reason recorded by the winning `cancel` call
    reason: OnceLock<CancelReason>,
    /// Time the context was cancelled
    cancelled_at: Mutex<Option<Instant>>,
    /// Blocking waiters park on this pair
    done: Mutex<bool>,
    done_cv: Condvar,
    /// Async waiters subscribe here
    done_tx: watch::Sender<bool>,
    /// Contexts derived from this one
    children: Mutex<Vec<Weak<ContextInner>>>,
}

impl ContextInner {
    fn new() -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            cancelled: AtomicBool::new(false),
            reason: OnceLock::new(),
            cancelled_at: Mutex::new(None),
            done: Mutex::new(false),
            done_cv: Condvar::new(),
            done_tx,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self, reason: CancelReason) -> bool {
        if self.reason.set(reason).is_err() {
            debug!("Context already cancelled, ignoring additional request");
            return false;
        }
        self.cancelled.store(true, Ordering::Release);

        *self.cancelled_at.lock() = Some(Instant::now());

        *self.done.lock() = true;
        self.done_cv.notify_all();
        self.done_tx.send_replace(true);

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            let _ = child.cancel(CancelReason::Parent);
        }

        info!(reason = %reason, "Context cancelled");
        true
    }
}

/// Cloneable handle onto a cancellable context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a new root context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner::new()),
        }
    }

    /// Derive a child context, cancelled whenever this one is.
    ///
    /// A child of an already-cancelled context is returned cancelled.
    #[must_use]
    pub fn child(&self) -> Self {
        let child = Self::new();
        let mut children = self.inner.children.lock();
        if self.is_cancelled() {
            drop(children);
            let _ = child.cancel(CancelReason::Parent);
        } else {
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Cancel the context.
    /// Returns true if this call cancelled it, false if it was already cancelled.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.inner.cancel(reason)
    }

    /// Check if the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Get the reason for cancellation (if cancelled).
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        if self.is_cancelled() {
            self.inner.reason.get().copied()
        } else {
            None
        }
    }

    /// Get the time the context was cancelled.
    #[must_use]
    pub fn cancelled_at(&self) -> Option<Instant> {
        *self.inner.cancelled_at.lock()
    }

    /// Block the calling thread until the context is cancelled.
    pub fn wait(&self) {
        let mut done = self.inner.done.lock();
        while !*done {
            self.inner.done_cv.wait(&mut done);
        }
    }

    /// Block until the context is cancelled or `timeout` elapses.
    /// Returns true if the context is cancelled.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.inner.done.lock();
        while !*done {
            if self
                .inner
                .done_cv
                .wait_until(&mut done, deadline)
                .timed_out()
            {
                break;
            }
        }
        *done
    }

    /// Wait asynchronously for cancellation.
    pub async fn cancelled(&self) {
        let mut rx = self.inner.done_tx.subscribe();
        // The sender lives as long as `self`, so this only returns once set.
        let _ = rx.wait_for(|done| *done).await;
    }
}
