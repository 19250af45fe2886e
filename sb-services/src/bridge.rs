//! Synchronous bridge over asynchronous card completions.
//!
//! Callers block inside `wait` until the completion token they created is
//! resolved from the card's dispatch context. One mutex (holding the
//! manager's state) plus one condition variable form the single shared
//! mutual-exclusion domain: completions lock it, store their outcome, and
//! wake every waiter. Each waiter re-checks its own token's done flag on
//! every wake, so a broadcast that resumes unrelated waiters is harmless.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::warn;

use sb_core::error::{SbError, SbResult};

/// The shared mutual-exclusion domain of one manager instance.
///
/// `S` is the state protected by the domain; public operations and
/// completion delivery both serialize through it.
pub struct Bridge<S> {
    inner: Arc<BridgeInner<S>>,
}

impl<S> Clone for Bridge<S> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct BridgeInner<S> {
    state: Mutex<S>,
    cond: Condvar,
    /// Thread currently inside the domain. Lets a completion resolved on
    /// that same thread (issue-path rejections, dropped requests) deliver
    /// without re-locking, which would self-deadlock.
    holder: Mutex<Option<ThreadId>>,
    dispatch: Mutex<Option<ThreadId>>,
    allow_dispatch_ops: bool,
}

impl<S> BridgeInner<S> {
    fn set_holder(&self, holder: Option<ThreadId>) {
        *self.holder.lock() = holder;
    }

    fn held_by_current_thread(&self) -> bool {
        *self.holder.lock() == Some(thread::current().id())
    }
}

/// Guard over the shared domain. Derefs to the protected state.
pub struct DomainGuard<'a, S> {
    guard: MutexGuard<'a, S>,
    inner: &'a BridgeInner<S>,
}

impl<S> Deref for DomainGuard<'_, S> {
    type Target = S;
    fn deref(&self) -> &S {
        &self.guard
    }
}

impl<S> DerefMut for DomainGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard
    }
}

impl<S> Drop for DomainGuard<'_, S> {
    fn drop(&mut self) {
        // Clear before the mutex itself is released.
        self.inner.set_holder(None);
    }
}

/// Type-erased handle a completion uses to enter the domain.
trait Domain: Send + Sync {
    fn deliver(&self, action: &mut dyn FnMut());
}

impl<S: Send> Domain for BridgeInner<S> {
    fn deliver(&self, action: &mut dyn FnMut()) {
        if self.held_by_current_thread() {
            // Already inside the domain: the issuing call rejected or
            // abandoned its own request before waiting, so no waiter can
            // miss this wakeup.
            action();
            self.cond.notify_all();
            return;
        }
        let _state = self.state.lock();
        action();
        // Broadcast: unrelated waiters re-check their own tokens and go
        // back to sleep.
        self.cond.notify_all();
    }
}

struct Token<T> {
    done: AtomicBool,
    outcome: Mutex<Option<SbResult<T>>>,
}

/// The caller's half of a completion token. Consumed by `Bridge::wait`.
pub struct Pending<T> {
    token: Arc<Token<T>>,
}

/// The producer's half of a completion token.
///
/// Handed to the card store alongside the issued request; resolvable from
/// any thread, exactly once. Dropping an unresolved completion resolves it
/// with a failure so no waiter is left blocked forever.
pub struct Completion<T> {
    domain: Arc<dyn Domain>,
    token: Arc<Token<T>>,
}

impl<T> Completion<T> {
    /// Resolve the token and wake all waiters on the domain.
    pub fn resolve(mut self, outcome: SbResult<T>) {
        self.deliver(outcome);
    }

    /// Resolve with a success payload.
    pub fn succeed(self, value: T) {
        self.resolve(Ok(value));
    }

    /// Resolve with a failure cause.
    pub fn fail(self, err: SbError) {
        self.resolve(Err(err));
    }

    fn deliver(&mut self, outcome: SbResult<T>) {
        let token = &self.token;
        let mut outcome = Some(outcome);
        self.domain.deliver(&mut || {
            *token.outcome.lock() = outcome.take();
            token.done.store(true, Ordering::Release);
        });
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if !self.token.done.load(Ordering::Acquire) {
            warn!("completion dropped unresolved, failing its waiter");
            self.deliver(Err(SbError::Store("request abandoned without a result".into())));
        }
    }
}

impl<S: Send + 'static> Bridge<S> {
    /// Create a bridge owning the given state.
    pub fn new(state: S) -> Self {
        Self::with_options(state, false)
    }

    /// Create a bridge, optionally permitting blocking calls from the
    /// dispatch context (test/experiment escape hatch).
    pub fn with_options(state: S, allow_dispatch_ops: bool) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                state: Mutex::new(state),
                cond: Condvar::new(),
                holder: Mutex::new(None),
                dispatch: Mutex::new(None),
                allow_dispatch_ops,
            }),
        }
    }

    /// Lock the shared domain.
    pub fn lock(&self) -> DomainGuard<'_, S> {
        let guard = self.inner.state.lock();
        self.inner.set_holder(Some(thread::current().id()));
        DomainGuard { guard, inner: &self.inner }
    }

    /// Create a fresh completion token pair for one operation.
    pub fn pending<T: Send + 'static>(&self) -> (Pending<T>, Completion<T>) {
        let token = Arc::new(Token {
            done: AtomicBool::new(false),
            outcome: Mutex::new(None),
        });
        let pending = Pending { token: token.clone() };
        let completion = Completion { domain: self.inner.clone(), token };
        (pending, completion)
    }

    /// Block until `pending`'s token is resolved, then return its outcome.
    ///
    /// The caller must already hold the domain guard; the wait releases it
    /// while sleeping and re-acquires it before returning. Spurious and
    /// broadcast wakes are absorbed by re-checking the token's own flag.
    pub fn wait<T>(&self, guard: &mut DomainGuard<'_, S>, pending: Pending<T>) -> SbResult<T> {
        while !pending.token.done.load(Ordering::Acquire) {
            self.inner.set_holder(None);
            self.inner.cond.wait(&mut guard.guard);
            self.inner.set_holder(Some(thread::current().id()));
        }
        pending.token.outcome.lock().take().unwrap_or_else(|| {
            Err(SbError::Internal("completed token carried no outcome".into()))
        })
    }

    /// Register the calling thread as the completion-dispatch context.
    ///
    /// Must be called from that thread before it starts delivering
    /// completions, so `ensure_callable` can recognize it.
    pub fn bind_dispatch_thread(&self) {
        *self.inner.dispatch.lock() = Some(thread::current().id());
    }

    /// Fail fast when invoked from the completion-dispatch context.
    ///
    /// Blocking there would deadlock the bridge: the thread that must
    /// deliver the completion would be the one waiting for it.
    pub fn ensure_callable(&self) -> SbResult<()> {
        if self.inner.allow_dispatch_ops {
            return Ok(());
        }
        if *self.inner.dispatch.lock() == Some(thread::current().id()) {
            return Err(SbError::DispatchContext(
                "blocking phonebook call on the completion-dispatch thread".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_resolved_value() {
        let bridge: Bridge<()> = Bridge::new(());
        let (pending, completion) = bridge.pending::<u32>();

        let resolver = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completion.succeed(7);
        });

        let mut guard = bridge.lock();
        let value = bridge.wait(&mut guard, pending).unwrap();
        drop(guard);
        assert_eq!(value, 7);
        resolver.join().unwrap();
    }

    #[test]
    fn test_wait_surfaces_failure() {
        let bridge: Bridge<()> = Bridge::new(());
        let (pending, completion) = bridge.pending::<u32>();
        completion.fail(SbError::Store("card removed".into()));

        let mut guard = bridge.lock();
        let err = bridge.wait(&mut guard, pending).unwrap_err();
        assert!(matches!(err, SbError::Store(_)));
    }

    #[test]
    fn test_broadcast_wake_routes_each_outcome_to_its_own_waiter() {
        let bridge: Bridge<()> = Bridge::new(());
        let mut completions = Vec::new();
        let mut waiters = Vec::new();

        for i in 0..8u32 {
            let (pending, completion) = bridge.pending::<u32>();
            completions.push(completion);
            let bridge = bridge.clone();
            waiters.push(thread::spawn(move || {
                let mut guard = bridge.lock();
                let value = bridge.wait(&mut guard, pending).unwrap();
                assert_eq!(value, i * 10);
                value
            }));
        }

        // Resolve out of order, from a foreign thread, all in a burst.
        // Every resolution wakes every waiter; each must pick out only its
        // own outcome.
        let resolver = thread::spawn(move || {
            for (i, completion) in completions.into_iter().enumerate().rev() {
                completion.succeed(i as u32 * 10);
            }
        });

        let mut total = 0;
        for waiter in waiters {
            total += waiter.join().unwrap();
        }
        assert_eq!(total, (0..8).map(|i| i * 10).sum::<u32>());
        resolver.join().unwrap();
    }

    #[test]
    fn test_already_resolved_token_does_not_block() {
        let bridge: Bridge<()> = Bridge::new(());
        let (pending, completion) = bridge.pending::<bool>();
        completion.succeed(true);

        // Resolution happened before the wait; the done flag short-circuits.
        let mut guard = bridge.lock();
        assert!(bridge.wait(&mut guard, pending).unwrap());
    }

    #[test]
    fn test_resolve_while_holding_the_domain_does_not_deadlock() {
        let bridge: Bridge<()> = Bridge::new(());
        let mut guard = bridge.lock();

        // An issue path that rejects its own request resolves (or drops)
        // the completion while the domain is held.
        let (pending, completion) = bridge.pending::<u32>();
        completion.fail(SbError::Store("rejected before issue".into()));
        assert!(bridge.wait(&mut guard, pending).is_err());

        let (pending, completion) = bridge.pending::<u32>();
        drop(completion);
        assert!(bridge.wait(&mut guard, pending).is_err());
    }

    #[test]
    fn test_dropped_completion_fails_waiter() {
        let bridge: Bridge<()> = Bridge::new(());
        let (pending, completion) = bridge.pending::<u32>();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            drop(completion);
        });

        let mut guard = bridge.lock();
        let err = bridge.wait(&mut guard, pending).unwrap_err();
        assert!(matches!(err, SbError::Store(_)));
    }

    #[test]
    fn test_dispatch_thread_guard() {
        let bridge: Bridge<()> = Bridge::new(());
        assert!(bridge.ensure_callable().is_ok());

        bridge.bind_dispatch_thread();
        let err = bridge.ensure_callable().unwrap_err();
        assert!(matches!(err, SbError::DispatchContext(_)));

        // Other threads stay callable
        let other = {
            let bridge = bridge.clone();
            thread::spawn(move || bridge.ensure_callable().is_ok())
        };
        assert!(other.join().unwrap());
    }

    #[test]
    fn test_dispatch_guard_escape_hatch() {
        let bridge: Bridge<()> = Bridge::with_options((), true);
        bridge.bind_dispatch_thread();
        assert!(bridge.ensure_callable().is_ok());
    }
}
