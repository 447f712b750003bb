#![forbid(unsafe_code)]

//! One-shot eventual value.
//!
//! A [`Promise<T>`] starts pending and settles at most once, either
//! fulfilled with a value or rejected with a [`StreamError`]. Settlement
//! callbacks registered with [`Promise::on_settle`] run synchronously, in
//! registration order, at the moment the promise settles (or immediately if
//! it already has).
//!
//! # Invariants
//!
//! 1. The first `resolve`/`reject` wins; later calls return `false`.
//! 2. For each `on_settle` registration exactly one of its two callbacks
//!    runs, at most once.
//! 3. No borrow is held while callbacks run, so a callback may register
//!    further callbacks or inspect the promise.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{StreamError, WaitError};

struct Waiter<T> {
    on_fulfilled: Box<dyn FnOnce(T)>,
    on_rejected: Box<dyn FnOnce(StreamError)>,
}

enum PromiseState<T> {
    Pending(Vec<Waiter<T>>),
    Fulfilled(T),
    Rejected(StreamError),
}

/// A shared, single-threaded eventual value.
///
/// Cloning creates another handle to the same promise.
pub struct Promise<T> {
    state: Rc<RefCell<PromiseState<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let mut dbg = f.debug_struct("Promise");
        match &*state {
            PromiseState::Pending(waiters) => dbg.field("pending_waiters", &waiters.len()),
            PromiseState::Fulfilled(value) => dbg.field("fulfilled", value),
            PromiseState::Rejected(err) => dbg.field("rejected", err),
        };
        dbg.finish()
    }
}

impl<T: Clone + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::pending()
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// A promise that has not settled.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            state: Rc::new(RefCell::new(PromiseState::Pending(Vec::new()))),
        }
    }

    /// A promise already fulfilled with `value`.
    #[must_use]
    pub fn fulfilled(value: T) -> Self {
        Self {
            state: Rc::new(RefCell::new(PromiseState::Fulfilled(value))),
        }
    }

    /// A promise already rejected with `err`.
    #[must_use]
    pub fn rejected(err: impl Into<StreamError>) -> Self {
        Self {
            state: Rc::new(RefCell::new(PromiseState::Rejected(err.into()))),
        }
    }

    /// Fulfill the promise. Returns `false` if it had already settled.
    pub fn resolve(&self, value: T) -> bool {
        let Some(waiters) = self.settle(PromiseState::Fulfilled(value.clone())) else {
            return false;
        };
        for waiter in waiters {
            (waiter.on_fulfilled)(value.clone());
        }
        true
    }

    /// Reject the promise. Returns `false` if it had already settled.
    pub fn reject(&self, err: impl Into<StreamError>) -> bool {
        let err = err.into();
        let Some(waiters) = self.settle(PromiseState::Rejected(err.clone())) else {
            return false;
        };
        for waiter in waiters {
            (waiter.on_rejected)(err.clone());
        }
        true
    }

    /// Whether the promise is still pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Pending(_))
    }

    /// Whether the promise was fulfilled.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Fulfilled(_))
    }

    /// Whether the promise was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Rejected(_))
    }

    /// Read the settled outcome.
    ///
    /// # Errors
    ///
    /// [`WaitError::Pending`] if the promise has not settled,
    /// [`WaitError::Rejected`] if it was rejected.
    pub fn wait(&self) -> Result<T, WaitError> {
        match &*self.state.borrow() {
            PromiseState::Pending(_) => Err(WaitError::Pending),
            PromiseState::Fulfilled(value) => Ok(value.clone()),
            PromiseState::Rejected(err) => Err(WaitError::Rejected(err.clone())),
        }
    }

    /// Register settlement callbacks. Exactly one of them runs, once.
    pub fn on_settle(
        &self,
        on_fulfilled: impl FnOnce(T) + 'static,
        on_rejected: impl FnOnce(StreamError) + 'static,
    ) {
        let outcome = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                PromiseState::Pending(waiters) => {
                    waiters.push(Waiter {
                        on_fulfilled: Box::new(on_fulfilled),
                        on_rejected: Box::new(on_rejected),
                    });
                    return;
                }
                PromiseState::Fulfilled(value) => Ok(value.clone()),
                PromiseState::Rejected(err) => Err(err.clone()),
            }
        };
        match outcome {
            Ok(value) => on_fulfilled(value),
            Err(err) => on_rejected(err),
        }
    }

    /// Swap in a settled state and hand back the waiters, or `None` if the
    /// promise had already settled.
    fn settle(&self, settled: PromiseState<T>) -> Option<Vec<Waiter<T>>> {
        let mut state = self.state.borrow_mut();
        if !matches!(*state, PromiseState::Pending(_)) {
            return None;
        }
        match std::mem::replace(&mut *state, settled) {
            PromiseState::Pending(waiters) => Some(waiters),
            PromiseState::Fulfilled(_) | PromiseState::Rejected(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
