#![forbid(unsafe_code)]

//! Higher-order flattening: operators over streams of streams.
//!
//! The outer stream emits inner Observables. [`merge_all`] subscribes to
//! every inner concurrently, [`switch_all`] only to the newest one. Both keep
//! their bookkeeping in an explicit per-subscription state struct and both
//! are fail-fast: an error from the outer or from a live inner closes the
//! whole stream and releases every inner subscription.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::observable::{Observable, Observer, Subscriber, Subscription, Teardown};
use crate::ops::Operator;
use crate::ops::transform::map;

// ---------------------------------------------------------------------------
// merge_all
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MergeState {
    outer_complete: bool,
    /// Inner subscriptions that have not terminated.
    active: usize,
    next_key: u64,
    inner: BTreeMap<u64, Subscription>,
}

impl MergeState {
    fn open_inner(&mut self) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.active += 1;
        key
    }

    /// Mark an inner as finished. Returns its stored subscription, if any,
    /// so the caller can drop it outside the borrow.
    fn close_inner(&mut self, key: u64) -> Option<Subscription> {
        self.active = self.active.saturating_sub(1);
        self.inner.remove(&key)
    }

    fn is_done(&self) -> bool {
        self.outer_complete && self.active == 0
    }
}

/// Flatten by subscribing to every inner stream as it arrives.
///
/// Values are relayed in arrival order. Completes once the outer stream and
/// every inner stream have completed.
#[must_use]
pub fn merge_all<T: 'static>() -> Operator<Observable<T>, T> {
    Operator::new(|source: Observable<Observable<T>>| {
        Observable::new(move |subscriber: Subscriber<T>| {
            let state = Rc::new(RefCell::new(MergeState::default()));

            let release = Rc::clone(&state);
            subscriber.add_teardown(Teardown::from_fn(move || {
                let inner = std::mem::take(&mut release.borrow_mut().inner);
                trace!(open = inner.len(), "releasing merged inner subscriptions");
                drop(inner);
            }));

            let inner_state = Rc::clone(&state);
            let inner_sink = subscriber.clone();
            let on_inner = move |inner: Observable<T>| {
                let key = inner_state.borrow_mut().open_inner();
                let next_sink = inner_sink.clone();
                let error_sink = inner_sink.clone();
                let complete_sink = inner_sink.clone();
                let complete_state = Rc::clone(&inner_state);
                let observer = Observer::new(move |value| next_sink.next(value))
                    .with_error(move |err| {
                        debug!(error = %err, "inner stream failed; tearing down merge");
                        error_sink.error(err);
                    })
                    .with_complete(move || {
                        let (finished, done) = {
                            let mut state = complete_state.borrow_mut();
                            (state.close_inner(key), state.is_done())
                        };
                        drop(finished);
                        if done {
                            complete_sink.complete();
                        }
                    });
                let subscription = inner.subscribe_linked(&inner_sink, observer);
                if !subscription.is_closed() && !inner_sink.is_closed() {
                    inner_state.borrow_mut().inner.insert(key, subscription);
                }
            };

            let outer_state = Rc::clone(&state);
            let error_sink = subscriber.clone();
            let complete_sink = subscriber.clone();
            let observer = Observer::new(on_inner)
                .with_error(move |err| {
                    debug!(error = %err, "outer stream failed; tearing down merge");
                    error_sink.error(err);
                })
                .with_complete(move || {
                    let done = {
                        let mut state = outer_state.borrow_mut();
                        state.outer_complete = true;
                        state.is_done()
                    };
                    if done {
                        complete_sink.complete();
                    }
                });
            source.subscribe_linked(&subscriber, observer)
        })
    })
}

/// Map every value to an inner stream and merge the results.
pub fn flat_map<T: 'static, U: 'static>(
    project: impl Fn(T) -> Observable<U> + 'static,
) -> Operator<T, U> {
    map(project).then(merge_all())
}

// ---------------------------------------------------------------------------
// switch_all
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SwitchState {
    outer_complete: bool,
    /// Whether the current inner (if any) has completed.
    inner_complete: bool,
    /// Identity of the newest inner; callbacks tagged otherwise are stale.
    current_id: u64,
    current: Option<Subscription>,
}

impl Default for SwitchState {
    fn default() -> Self {
        Self {
            outer_complete: false,
            inner_complete: true,
            current_id: 0,
            current: None,
        }
    }
}

impl SwitchState {
    /// Start a new inner. Returns its id and the superseded subscription.
    fn supersede(&mut self) -> (u64, Option<Subscription>) {
        self.current_id += 1;
        self.inner_complete = false;
        (self.current_id, self.current.take())
    }

    fn is_current(&self, id: u64) -> bool {
        self.current_id == id
    }

    fn is_done(&self) -> bool {
        self.outer_complete && self.inner_complete
    }
}

/// Flatten by subscribing only to the newest inner stream.
///
/// Each inner cancels its predecessor before being subscribed. Events from a
/// superseded inner are ignored, including its error. Completes once the
/// outer stream and the current inner have both completed.
#[must_use]
pub fn switch_all<T: 'static>() -> Operator<Observable<T>, T> {
    Operator::new(|source: Observable<Observable<T>>| {
        Observable::new(move |subscriber: Subscriber<T>| {
            let state = Rc::new(RefCell::new(SwitchState::default()));

            let release = Rc::clone(&state);
            subscriber.add_teardown(Teardown::from_fn(move || {
                let current = release.borrow_mut().current.take();
                drop(current);
            }));

            let inner_state = Rc::clone(&state);
            let inner_sink = subscriber.clone();
            let on_inner = move |inner: Observable<T>| {
                let (id, previous) = inner_state.borrow_mut().supersede();
                if let Some(previous) = previous {
                    debug!(id, "inner stream superseded");
                    drop(previous);
                }

                let (next_state, next_sink) = (Rc::clone(&inner_state), inner_sink.clone());
                let (error_state, error_sink) = (Rc::clone(&inner_state), inner_sink.clone());
                let (complete_state, complete_sink) =
                    (Rc::clone(&inner_state), inner_sink.clone());
                let observer = Observer::new(move |value| {
                    if next_state.borrow().is_current(id) {
                        next_sink.next(value);
                    } else {
                        trace!(id, "stale inner value ignored");
                    }
                })
                .with_error(move |err| {
                    if error_state.borrow().is_current(id) {
                        debug!(error = %err, "inner stream failed; tearing down switch");
                        error_sink.error(err);
                    } else {
                        trace!(id, error = %err, "stale inner error ignored");
                    }
                })
                .with_complete(move || {
                    let (finished, done) = {
                        let mut state = complete_state.borrow_mut();
                        if !state.is_current(id) {
                            trace!(id, "stale inner completion ignored");
                            return;
                        }
                        state.inner_complete = true;
                        (state.current.take(), state.is_done())
                    };
                    drop(finished);
                    if done {
                        complete_sink.complete();
                    }
                });

                let subscription = inner.subscribe_linked(&inner_sink, observer);
                let keep = inner_state.borrow().is_current(id)
                    && !subscription.is_closed()
                    && !inner_sink.is_closed();
                if keep {
                    inner_state.borrow_mut().current = Some(subscription);
                }
            };

            let outer_state = Rc::clone(&state);
            let error_sink = subscriber.clone();
            let complete_sink = subscriber.clone();
            let observer = Observer::new(on_inner)
                .with_error(move |err| {
                    debug!(error = %err, "outer stream failed; tearing down switch");
                    error_sink.error(err);
                })
                .with_complete(move || {
                    let done = {
                        let mut state = outer_state.borrow_mut();
                        state.outer_complete = true;
                        state.is_done()
                    };
                    if done {
                        complete_sink.complete();
                    }
                });
            source.subscribe_linked(&subscriber, observer)
        })
    })
}

/// Map every value to an inner stream and follow only the newest one.
pub fn switch_map<T: 'static, U: 'static>(
    project: impl Fn(T) -> Observable<U> + 'static,
) -> Operator<T, U> {
    map(project).then(switch_all())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
