#![forbid(unsafe_code)]

//! Operators over several upstream sources.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use crate::dispose::DisposeBag;
use crate::observable::{Observable, Observer, Subscriber, Teardown};

/// Relay every value of every source as it arrives.
///
/// Completes once all sources have completed (immediately when there are
/// none). The first error from any source is propagated at once and every
/// other source is released.
pub fn merge<T: 'static>(sources: impl IntoIterator<Item = Observable<T>>) -> Observable<T> {
    let sources: Rc<[Observable<T>]> = sources.into_iter().collect();
    Observable::new(move |subscriber: Subscriber<T>| {
        if sources.is_empty() {
            subscriber.complete();
            return Teardown::none();
        }
        let bag = Rc::new(DisposeBag::new());
        let pending = Rc::new(Cell::new(sources.len()));
        for (index, source) in sources.iter().enumerate() {
            if subscriber.is_closed() {
                break;
            }
            let next_sink = subscriber.clone();
            let error_sink = subscriber.clone();
            let complete_sink = subscriber.clone();
            let pending = Rc::clone(&pending);
            let observer = Observer::new(move |value| next_sink.next(value))
                .with_error(move |err| {
                    debug!(source = index, error = %err, "merged source failed");
                    error_sink.error(err);
                })
                .with_complete(move || {
                    let left = pending.get().saturating_sub(1);
                    pending.set(left);
                    if left == 0 {
                        complete_sink.complete();
                    }
                });
            let subscription = source.subscribe_linked(&subscriber, observer);
            if !subscription.is_closed() {
                bag.add(subscription);
            }
        }
        Teardown::from(bag)
    })
}

/// Per-subscription bookkeeping of [`combine_latest`].
#[derive(Debug)]
struct CombineState<K, T> {
    /// Latest value per key; `None` until that source first emits.
    latest: BTreeMap<K, Option<T>>,
    /// Keys still holding `None`.
    unset: usize,
    /// Sources that have not completed.
    pending: usize,
}

impl<K: Ord + Clone, T: Clone> CombineState<K, T> {
    fn new(keys: impl Iterator<Item = K>) -> Self {
        let latest: BTreeMap<K, Option<T>> = keys.map(|key| (key, None)).collect();
        let count = latest.len();
        Self {
            latest,
            unset: count,
            pending: count,
        }
    }

    /// Record `value` for `key`; returns the combined snapshot once every
    /// key has a value.
    fn update(&mut self, key: &K, value: T) -> Option<BTreeMap<K, T>> {
        if let Some(slot) = self.latest.get_mut(key) {
            if slot.is_none() {
                self.unset -= 1;
            }
            *slot = Some(value);
        }
        if self.unset > 0 {
            return None;
        }
        Some(
            self.latest
                .iter()
                .filter_map(|(key, value)| value.clone().map(|value| (key.clone(), value)))
                .collect(),
        )
    }

    /// Record a completed source; returns whether all have completed.
    fn complete_one(&mut self) -> bool {
        self.pending = self.pending.saturating_sub(1);
        self.pending == 0
    }
}

/// Combine keyed sources into snapshots of their latest values.
///
/// Nothing is emitted until every source has produced a value; after that,
/// each value from any source emits a fresh snapshot of all keys. Completes
/// once every source has completed (immediately, with no value, when there
/// are no sources). An error from any source is propagated at once and the
/// remaining sources are released.
pub fn combine_latest<K, T>(sources: BTreeMap<K, Observable<T>>) -> Observable<BTreeMap<K, T>>
where
    K: Ord + Clone + 'static,
    T: Clone + 'static,
{
    let sources = Rc::new(sources);
    Observable::new(move |subscriber: Subscriber<BTreeMap<K, T>>| {
        if sources.is_empty() {
            subscriber.complete();
            return Teardown::none();
        }
        let state = Rc::new(RefCell::new(CombineState::<K, T>::new(
            sources.keys().cloned(),
        )));
        let bag = Rc::new(DisposeBag::new());
        for (key, source) in sources.iter() {
            if subscriber.is_closed() {
                break;
            }
            let (next_state, next_sink, next_key) =
                (Rc::clone(&state), subscriber.clone(), key.clone());
            let (complete_state, complete_sink) = (Rc::clone(&state), subscriber.clone());
            let error_sink = subscriber.clone();
            let observer = Observer::new(move |value: T| {
                let snapshot = next_state.borrow_mut().update(&next_key, value);
                if let Some(snapshot) = snapshot {
                    next_sink.next(snapshot);
                }
            })
            .with_error(move |err| {
                debug!(error = %err, "combined source failed");
                error_sink.error(err);
            })
            .with_complete(move || {
                let done = complete_state.borrow_mut().complete_one();
                if done {
                    complete_sink.complete();
                }
            });
            let subscription = source.subscribe_linked(&subscriber, observer);
            if !subscription.is_closed() {
                bag.add(subscription);
            }
        }
        Teardown::from(bag)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
