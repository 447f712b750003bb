#![forbid(unsafe_code)]

//! Single-upstream operators that relay events 1:1.
//!
//! Each operator here subscribes to exactly one upstream per downstream
//! subscription, preserves value order, and passes terminal events through
//! unchanged. Panics in user closures are not caught.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::StreamError;
use crate::observable::{Observable, Observer, Subscriber, Subscription};
use crate::ops::{Operator, relay};

/// Run `on_next` for every value, passing values through untouched.
pub fn tap<T: 'static>(on_next: impl Fn(&T) + 'static) -> Operator<T> {
    tap_all(on_next, |_| {}, || {})
}

/// Run side effects for every event, passing events through untouched.
///
/// Each hook runs before the event is forwarded downstream.
pub fn tap_all<T: 'static>(
    on_next: impl Fn(&T) + 'static,
    on_error: impl Fn(&StreamError) + 'static,
    on_complete: impl Fn() + 'static,
) -> Operator<T> {
    let on_next = Rc::new(on_next);
    let on_error = Rc::new(on_error);
    let on_complete = Rc::new(on_complete);
    Operator::new(move |source: Observable<T>| {
        let (on_next, on_error, on_complete) = (
            Rc::clone(&on_next),
            Rc::clone(&on_error),
            Rc::clone(&on_complete),
        );
        Observable::new(move |subscriber: Subscriber<T>| {
            let next_sink = subscriber.clone();
            let error_sink = subscriber.clone();
            let complete_sink = subscriber.clone();
            let (on_next, on_error, on_complete) = (
                Rc::clone(&on_next),
                Rc::clone(&on_error),
                Rc::clone(&on_complete),
            );
            let observer = Observer::new(move |value: T| {
                on_next(&value);
                next_sink.next(value);
            })
            .with_error(move |err| {
                on_error(&err);
                error_sink.error(err);
            })
            .with_complete(move || {
                on_complete();
                complete_sink.complete();
            });
            source.subscribe_linked(&subscriber, observer)
        })
    })
}

/// Transform every value with `project`.
pub fn map<T: 'static, U: 'static>(project: impl Fn(T) -> U + 'static) -> Operator<T, U> {
    let project = Rc::new(project);
    Operator::new(move |source: Observable<T>| {
        let project = Rc::clone(&project);
        Observable::new(move |subscriber: Subscriber<U>| {
            let project = Rc::clone(&project);
            source.subscribe_linked(
                &subscriber,
                relay(&subscriber, move |sink, value| sink.next(project(value))),
            )
        })
    })
}

/// Replace every value with a clone of `value`.
pub fn map_to<T: 'static, U: Clone + 'static>(value: U) -> Operator<T, U> {
    map(move |_| value.clone())
}

/// Relay only the values for which `predicate` holds.
#[doc(alias = "where")]
pub fn filter<T: 'static>(predicate: impl Fn(&T) -> bool + 'static) -> Operator<T> {
    let predicate = Rc::new(predicate);
    Operator::new(move |source: Observable<T>| {
        let predicate = Rc::clone(&predicate);
        Observable::new(move |subscriber: Subscriber<T>| {
            let predicate = Rc::clone(&predicate);
            source.subscribe_linked(
                &subscriber,
                relay(&subscriber, move |sink, value| {
                    if predicate(&value) {
                        sink.next(value);
                    }
                }),
            )
        })
    })
}

/// Emit the values produced by `prefix` and then subscribe to the source.
fn prefixed<T: 'static>(prefix: Rc<dyn Fn() -> Vec<T>>) -> Operator<T> {
    Operator::new(move |source: Observable<T>| {
        let prefix = Rc::clone(&prefix);
        Observable::new(move |subscriber: Subscriber<T>| {
            for value in prefix() {
                if subscriber.is_closed() {
                    break;
                }
                subscriber.next(value);
            }
            if subscriber.is_closed() {
                return Subscription::closed();
            }
            source.subscribe_linked(&subscriber, Observer::from(subscriber.clone()))
        })
    })
}

/// Emit `factory()` before any source value.
pub fn start<T: 'static>(factory: impl Fn() -> T + 'static) -> Operator<T> {
    prefixed(Rc::new(move || vec![factory()]))
}

/// Emit every value of `factory()` before any source value.
pub fn start_from<T: 'static>(factory: impl Fn() -> Vec<T> + 'static) -> Operator<T> {
    prefixed(Rc::new(factory))
}

/// Emit `values` before any source value.
pub fn start_with<T: Clone + 'static>(values: impl IntoIterator<Item = T>) -> Operator<T> {
    let values: Vec<T> = values.into_iter().collect();
    prefixed(Rc::new(move || values.clone()))
}

/// Emit the running accumulation of `accumulate` over the values, starting
/// from `seed`.
pub fn scan<T: 'static, A: Clone + 'static>(
    seed: A,
    accumulate: impl Fn(&A, T) -> A + 'static,
) -> Operator<T, A> {
    let accumulate = Rc::new(accumulate);
    Operator::new(move |source: Observable<T>| {
        let accumulate = Rc::clone(&accumulate);
        let seed = seed.clone();
        Observable::new(move |subscriber: Subscriber<A>| {
            let accumulate = Rc::clone(&accumulate);
            let acc = RefCell::new(seed.clone());
            source.subscribe_linked(
                &subscriber,
                relay(&subscriber, move |sink, value| {
                    let current = acc.borrow().clone();
                    let next = accumulate(&current, value);
                    *acc.borrow_mut() = next.clone();
                    sink.next(next);
                }),
            )
        })
    })
}

/// Relay the first `count` values, then complete and release the source.
pub fn take<T: 'static>(count: usize) -> Operator<T> {
    Operator::new(move |source: Observable<T>| {
        Observable::new(move |subscriber: Subscriber<T>| {
            if count == 0 {
                subscriber.complete();
                return Subscription::closed();
            }
            let seen = Cell::new(0usize);
            source.subscribe_linked(
                &subscriber,
                relay(&subscriber, move |sink, value| {
                    seen.set(seen.get() + 1);
                    sink.next(value);
                    if seen.get() >= count {
                        sink.complete();
                    }
                }),
            )
        })
    })
}

/// Drop the first `count` values.
pub fn skip<T: 'static>(count: usize) -> Operator<T> {
    Operator::new(move |source: Observable<T>| {
        Observable::new(move |subscriber: Subscriber<T>| {
            let skipped = Cell::new(0usize);
            source.subscribe_linked(
                &subscriber,
                relay(&subscriber, move |sink, value| {
                    if skipped.get() < count {
                        skipped.set(skipped.get() + 1);
                    } else {
                        sink.next(value);
                    }
                }),
            )
        })
    })
}

/// Drop values equal to the previously relayed one.
pub fn distinct_until_changed<T: Clone + PartialEq + 'static>() -> Operator<T> {
    Operator::new(|source: Observable<T>| {
        Observable::new(move |subscriber: Subscriber<T>| {
            let last: RefCell<Option<T>> = RefCell::new(None);
            source.subscribe_linked(
                &subscriber,
                relay(&subscriber, move |sink, value: T| {
                    let repeated = last.borrow().as_ref() == Some(&value);
                    if !repeated {
                        *last.borrow_mut() = Some(value.clone());
                        sink.next(value);
                    }
                }),
            )
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
