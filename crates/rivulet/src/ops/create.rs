#![forbid(unsafe_code)]

//! Source constructors.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::error::{StreamError, WaitError};
use crate::observable::{Observable, Observer, Subscriber, Teardown};
use crate::promise::Promise;
use crate::signal::Signal;

/// Emit `values` synchronously, in order, then complete.
pub fn of<T: Clone + 'static>(values: impl IntoIterator<Item = T>) -> Observable<T> {
    let values: Rc<[T]> = values.into_iter().collect();
    Observable::new(move |subscriber: Subscriber<T>| {
        for value in values.iter() {
            if subscriber.is_closed() {
                return;
            }
            subscriber.next(value.clone());
        }
        subscriber.complete();
    })
}

/// Complete immediately without emitting.
#[must_use]
pub fn empty<T: 'static>() -> Observable<T> {
    Observable::new(|subscriber: Subscriber<T>| subscriber.complete())
}

/// Never emit and never terminate.
#[must_use]
pub fn never<T: 'static>() -> Observable<T> {
    Observable::new(|_subscriber: Subscriber<T>| {})
}

/// Error immediately with `err`.
pub fn throw_error<T: 'static>(err: impl Into<StreamError>) -> Observable<T> {
    let err = err.into();
    Observable::new(move |subscriber: Subscriber<T>| subscriber.error(err.clone()))
}

/// Build a fresh Observable with `factory` for every subscription.
pub fn defer<T: 'static>(factory: impl Fn() -> Observable<T> + 'static) -> Observable<T> {
    Observable::new(move |subscriber: Subscriber<T>| {
        factory().subscribe_linked(&subscriber, Observer::from(subscriber.clone()))
    })
}

/// Values that can be turned into an [`Observable`].
///
/// Implemented for lists (emitted with [`of`]), promises (converted with
/// [`from_promise`]) and Observables themselves.
pub trait IntoObservable<T> {
    /// Perform the conversion.
    fn into_observable(self) -> Observable<T>;
}

impl<T: 'static> IntoObservable<T> for Observable<T> {
    fn into_observable(self) -> Observable<T> {
        self
    }
}

impl<T: Clone + 'static> IntoObservable<T> for Vec<T> {
    fn into_observable(self) -> Observable<T> {
        of(self)
    }
}

impl<T: Clone + 'static, const N: usize> IntoObservable<T> for [T; N] {
    fn into_observable(self) -> Observable<T> {
        of(self)
    }
}

impl<T: Clone + 'static> IntoObservable<T> for Promise<T> {
    fn into_observable(self) -> Observable<T> {
        from_promise(self)
    }
}

/// Convert `item` by shape; see [`IntoObservable`].
pub fn from<T, I: IntoObservable<T>>(item: I) -> Observable<T> {
    item.into_observable()
}

/// Emit every value fired by `signal`.
///
/// The stream never completes: teardown disconnects from the signal and then
/// runs [`Teardown::complete_on_teardown`], which is a no-op on the already
/// closed subscriber. Unsubscribing therefore ends the stream silently.
pub fn from_signal<T: Clone + 'static>(signal: &Signal<T>) -> Observable<T> {
    let signal = signal.clone();
    Observable::new(move |subscriber: Subscriber<T>| {
        let sink = subscriber.clone();
        let connection = signal.connect(move |value: &T| sink.next(value.clone()));
        Teardown::from(vec![
            Teardown::from(connection),
            Teardown::complete_on_teardown(&subscriber),
        ])
    })
}

/// Emit the fulfilled value of `promise` and complete, or error with its
/// rejection.
///
/// A settled promise is delivered synchronously. For a pending one the
/// settlement callbacks share a per-subscription slot that teardown clears,
/// so neither outcome is delivered after the subscription closes.
pub fn from_promise<T: Clone + 'static>(promise: Promise<T>) -> Observable<T> {
    Observable::new(move |subscriber: Subscriber<T>| {
        match promise.wait() {
            Ok(value) => {
                subscriber.next(value);
                subscriber.complete();
                return Teardown::none();
            }
            Err(WaitError::Rejected(err)) => {
                subscriber.error(err);
                return Teardown::none();
            }
            Err(WaitError::Pending) => {}
        }

        // Waiters reach the subscriber through this slot; teardown empties it
        // so a promise that never settles does not keep the subscriber alive.
        let slot = Rc::new(RefCell::new(Some(subscriber)));
        let (fulfilled_slot, rejected_slot) = (Rc::clone(&slot), Rc::clone(&slot));
        promise.on_settle(
            move |value| {
                let sink = fulfilled_slot.borrow_mut().take();
                match sink {
                    Some(sink) => {
                        sink.next(value);
                        sink.complete();
                    }
                    None => trace!("promise fulfilled after teardown; dropped"),
                }
            },
            move |err| {
                let sink = rejected_slot.borrow_mut().take();
                match sink {
                    Some(sink) => sink.error(err),
                    None => trace!("promise rejected after teardown; dropped"),
                }
            },
        );
        Teardown::from_fn(move || {
            let released = slot.borrow_mut().take();
            drop(released);
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
