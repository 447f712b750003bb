#![forbid(unsafe_code)]

//! The push-based stream primitive.
//!
//! # Design
//!
//! An [`Observable<T>`] wraps a subscription function
//! `Fn(Subscriber<T>) -> Teardown`. Calling [`Observable::subscribe`] runs
//! that function with a fresh [`Subscriber`] and returns a [`Subscription`],
//! the disposer for that one run. Observables are descriptions: each
//! subscription is independent and owns its own state.
//!
//! A subscriber closes in two phases:
//!
//! 1. **Terminal dispatch**: `error` or `complete` is delivered to the
//!    [`Observer`] (skipped when the subscription was cancelled).
//! 2. **Teardown**: every registered [`Teardown`] runs, last registered
//!    first. A teardown attached after the subscriber closed runs at once.
//!
//! Closing drops the observer callbacks, which breaks the reference cycles
//! that nested subscriptions form through their closures.
//!
//! # Invariants
//!
//! 1. At most one terminal event per subscription, never both.
//! 2. Nothing is delivered after a terminal event or after cancellation.
//! 3. The teardown list runs exactly once.
//! 4. No `RefCell` borrow is held while user callbacks run, so callbacks may
//!    re-enter the same subscriber.
//!
//! # Failure Modes
//!
//! - **Dropped subscription**: [`Subscription`] is an RAII guard. Dropping it
//!   unsubscribes, so a handle that is not kept alive cancels the stream.
//! - **Unhandled error**: an error reaching an observer without an error
//!   callback is logged at `warn` level and otherwise discarded.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::dispose::DisposeBag;
use crate::error::StreamError;
use crate::ops::Operator;
use crate::signal::Connection;

type NextFn<T> = Rc<dyn Fn(T)>;
type ErrorFn = Rc<dyn Fn(StreamError)>;
type CompleteFn = Rc<dyn Fn()>;
type SubscribeFn<T> = Rc<dyn Fn(Subscriber<T>) -> Teardown>;

// ---------------------------------------------------------------------------
// Observer<T>
// ---------------------------------------------------------------------------

/// Downstream callbacks for one subscription.
///
/// Every callback is optional. Callbacks are `Fn` so they can be re-entered;
/// keep mutable state in a `Cell`/`RefCell`.
pub struct Observer<T> {
    on_next: Option<NextFn<T>>,
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
}

impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            on_next: self.on_next.clone(),
            on_error: self.on_error.clone(),
            on_complete: self.on_complete.clone(),
        }
    }
}

impl<T> Default for Observer<T> {
    fn default() -> Self {
        Self {
            on_next: None,
            on_error: None,
            on_complete: None,
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("on_next", &self.on_next.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl<T: 'static> Observer<T> {
    /// Observer with only a value callback.
    #[must_use]
    pub fn new(on_next: impl Fn(T) + 'static) -> Self {
        Self {
            on_next: Some(Rc::new(on_next)),
            ..Self::default()
        }
    }

    /// Observer with no callbacks at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the value callback.
    #[must_use]
    pub fn with_next(mut self, on_next: impl Fn(T) + 'static) -> Self {
        self.on_next = Some(Rc::new(on_next));
        self
    }

    /// Set the error callback.
    #[must_use]
    pub fn with_error(mut self, on_error: impl Fn(StreamError) + 'static) -> Self {
        self.on_error = Some(Rc::new(on_error));
        self
    }

    /// Set the completion callback.
    #[must_use]
    pub fn with_complete(mut self, on_complete: impl Fn() + 'static) -> Self {
        self.on_complete = Some(Rc::new(on_complete));
        self
    }
}

/// Relay every event into an existing subscriber.
impl<T: 'static> From<Subscriber<T>> for Observer<T> {
    fn from(subscriber: Subscriber<T>) -> Self {
        let next_sink = subscriber.clone();
        let error_sink = subscriber.clone();
        Observer::new(move |value| next_sink.next(value))
            .with_error(move |err| error_sink.error(err))
            .with_complete(move || subscriber.complete())
    }
}

// ---------------------------------------------------------------------------
// Subscriber<T>
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriberState {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

struct SubscriberInner<T> {
    state: Cell<SubscriberState>,
    observer: RefCell<Option<Observer<T>>>,
    /// Teardown hook list, run last-first when the subscriber closes.
    teardowns: RefCell<Vec<Teardown>>,
}

impl<T> SubscriberInner<T> {
    fn is_pending(&self) -> bool {
        self.state.get() == SubscriberState::Pending
    }

    fn next(&self, value: T) {
        if !self.is_pending() {
            return;
        }
        let callback = self
            .observer
            .borrow()
            .as_ref()
            .and_then(|observer| observer.on_next.clone());
        if let Some(callback) = callback {
            callback(value);
        }
    }

    fn error(&self, err: StreamError) {
        if !self.is_pending() {
            return;
        }
        self.state.set(SubscriberState::Failed);
        let observer = self.observer.borrow_mut().take();
        match observer.and_then(|observer| observer.on_error) {
            Some(callback) => callback(err),
            None => warn!(error = %err, "unhandled stream error"),
        }
        self.run_teardowns();
    }

    fn complete(&self) {
        if !self.is_pending() {
            return;
        }
        self.state.set(SubscriberState::Completed);
        let observer = self.observer.borrow_mut().take();
        if let Some(callback) = observer.and_then(|observer| observer.on_complete) {
            callback();
        }
        self.run_teardowns();
    }

    fn attach(&self, teardown: Teardown) {
        if teardown.is_noop() {
            return;
        }
        if !self.is_pending() {
            teardown.run();
            return;
        }
        // Linked children that already closed have nothing left to cancel.
        let spent: Vec<Teardown> = {
            let mut teardowns = self.teardowns.borrow_mut();
            let (spent, live): (Vec<Teardown>, Vec<Teardown>) = std::mem::take(&mut *teardowns)
                .into_iter()
                .partition(Teardown::is_spent);
            *teardowns = live;
            teardowns.push(teardown);
            spent
        };
        if !spent.is_empty() {
            trace!(released = spent.len(), "pruned closed child links");
        }
        drop(spent);
    }

    fn run_teardowns(&self) {
        // Teardowns may attach more teardowns; drain until stable.
        loop {
            let batch = std::mem::take(&mut *self.teardowns.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for teardown in batch.into_iter().rev() {
                teardown.run();
            }
        }
    }
}

/// Type-erased control surface of a subscriber, used by [`Subscription`].
trait Cancel {
    fn cancel(&self);
    fn is_closed(&self) -> bool;
}

impl<T> Cancel for SubscriberInner<T> {
    fn cancel(&self) {
        if self.is_pending() {
            self.state.set(SubscriberState::Cancelled);
            trace!("subscription cancelled");
        }
        let observer = self.observer.borrow_mut().take();
        drop(observer);
        self.run_teardowns();
    }

    fn is_closed(&self) -> bool {
        !self.is_pending()
    }
}

/// Producer-side handle handed to a subscription function.
///
/// Cloning creates another handle to the same subscription.
pub struct Subscriber<T> {
    inner: Rc<SubscriberInner<T>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("state", &self.inner.state.get())
            .field("teardowns", &self.inner.teardowns.borrow().len())
            .finish()
    }
}

impl<T: 'static> Subscriber<T> {
    fn new(observer: Observer<T>) -> Self {
        Self {
            inner: Rc::new(SubscriberInner {
                state: Cell::new(SubscriberState::Pending),
                observer: RefCell::new(Some(observer)),
                teardowns: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Deliver a value. Ignored once the subscriber is closed.
    pub fn next(&self, value: T) {
        self.inner.next(value);
    }

    /// Deliver the error terminal, then tear down.
    pub fn error(&self, err: impl Into<StreamError>) {
        self.inner.error(err.into());
    }

    /// Deliver the completion terminal, then tear down.
    pub fn complete(&self) {
        self.inner.complete();
    }

    /// Whether a terminal event was delivered or the subscription cancelled.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.inner.is_pending()
    }

    /// Register cleanup to run when this subscriber closes.
    ///
    /// Runs immediately if the subscriber is already closed.
    pub fn add_teardown(&self, teardown: impl Into<Teardown>) {
        self.inner.attach(teardown.into());
    }

    fn subscription(&self) -> Subscription {
        let handle: Rc<dyn Cancel> = self.inner.clone();
        Subscription {
            handle: Some(handle),
        }
    }
}

#[cfg(test)]
impl<T> Subscriber<T> {
    /// Number of live handles to this subscriber.
    pub(crate) fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Number of teardowns waiting to run.
    pub(crate) fn teardown_count(&self) -> usize {
        self.inner.teardowns.borrow().len()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Disposer for one subscription.
///
/// Dropping the `Subscription` unsubscribes. [`unsubscribe`](Self::unsubscribe)
/// may be called any number of times; only the first call has an effect.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    handle: Option<Rc<dyn Cancel>>,
}

impl Subscription {
    /// A subscription that is already closed.
    pub fn closed() -> Self {
        Self { handle: None }
    }

    /// Stop delivery and release every resource held by the subscription.
    pub fn unsubscribe(&self) {
        if let Some(handle) = &self.handle {
            handle.cancel();
        }
    }

    /// Whether the subscription terminated or was cancelled.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.as_ref().is_none_or(|handle| handle.is_closed())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

enum Task {
    Noop,
    Call(Box<dyn FnOnce()>),
    Unsubscribe(Subscription),
    Disconnect(Connection),
    Dispose(Rc<DisposeBag>),
    Cancel(Rc<dyn Cancel>),
    Sequence(Vec<Teardown>),
}

/// A unit of cleanup run when a subscription closes.
pub struct Teardown(Task);

impl Teardown {
    /// Cleanup that does nothing.
    #[must_use]
    pub fn none() -> Self {
        Self(Task::Noop)
    }

    /// Cleanup that calls `f` once.
    #[must_use]
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Self(Task::Call(Box::new(f)))
    }

    /// Cleanup step that calls `complete` on `subscriber`.
    ///
    /// Teardowns only run after the subscriber has left the open state
    /// (terminal event or cancellation), and `complete` is ignored on a closed
    /// subscriber. The step is therefore a guarded no-op: it never reaches the
    /// observer, and a stream that relies on it, such as `from_signal`, ends
    /// silently when unsubscribed.
    #[must_use]
    pub fn complete_on_teardown<T: 'static>(subscriber: &Subscriber<T>) -> Self {
        let subscriber = subscriber.clone();
        Self::from_fn(move || subscriber.complete())
    }

    fn is_noop(&self) -> bool {
        matches!(self.0, Task::Noop)
    }

    fn is_spent(&self) -> bool {
        matches!(&self.0, Task::Cancel(handle) if handle.is_closed())
    }

    /// Run the cleanup now.
    pub fn run(self) {
        match self.0 {
            Task::Noop => {}
            Task::Call(f) => f(),
            Task::Unsubscribe(subscription) => subscription.unsubscribe(),
            Task::Disconnect(connection) => connection.disconnect(),
            Task::Dispose(bag) => bag.dispose(),
            Task::Cancel(handle) => handle.cancel(),
            Task::Sequence(steps) => {
                for step in steps {
                    step.run();
                }
            }
        }
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0 {
            Task::Noop => "Noop",
            Task::Call(_) => "Call",
            Task::Unsubscribe(_) => "Unsubscribe",
            Task::Disconnect(_) => "Disconnect",
            Task::Dispose(_) => "Dispose",
            Task::Cancel(_) => "Cancel",
            Task::Sequence(_) => "Sequence",
        };
        f.debug_tuple("Teardown").field(&kind).finish()
    }
}

impl From<()> for Teardown {
    fn from((): ()) -> Self {
        Self::none()
    }
}

impl From<Subscription> for Teardown {
    fn from(subscription: Subscription) -> Self {
        Self(Task::Unsubscribe(subscription))
    }
}

impl From<Option<Subscription>> for Teardown {
    fn from(subscription: Option<Subscription>) -> Self {
        subscription.map_or_else(Self::none, Self::from)
    }
}

impl From<Connection> for Teardown {
    fn from(connection: Connection) -> Self {
        Self(Task::Disconnect(connection))
    }
}

impl From<Rc<DisposeBag>> for Teardown {
    fn from(bag: Rc<DisposeBag>) -> Self {
        Self(Task::Dispose(bag))
    }
}

/// Steps run in list order.
impl From<Vec<Teardown>> for Teardown {
    fn from(steps: Vec<Teardown>) -> Self {
        Self(Task::Sequence(steps))
    }
}

// ---------------------------------------------------------------------------
// Observable<T>
// ---------------------------------------------------------------------------

/// A lazily subscribed, reusable description of a value sequence.
///
/// Cloning is cheap and shares the subscription function.
pub struct Observable<T> {
    on_subscribe: SubscribeFn<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            on_subscribe: Rc::clone(&self.on_subscribe),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: 'static> Observable<T> {
    /// Wrap a subscription function.
    ///
    /// The function receives the subscriber and returns its cleanup; anything
    /// convertible into a [`Teardown`] works (`()`, a [`Subscription`], a
    /// [`Connection`], an `Rc<DisposeBag>`, ...).
    pub fn new<F, R>(subscribe: F) -> Self
    where
        F: Fn(Subscriber<T>) -> R + 'static,
        R: Into<Teardown>,
    {
        Self {
            on_subscribe: Rc::new(move |subscriber: Subscriber<T>| -> Teardown {
                subscribe(subscriber).into()
            }),
        }
    }

    /// Subscribe with the given callbacks.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let subscriber = Subscriber::new(observer);
        self.run(&subscriber);
        subscriber.subscription()
    }

    /// Subscribe with only a value callback.
    pub fn subscribe_next(&self, on_next: impl Fn(T) + 'static) -> Subscription {
        self.subscribe(Observer::new(on_next))
    }

    /// Subscribe as a child of `parent`.
    ///
    /// The child is cancelled as soon as `parent` closes, including while this
    /// call is still running, so a synchronous source stops emitting once
    /// downstream has finished. Returns an already-closed subscription when
    /// `parent` is closed.
    pub fn subscribe_linked<P: 'static>(
        &self,
        parent: &Subscriber<P>,
        observer: Observer<T>,
    ) -> Subscription {
        if parent.is_closed() {
            return Subscription::closed();
        }
        let child = Subscriber::new(observer);
        let handle: Rc<dyn Cancel> = child.inner.clone();
        parent.inner.attach(Teardown(Task::Cancel(handle)));
        self.run(&child);
        child.subscription()
    }

    /// Apply an operator.
    #[must_use]
    pub fn pipe<U: 'static>(self, operator: Operator<T, U>) -> Observable<U> {
        operator.apply(self)
    }

    fn run(&self, subscriber: &Subscriber<T>) {
        let teardown = (self.on_subscribe)(subscriber.clone());
        subscriber.inner.attach(teardown);
    }
}

#[cfg(test)]
impl<T: 'static> Observable<T> {
    /// Subscribe and also hand back the producer-side handle.
    pub(crate) fn subscribe_exposed(&self, observer: Observer<T>) -> (Subscriber<T>, Subscription) {
        let subscriber = Subscriber::new(observer);
        self.run(&subscriber);
        let subscription = subscriber.subscription();
        (subscriber, subscription)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, Recorder};

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        (count, move || count_clone.set(count_clone.get() + 1))
    }

    #[test]
    fn subscribe_runs_function_per_subscription() {
        let (calls, bump) = counter();
        let obs = Observable::new(move |sub: Subscriber<i32>| {
            bump();
            sub.next(1);
            sub.complete();
        });

        let first = Recorder::new();
        let _a = obs.subscribe(first.observer());
        let second = Recorder::new();
        let _b = obs.subscribe(second.observer());

        assert_eq!(calls.get(), 2);
        assert_eq!(first.events(), vec![Event::Next(1), Event::Complete]);
        assert_eq!(second.events(), vec![Event::Next(1), Event::Complete]);
    }

    #[test]
    fn nothing_after_terminal() {
        let obs = Observable::new(|sub: Subscriber<i32>| {
            sub.next(1);
            sub.error("bad");
            sub.next(2);
            sub.complete();
            sub.error("worse");
        });
        let rec = Recorder::new();
        let _sub = obs.subscribe(rec.observer());
        assert_eq!(
            rec.events(),
            vec![Event::Next(1), Event::Error(StreamError::new("bad"))]
        );
    }

    #[test]
    fn teardown_runs_once_on_complete() {
        let (runs, bump) = counter();
        let slot: Rc<RefCell<Option<Subscriber<i32>>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let bump = Rc::new(bump);
        let obs = Observable::new(move |sub: Subscriber<i32>| {
            *slot_clone.borrow_mut() = Some(sub);
            let bump = Rc::clone(&bump);
            Teardown::from_fn(move || bump())
        });

        let sub = obs.subscribe(Observer::empty());
        assert_eq!(runs.get(), 0);

        let producer = slot.borrow_mut().take().unwrap();
        producer.complete();
        assert_eq!(runs.get(), 1);
        assert!(sub.is_closed());

        sub.unsubscribe();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn teardown_after_sync_completion_runs_immediately() {
        let (runs, bump) = counter();
        let bump = Rc::new(bump);
        let obs = Observable::new(move |sub: Subscriber<i32>| {
            sub.complete();
            let bump = Rc::clone(&bump);
            Teardown::from_fn(move || bump())
        });
        let sub = obs.subscribe(Observer::empty());
        assert_eq!(runs.get(), 1);
        assert!(sub.is_closed());
    }

    #[test]
    fn unsubscribe_is_idempotent_and_stops_delivery() {
        let slot: Rc<RefCell<Option<Subscriber<i32>>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let (runs, bump) = counter();
        let bump = Rc::new(bump);
        let obs = Observable::new(move |sub: Subscriber<i32>| {
            *slot_clone.borrow_mut() = Some(sub);
            let bump = Rc::clone(&bump);
            Teardown::from_fn(move || bump())
        });

        let rec = Recorder::new();
        let sub = obs.subscribe(rec.observer());
        let producer = slot.borrow_mut().take().unwrap();
        producer.next(1);

        sub.unsubscribe();
        sub.unsubscribe();
        producer.next(2);
        producer.complete();

        assert_eq!(runs.get(), 1);
        assert_eq!(rec.events(), vec![Event::Next(1)]);
        assert!(producer.is_closed());
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let (runs, bump) = counter();
        let bump = Rc::new(bump);
        let obs = Observable::new(move |_sub: Subscriber<i32>| {
            let bump = Rc::clone(&bump);
            Teardown::from_fn(move || bump())
        });
        let sub = obs.subscribe(Observer::empty());
        assert!(!sub.is_closed());
        drop(sub);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn teardowns_run_last_registered_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let obs = Observable::new(move |sub: Subscriber<i32>| {
            let first = Rc::clone(&log_clone);
            sub.add_teardown(Teardown::from_fn(move || first.borrow_mut().push("first")));
            let second = Rc::clone(&log_clone);
            sub.add_teardown(Teardown::from_fn(move || second.borrow_mut().push("second")));
            let returned = Rc::clone(&log_clone);
            Teardown::from_fn(move || returned.borrow_mut().push("returned"))
        });
        drop(obs.subscribe(Observer::empty()));
        assert_eq!(*log.borrow(), vec!["returned", "second", "first"]);
    }

    #[test]
    fn sequence_teardown_runs_in_list_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&log);
        let b = Rc::clone(&log);
        Teardown::from(vec![
            Teardown::from_fn(move || a.borrow_mut().push(1)),
            Teardown::none(),
            Teardown::from_fn(move || b.borrow_mut().push(2)),
        ])
        .run();
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn complete_on_teardown_is_suppressed_after_cancel() {
        let obs = Observable::new(|sub: Subscriber<i32>| Teardown::complete_on_teardown(&sub));
        let rec = Recorder::new();
        let sub = obs.subscribe(rec.observer());
        sub.unsubscribe();
        assert!(rec.events().is_empty());
    }

    #[test]
    fn closed_linked_children_are_pruned_from_parent() {
        let parent = Subscriber::new(Observer::<i32>::empty());
        let finishes = Observable::new(|sub: Subscriber<i32>| {
            sub.next(1);
            sub.complete();
        });
        for _ in 0..1000 {
            drop(finishes.subscribe_linked(&parent, Observer::empty()));
        }
        assert!(parent.teardown_count() <= 1, "{parent:?}");

        let stays_open = Observable::new(|_sub: Subscriber<i32>| {});
        let open: Vec<Subscription> = (0..3)
            .map(|_| stays_open.subscribe_linked(&parent, Observer::empty()))
            .collect();
        assert_eq!(parent.teardown_count(), 3);
        for sub in &open {
            sub.unsubscribe();
        }
        drop(finishes.subscribe_linked(&parent, Observer::empty()));
        assert_eq!(parent.teardown_count(), 1);
    }

    #[test]
    fn live_linked_child_is_cancelled_with_parent() {
        let parent = Subscriber::new(Observer::<i32>::empty());
        let rec = Recorder::new();
        let stays_open = Observable::new(|_sub: Subscriber<i32>| {});
        let child = stays_open.subscribe_linked(&parent, rec.observer());
        parent.complete();
        assert!(child.is_closed());
        assert!(rec.events().is_empty());
    }

    #[test]
    fn reentrant_next_is_delivered() {
        let slot: Rc<RefCell<Option<Subscriber<i32>>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let obs = Observable::new(move |sub: Subscriber<i32>| {
            *slot_clone.borrow_mut() = Some(sub);
        });

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let feedback = Rc::clone(&slot);
        let _sub = obs.subscribe_next(move |v| {
            seen_clone.borrow_mut().push(v);
            if v == 1 {
                let producer = feedback.borrow().clone();
                if let Some(producer) = producer {
                    producer.next(2);
                }
            }
        });

        let producer = slot.borrow().clone().unwrap();
        producer.next(1);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn linked_child_is_cancelled_when_parent_closes_mid_subscribe() {
        let emitted = Rc::new(Cell::new(0u32));
        let emitted_clone = Rc::clone(&emitted);
        let endless = Observable::new(move |sub: Subscriber<u32>| {
            let mut i = 0;
            while !sub.is_closed() && i < 1_000 {
                emitted_clone.set(emitted_clone.get() + 1);
                sub.next(i);
                i += 1;
            }
        });

        let first_only = Observable::new(move |parent: Subscriber<u32>| {
            let sink = parent.clone();
            endless.subscribe_linked(
                &parent,
                Observer::new(move |v| {
                    sink.next(v);
                    sink.complete();
                }),
            )
        });

        let rec = Recorder::new();
        let _sub = first_only.subscribe(rec.observer());
        assert_eq!(rec.events(), vec![Event::Next(0), Event::Complete]);
        assert_eq!(emitted.get(), 1);
    }

    #[test]
    fn closed_subscription_reports_closed() {
        let sub = Subscription::closed();
        assert!(sub.is_closed());
        sub.unsubscribe();
    }
}
