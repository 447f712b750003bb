#![forbid(unsafe_code)]

//! Cancellation, resource scoping and value bundling.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::observable::{Observable, Observer, Subscriber, Subscription, Teardown};
use crate::ops::transform::take;
use crate::ops::{Operator, relay};
use crate::promise::Promise;

/// Relay the source until `notifier` emits a value or completes.
///
/// The notifier is subscribed first. Its first value (payload discarded) or
/// its completion completes the stream and releases both subscriptions. If
/// that happens while the notifier is being subscribed, the source is never
/// subscribed at all. A notifier error is propagated.
pub fn take_until<T: 'static, N: 'static>(notifier: Observable<N>) -> Operator<T> {
    Operator::new(move |source: Observable<T>| {
        let notifier = notifier.clone();
        Observable::new(move |subscriber: Subscriber<T>| {
            let trigger_sink = subscriber.clone();
            let error_sink = subscriber.clone();
            let complete_sink = subscriber.clone();
            let trigger = Observer::new(move |_: N| {
                trace!("take_until notifier fired");
                trigger_sink.complete();
            })
            .with_error(move |err| error_sink.error(err))
            .with_complete(move || complete_sink.complete());
            let notifier_subscription = notifier.subscribe_linked(&subscriber, trigger);
            if subscriber.is_closed() {
                return Teardown::from(notifier_subscription);
            }
            let source_subscription =
                source.subscribe_linked(&subscriber, Observer::from(subscriber.clone()));
            Teardown::from(vec![
                Teardown::from(source_subscription),
                Teardown::from(notifier_subscription),
            ])
        })
    })
}

/// Emit `values` bundled into one `Vec`, then complete.
pub fn packed<T: Clone + 'static>(values: impl IntoIterator<Item = T>) -> Observable<Vec<T>> {
    let values: Vec<T> = values.into_iter().collect();
    Observable::new(move |subscriber: Subscriber<Vec<T>>| {
        subscriber.next(values.clone());
        subscriber.complete();
    })
}

/// Values that may carry a list of items.
pub trait ListLike {
    /// Element type of the list.
    type Item;

    /// The items, or `None` when the value is not a list.
    fn into_list(self) -> Option<Vec<Self::Item>>;
}

impl<T> ListLike for Vec<T> {
    type Item = T;

    fn into_list(self) -> Option<Vec<T>> {
        Some(self)
    }
}

impl<T, const N: usize> ListLike for [T; N] {
    type Item = T;

    fn into_list(self) -> Option<Vec<T>> {
        Some(Vec::from(self))
    }
}

impl<T> ListLike for Option<Vec<T>> {
    type Item = T;

    fn into_list(self) -> Option<Vec<T>> {
        self
    }
}

/// Spread every list-like value into one `Vec` emission.
///
/// A value that is not a list is logged at `warn` level and dropped; the
/// stream continues.
#[must_use]
pub fn unpacked<S>() -> Operator<S, Vec<S::Item>>
where
    S: ListLike + 'static,
    S::Item: 'static,
{
    Operator::new(|source: Observable<S>| {
        Observable::new(move |subscriber: Subscriber<Vec<S::Item>>| {
            source.subscribe_linked(
                &subscriber,
                relay(&subscriber, |sink, value: S| match value.into_list() {
                    Some(items) => sink.next(items),
                    None => warn!(
                        value_type = std::any::type_name::<S>(),
                        "unpacked received a non-list value; emission dropped"
                    ),
                }),
            )
        })
    })
}

/// Scope a resource to each subscription.
///
/// `resource_factory` runs once per subscription and `observable_factory`
/// builds the stream from the resource. The resource is dropped when the
/// subscription closes by completion, error or cancellation, after the
/// inner subscription has been released.
pub fn using<R: 'static, T: 'static>(
    resource_factory: impl Fn() -> R + 'static,
    observable_factory: impl Fn(&R) -> Observable<T> + 'static,
) -> Observable<T> {
    Observable::new(move |subscriber: Subscriber<T>| {
        let resource = resource_factory();
        let observable = observable_factory(&resource);
        subscriber.add_teardown(Teardown::from_fn(move || {
            trace!("releasing scoped resource");
            drop(resource);
        }));
        observable.subscribe_linked(&subscriber, Observer::from(subscriber.clone()))
    })
}

/// Subscribe and capture the first value in a [`Promise`].
///
/// The promise is fulfilled with the first value, rejected with the stream's
/// error, or rejected when the stream completes without a value. The
/// subscription stays alive until the promise settles.
pub fn to_promise<T: Clone + 'static>(observable: &Observable<T>) -> Promise<T> {
    let promise = Promise::pending();
    let keep_alive: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

    let (fulfill, fulfill_slot) = (promise.clone(), Rc::clone(&keep_alive));
    let (fail, fail_slot) = (promise.clone(), Rc::clone(&keep_alive));
    let (finish, finish_slot) = (promise.clone(), Rc::clone(&keep_alive));
    let observer = Observer::new(move |value| {
        fulfill.resolve(value);
        let released = fulfill_slot.borrow_mut().take();
        drop(released);
    })
    .with_error(move |err| {
        fail.reject(err);
        let released = fail_slot.borrow_mut().take();
        drop(released);
    })
    .with_complete(move || {
        finish.reject("completed without a value");
        let released = finish_slot.borrow_mut().take();
        drop(released);
    });

    let subscription = observable.clone().pipe(take(1)).subscribe(observer);
    if !subscription.is_closed() {
        *keep_alive.borrow_mut() = Some(subscription);
    }
    promise
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
