#![forbid(unsafe_code)]

//! Stream operators.
//!
//! Unary operators are values of type [`Operator<T, U>`]: reusable
//! transformers from `Observable<T>` to `Observable<U>`. They are applied
//! with [`Observable::pipe`], chained with [`Operator::then`], or composed
//! from a list with [`pipe`].
//!
//! ```
//! use rivulet::ops::{filter, map, of, pipe};
//! use rivulet::testing::Recorder;
//!
//! let doubled_big = pipe([map(|x: i32| x * 2), filter(|x: &i32| *x > 4)]);
//! let rec = Recorder::new();
//! let _sub = of([1, 2, 3, 4]).pipe(doubled_big).subscribe(rec.observer());
//! assert_eq!(rec.values(), vec![6, 8]);
//! ```
//!
//! # Families
//!
//! - [`create`]: sources (`of`, `from`, `from_signal`, `from_promise`, ...).
//! - [`transform`]: one upstream, 1:1 event relay (`map`, `filter`, ...).
//! - [`flatten`]: streams of streams (`merge_all`, `switch_all`, ...).
//! - [`combine`]: several upstreams (`merge`, `combine_latest`).
//! - [`lifecycle`]: cancellation and resources (`take_until`, `using`, ...).
//!
//! Every operator subscribes upstream lazily, once per downstream
//! subscription, and releases everything it holds when that subscription
//! closes. Errors are fail-fast.

pub mod combine;
pub mod create;
pub mod flatten;
pub mod lifecycle;
pub mod transform;

pub use combine::{combine_latest, merge};
pub use create::{
    IntoObservable, defer, empty, from, from_promise, from_signal, never, of, throw_error,
};
pub use flatten::{flat_map, merge_all, switch_all, switch_map};
pub use lifecycle::{ListLike, packed, take_until, to_promise, unpacked, using};
pub use transform::{
    distinct_until_changed, filter, map, map_to, scan, skip, start, start_from, start_with,
    take, tap, tap_all,
};

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::observable::{Observable, Observer, Subscriber};

type ApplyFn<T, U> = Rc<dyn Fn(Observable<T>) -> Observable<U>>;

/// A reusable transformer from `Observable<T>` to `Observable<U>`.
pub struct Operator<T, U = T> {
    apply: ApplyFn<T, U>,
}

impl<T, U> Clone for Operator<T, U> {
    fn clone(&self) -> Self {
        Self {
            apply: Rc::clone(&self.apply),
        }
    }
}

impl<T, U> fmt::Debug for Operator<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator").finish_non_exhaustive()
    }
}

impl<T: 'static, U: 'static> Operator<T, U> {
    /// Wrap a transformer function.
    pub fn new(apply: impl Fn(Observable<T>) -> Observable<U> + 'static) -> Self {
        Self {
            apply: Rc::new(apply),
        }
    }

    /// Transform `source`.
    #[must_use]
    pub fn apply(&self, source: Observable<T>) -> Observable<U> {
        (self.apply)(source)
    }

    /// Compose with `next`, applied after `self`.
    #[must_use]
    pub fn then<V: 'static>(self, next: Operator<U, V>) -> Operator<T, V> {
        Operator::new(move |source| next.apply(self.apply(source)))
    }
}

/// The operator that returns its source unchanged.
#[must_use]
pub fn identity<T: 'static>() -> Operator<T> {
    Operator::new(|source| source)
}

/// Compose operators left to right: stage *i* receives the output of
/// stage *i - 1*.
pub fn pipe<T: 'static>(stages: impl IntoIterator<Item = Operator<T>>) -> Operator<T> {
    let stages: Rc<[Operator<T>]> = stages.into_iter().collect();
    Operator::new(move |source| {
        stages
            .iter()
            .enumerate()
            .fold(source, |acc, (stage, operator)| {
                trace!(stage, "applying pipe stage");
                operator.apply(acc)
            })
    })
}

/// Observer relaying `error` and `complete` to `subscriber` unchanged and
/// handing each value to `on_next` together with the subscriber.
pub(crate) fn relay<T: 'static, U: 'static>(
    subscriber: &Subscriber<U>,
    on_next: impl Fn(&Subscriber<U>, T) + 'static,
) -> Observer<T> {
    let next_sink = subscriber.clone();
    let error_sink = subscriber.clone();
    let complete_sink = subscriber.clone();
    Observer::new(move |value| on_next(&next_sink, value))
        .with_error(move |err| error_sink.error(err))
        .with_complete(move || complete_sink.complete())
}
