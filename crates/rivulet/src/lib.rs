#![forbid(unsafe_code)]

//! Push-based reactive streams for single-threaded hosts.
//!
//! An [`Observable`] describes a sequence of values delivered over time,
//! terminated by at most one error or completion. Subscribing returns a
//! [`Subscription`] whose drop (or [`Subscription::unsubscribe`]) stops
//! delivery and releases everything the subscription holds. Operators in
//! [`ops`] build new Observables from existing ones, and integrate with
//! [`Signal`] event sources and one-shot [`Promise`] values.
//!
//! ```
//! use rivulet::ops::{filter, map, of};
//! use rivulet::testing::Recorder;
//!
//! let rec = Recorder::new();
//! let _sub = of([1, 2, 3, 4])
//!     .pipe(map(|x: i32| x * 2))
//!     .pipe(filter(|x: &i32| *x > 4))
//!     .subscribe(rec.observer());
//! assert_eq!(rec.values(), vec![6, 8]);
//! ```

pub mod dispose;
pub mod error;
pub mod logging;
pub mod observable;
pub mod ops;
pub mod promise;
pub mod signal;
pub mod testing;

pub use dispose::{DisposeBag, TaskKey};
pub use error::{LoggingError, StreamError, WaitError};
#[cfg(feature = "logging")]
pub use logging::init_logging;
pub use logging::LoggingConfig;
pub use observable::{Observable, Observer, Subscriber, Subscription, Teardown};
pub use ops::{Operator, pipe};
pub use promise::Promise;
pub use signal::{Connection, Signal};
