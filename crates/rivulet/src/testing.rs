#![forbid(unsafe_code)]

//! Recording observer for asserting on stream output.
//!
//! ```
//! use rivulet::ops::of;
//! use rivulet::testing::{Event, Recorder};
//!
//! let rec = Recorder::new();
//! let _sub = of([1, 2]).subscribe(rec.observer());
//! assert_eq!(rec.events(), vec![Event::Next(1), Event::Next(2), Event::Complete]);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::StreamError;
use crate::observable::Observer;

/// One observed stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T> {
    /// A value.
    Next(T),
    /// The error terminal.
    Error(StreamError),
    /// The completion terminal.
    Complete,
}

/// Records every event delivered to the observers it hands out.
pub struct Recorder<T> {
    events: Rc<RefCell<Vec<Event<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<T> fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("event_count", &self.events.borrow().len())
            .finish()
    }
}

impl<T: 'static> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Recorder<T> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// An observer that appends to this recorder.
    #[must_use]
    pub fn observer(&self) -> Observer<T> {
        let next_log = Rc::clone(&self.events);
        let error_log = Rc::clone(&self.events);
        let complete_log = Rc::clone(&self.events);
        Observer::new(move |value| next_log.borrow_mut().push(Event::Next(value)))
            .with_error(move |err| error_log.borrow_mut().push(Event::Error(err)))
            .with_complete(move || complete_log.borrow_mut().push(Event::Complete))
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Whether a completion was recorded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.events
            .borrow()
            .iter()
            .any(|event| matches!(event, Event::Complete))
    }

    /// The first recorded error, if any.
    #[must_use]
    pub fn error(&self) -> Option<StreamError> {
        self.events.borrow().iter().find_map(|event| match event {
            Event::Error(err) => Some(err.clone()),
            _ => None,
        })
    }

    /// Number of terminal events (errors plus completions).
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| !matches!(event, Event::Next(_)))
            .count()
    }
}

impl<T: Clone + 'static> Recorder<T> {
    /// Snapshot of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<Event<T>> {
        self.events.borrow().clone()
    }

    /// Snapshot of the recorded values only.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}
