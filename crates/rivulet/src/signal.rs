#![forbid(unsafe_code)]

//! Event source with connection handles.
//!
//! # Design
//!
//! [`Signal<T>`] keeps its listeners in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). Listeners are held weakly; the strong reference lives
//! in the [`Connection`] returned by [`Signal::connect`]. Firing notifies all
//! live listeners in connection order and prunes dead entries.
//!
//! # Performance
//!
//! | Operation     | Complexity                  |
//! |---------------|-----------------------------|
//! | `fire()`      | O(L) where L = listeners    |
//! | `connect()`   | O(1) amortized              |
//! | `disconnect()`| O(1)                        |
//!
//! # Failure Modes
//!
//! - **Re-entrant fire**: firing from inside a listener is allowed. Listeners
//!   are collected before any of them runs, so a listener connected during a
//!   fire first hears the next one.
//! - **Connection leak**: connections that are never dropped or disconnected
//!   keep their listener alive. Dead weak entries are pruned lazily during
//!   `fire()`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// A listener stored as a strong `Rc` in its connection, handed out
/// as `Weak` to the signal.
type ListenerRc<T> = Rc<dyn Fn(&T)>;
type ListenerWeak<T> = Weak<dyn Fn(&T)>;

struct SignalInner<T> {
    /// Listeners stored as weak references. Dead entries are pruned on fire.
    listeners: Vec<ListenerWeak<T>>,
    fire_count: u64,
}

/// A shared event source.
///
/// Cloning a `Signal` creates a new handle to the **same** listener list.
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

// Manual Clone: shares the same Rc.
impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Signal")
            .field("fire_count", &inner.fire_count)
            .field("listener_count", &inner.listeners.len())
            .finish()
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                listeners: Vec::new(),
                fire_count: 0,
            })),
        }
    }

    /// Connect a listener. It is called with a reference to every fired value
    /// until the returned [`Connection`] is disconnected or dropped.
    pub fn connect(&self, listener: impl Fn(&T) + 'static) -> Connection {
        let strong: ListenerRc<T> = Rc::new(listener);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().listeners.push(weak);
        // Wrap in a holder that can be type-erased as `dyn Any`,
        // since `Rc<dyn Fn(&T)>` itself cannot coerce to `Rc<dyn Any>`.
        Connection {
            guard: RefCell::new(Some(Box::new(strong))),
        }
    }

    /// Notify every live listener, in connection order.
    pub fn fire(&self, value: T) {
        // Collect live listeners first so no borrow is held during calls.
        let listeners: Vec<ListenerRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.fire_count += 1;
            inner.listeners.retain(|w| w.strong_count() > 0);
            inner.listeners.iter().filter_map(Weak::upgrade).collect()
        };

        for listener in &listeners {
            listener(&value);
        }
    }

    /// Number of times the signal has fired.
    #[must_use]
    pub fn fire_count(&self) -> u64 {
        self.inner.borrow().fire_count
    }

    /// Number of registered listeners (including dead ones not yet pruned).
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

/// Handle keeping a [`Signal`] listener connected.
///
/// Dropping the `Connection` disconnects the listener.
pub struct Connection {
    /// Type-erased strong reference keeping the listener `Rc` alive.
    guard: RefCell<Option<Box<dyn Any>>>,
}

impl Connection {
    /// Disconnect the listener. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let guard = self.guard.borrow_mut().take();
        drop(guard);
    }

    /// Whether the listener is still connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.guard.borrow().is_some()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
