#![forbid(unsafe_code)]

//! Resource aggregator for subscription cleanup.
//!
//! A [`DisposeBag`] collects [`Teardown`]s (closures, subscriptions, signal
//! connections, other bags) and runs them together.
//!
//! # Usage
//!
//! ```
//! use std::rc::Rc;
//! use rivulet::{DisposeBag, Observable, Subscriber, Teardown};
//!
//! let bag = Rc::new(DisposeBag::new());
//! bag.add(Teardown::from_fn(|| println!("released")));
//!
//! // Handing the bag to a subscription ties its tasks to that lifetime.
//! let obs = Observable::new(move |_sub: Subscriber<i32>| Rc::clone(&bag));
//! drop(obs.subscribe_next(|_| {}));
//! ```
//!
//! # Invariants
//!
//! 1. Tasks run in reverse registration order.
//! 2. Each task runs at most once.
//! 3. `dispose()` is idempotent and leaves the bag empty but reusable.
//! 4. Tasks added while `dispose()` is running are run by the same call.
//! 5. Dropping the bag disposes it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use crate::observable::Teardown;

/// Handle to a task registered in a [`DisposeBag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey(u64);

/// Collects cleanup tasks and runs them together.
pub struct DisposeBag {
    tasks: RefCell<BTreeMap<u64, Teardown>>,
    next_key: Cell<u64>,
}

impl DisposeBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RefCell::new(BTreeMap::new()),
            next_key: Cell::new(0),
        }
    }

    /// Register a task and return its key.
    pub fn add(&self, task: impl Into<Teardown>) -> TaskKey {
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        self.tasks.borrow_mut().insert(key, task.into());
        TaskKey(key)
    }

    /// Unregister a task without running it.
    pub fn remove(&self, key: TaskKey) -> Option<Teardown> {
        self.tasks.borrow_mut().remove(&key.0)
    }

    /// Unregister a task and run it. Returns `false` if it was not registered.
    pub fn dispose_task(&self, key: TaskKey) -> bool {
        let task = self.remove(key);
        match task {
            Some(task) => {
                task.run();
                true
            }
            None => false,
        }
    }

    /// Run every registered task, newest first, and clear the bag.
    pub fn dispose(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
            if tasks.is_empty() {
                break;
            }
            for task in tasks.into_values().rev() {
                task.run();
            }
        }
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Whether no tasks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

impl Default for DisposeBag {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DisposeBag {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for DisposeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeBag")
            .field("task_count", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn push_task(log: &Rc<RefCell<Vec<u32>>>, id: u32) -> Teardown {
        let log = Rc::clone(log);
        Teardown::from_fn(move || log.borrow_mut().push(id))
    }

    #[test]
    fn dispose_runs_newest_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let bag = DisposeBag::new();
        bag.add(push_task(&log, 1));
        bag.add(push_task(&log, 2));
        bag.add(push_task(&log, 3));
        assert_eq!(bag.len(), 3);

        bag.dispose();
        assert_eq!(*log.borrow(), vec![3, 2, 1]);
        assert!(bag.is_empty());
    }

    #[test]
    fn dispose_is_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let bag = DisposeBag::new();
        bag.add(push_task(&log, 1));
        bag.dispose();
        bag.dispose();
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn bag_is_reusable_after_dispose() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let bag = DisposeBag::new();
        bag.add(push_task(&log, 1));
        bag.dispose();
        bag.add(push_task(&log, 2));
        bag.dispose();
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn remove_detaches_without_running() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let bag = DisposeBag::new();
        let key = bag.add(push_task(&log, 1));
        bag.add(push_task(&log, 2));

        let detached = bag.remove(key);
        assert!(detached.is_some());
        bag.dispose();
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn dispose_task_runs_single_entry() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let bag = DisposeBag::new();
        let key = bag.add(push_task(&log, 7));
        assert!(bag.dispose_task(key));
        assert!(!bag.dispose_task(key));
        assert_eq!(*log.borrow(), vec![7]);
    }

    #[test]
    fn tasks_added_during_dispose_also_run() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let bag = Rc::new(DisposeBag::new());
        let bag_clone = Rc::clone(&bag);
        let late = push_task(&log, 2);
        let late = RefCell::new(Some(late));
        bag.add(Teardown::from_fn(move || {
            if let Some(task) = late.borrow_mut().take() {
                bag_clone.add(task);
            }
        }));
        bag.dispose();
        assert_eq!(*log.borrow(), vec![2]);
        assert!(bag.is_empty());
    }

    #[test]
    fn drop_disposes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let bag = DisposeBag::new();
            bag.add(push_task(&log, 1));
        }
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn nested_bag_is_disposed_through_teardown() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner = Rc::new(DisposeBag::new());
        inner.add(push_task(&log, 1));
        let outer = DisposeBag::new();
        outer.add(Rc::clone(&inner));
        outer.dispose();
        assert_eq!(*log.borrow(), vec![1]);
        assert!(inner.is_empty());
    }

    #[test]
    fn debug_format() {
        let bag = DisposeBag::new();
        bag.add(Teardown::none());
        let dbg = format!("{bag:?}");
        assert!(dbg.contains("DisposeBag"));
        assert!(dbg.contains("task_count"));
    }
}
