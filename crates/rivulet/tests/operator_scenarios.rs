//! End-to-end scenarios through the public API.
//!
//! Each test wires several operators together the way a host application
//! would: signals and promises feed pipelines, and subscriptions are
//! released by drop.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use rivulet::ops::{
    combine_latest, filter, from, from_signal, map, merge_all, of, pipe, start_with,
    switch_all, switch_map, take_until, to_promise, using,
};
use rivulet::testing::{Event, Recorder};
use rivulet::{
    DisposeBag, Observable, Observer, Promise, Signal, StreamError, Subscriber, Teardown,
};

type Slot<T> = Rc<RefCell<Option<Subscriber<T>>>>;

fn manual<T: 'static>() -> (Observable<T>, Slot<T>) {
    let slot: Slot<T> = Rc::new(RefCell::new(None));
    let slot_clone = Rc::clone(&slot);
    let obs = Observable::new(move |sub: Subscriber<T>| {
        *slot_clone.borrow_mut() = Some(sub);
    });
    (obs, slot)
}

fn producer<T: 'static>(slot: &Slot<T>) -> Subscriber<T> {
    slot.borrow().clone().expect("source not subscribed")
}

#[test]
fn of_then_pipe_map_filter() {
    let rec = Recorder::new();
    let _sub = of([1, 2, 3, 4])
        .pipe(pipe([map(|x: i32| x * 2), filter(|x: &i32| *x > 4)]))
        .subscribe(rec.observer());
    assert_eq!(
        rec.events(),
        vec![Event::Next(6), Event::Next(8), Event::Complete]
    );
}

#[test]
fn merge_all_error_cuts_off_sibling() {
    let (outer, outer_slot) = manual::<Observable<i32>>();
    let (first, first_slot) = manual();
    let (second, second_slot) = manual();
    let rec = Recorder::new();
    let _sub = outer.pipe(merge_all()).subscribe(rec.observer());

    let outer_tx = producer(&outer_slot);
    outer_tx.next(first);
    outer_tx.next(second);
    let first_tx = producer(&first_slot);
    let second_tx = producer(&second_slot);

    first_tx.next(1);
    second_tx.error("second failed");
    first_tx.next(99);
    first_tx.complete();

    assert_eq!(
        rec.events(),
        vec![
            Event::Next(1),
            Event::Error(StreamError::new("second failed"))
        ]
    );
}

#[test]
fn switch_all_drops_late_values_of_slow_inner() {
    let slow = Signal::new();
    let rec = Recorder::new();
    let _sub = of([from_signal(&slow), of([10, 20])])
        .pipe(switch_all())
        .subscribe(rec.observer());
    slow.fire(1);
    assert_eq!(
        rec.events(),
        vec![Event::Next(10), Event::Next(20), Event::Complete]
    );
}

#[test]
fn combine_latest_of_two_single_emitters() {
    let sources: BTreeMap<&str, Observable<i32>> =
        [("x", of([1])), ("y", of([2]))].into_iter().collect();
    let rec = Recorder::new();
    let _sub = combine_latest(sources).subscribe(rec.observer());
    let expected: BTreeMap<&str, i32> = [("x", 1), ("y", 2)].into_iter().collect();
    assert_eq!(rec.events(), vec![Event::Next(expected), Event::Complete]);
}

#[test]
fn take_until_early_notifier_never_subscribes_source() {
    let subscribed = Rc::new(Cell::new(0));
    let counter = Rc::clone(&subscribed);
    let source = Observable::new(move |sub: Subscriber<&str>| {
        counter.set(counter.get() + 1);
        sub.next("should not arrive");
    });
    let rec = Recorder::new();
    let _sub = source.pipe(take_until(of([()]))).subscribe(rec.observer());
    assert_eq!(subscribed.get(), 0);
    assert_eq!(rec.events(), vec![Event::Complete]);
}

#[test]
fn double_unsubscribe_matches_single() {
    let signal = Signal::new();
    let once = Recorder::new();
    let twice = Recorder::new();
    let a = from_signal(&signal).subscribe(once.observer());
    let b = from_signal(&signal).subscribe(twice.observer());
    signal.fire(1);
    a.unsubscribe();
    b.unsubscribe();
    b.unsubscribe();
    signal.fire(2);
    assert_eq!(once.events(), twice.events());
    assert!(a.is_closed() && b.is_closed());
}

#[test]
fn search_box_style_pipeline() {
    // Keystrokes start a lookup; a newer keystroke abandons the older one.
    let keys = Signal::new();
    let pending: Rc<RefCell<Vec<Promise<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let lookups = Rc::clone(&pending);
    let rec = Recorder::new();
    let _sub = from_signal(&keys)
        .pipe(start_with([String::new()]))
        .pipe(filter(|query: &String| !query.is_empty()))
        .pipe(switch_map(move |query: String| {
            let promise = Promise::pending();
            lookups.borrow_mut().push(promise.clone());
            from(promise).pipe(map(move |hit: String| format!("{query}: {hit}")))
        }))
        .subscribe(rec.observer());

    keys.fire("ru".to_owned());
    keys.fire("rust".to_owned());
    let lookups = pending.borrow().clone();
    assert_eq!(lookups.len(), 2);

    lookups[0].resolve("stale".to_owned());
    lookups[1].resolve("fresh".to_owned());
    assert_eq!(rec.values(), vec!["rust: fresh".to_owned()]);
    assert!(!rec.is_complete());
}

#[test]
fn using_with_dispose_bag_resource() {
    let released = Rc::new(Cell::new(0));
    let counter = Rc::clone(&released);
    let signal = Signal::new();
    let source_signal = signal.clone();
    let obs = using(
        move || {
            let bag = Rc::new(DisposeBag::new());
            let counter = Rc::clone(&counter);
            bag.add(Teardown::from_fn(move || counter.set(counter.get() + 1)));
            bag
        },
        move |_bag| from_signal(&source_signal),
    );

    let rec = Recorder::new();
    let sub = obs.subscribe(rec.observer());
    signal.fire(5);
    drop(sub);
    signal.fire(6);
    assert_eq!(rec.values(), vec![5]);
    assert_eq!(released.get(), 1);
}

#[test]
fn to_promise_bridges_back_from_streams() {
    let signal = Signal::new();
    let first_big = to_promise(&from_signal(&signal).pipe(filter(|x: &i32| *x > 10)));
    signal.fire(3);
    assert!(first_big.is_pending());
    signal.fire(42);
    assert_eq!(first_big.wait(), Ok(42));
}

#[test]
fn unhandled_errors_do_not_panic() {
    let sub = rivulet::ops::throw_error::<i32>("ignored").subscribe(Observer::empty());
    assert!(sub.is_closed());
}
