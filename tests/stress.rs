use std::sync::{Arc, Barrier};
use std::thread;

use monlock::{CriticalSection, LockRuntime, Mode, Monitor};

const SLOTS: usize = 1000;
const THREADS: usize = 8;

fn may_yield() {
    // simulate scheduler preemption
    if fastrand::u8(0..3) == 0 {
        thread::yield_now();
    }
}

fn runtime() -> LockRuntime {
    let rt = LockRuntime::new(Mode::Threaded);
    rt.init();
    rt
}

#[test]
fn eight_threads_lock_disjoint_slots_once_each() {
    let rt = runtime();
    let monitors: Arc<Vec<Monitor>> =
        Arc::new((0..SLOTS).map(|_| Monitor::new(&rt)).collect());

    let per_thread = SLOTS / THREADS;
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let monitors = Arc::clone(&monitors);
            thread::spawn(move || {
                let mut order: Vec<usize> =
                    (t * per_thread..(t + 1) * per_thread).collect();
                fastrand::shuffle(&mut order);
                for index in order {
                    let _region = monitors[index].acquire();
                    may_yield();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(rt.registered(), SLOTS);
    assert_eq!(rt.shutdown(), SLOTS);
    assert_eq!(rt.registered(), 0);
    assert_eq!(rt.shutdown(), 0);
}

#[test]
fn contending_threads_construct_each_slot_once() {
    let rt = runtime();
    let monitors: Arc<Vec<Monitor>> =
        Arc::new((0..SLOTS).map(|_| Monitor::new(&rt)).collect());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let monitors = Arc::clone(&monitors);
            thread::spawn(move || {
                let mut order: Vec<usize> = (0..SLOTS).collect();
                fastrand::shuffle(&mut order);
                for index in order {
                    let _region = monitors[index].acquire();
                    may_yield();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every slot was contended by all threads, yet each was constructed
    // exactly once.
    assert_eq!(rt.registered(), SLOTS);
    assert_eq!(rt.shutdown(), SLOTS);
}

#[test]
fn racing_first_acquires_on_one_slot() {
    let rt = runtime();
    let monitor = Arc::new(Monitor::new(&rt));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let _region = monitor.acquire();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(rt.registered(), 1);
    assert_eq!(rt.shutdown(), 1);
}

#[test]
fn monitors_and_criticals_share_one_drain() {
    let rt = runtime();
    let sections: Arc<Vec<CriticalSection>> =
        Arc::new((0..4).map(|_| CriticalSection::new(&rt)).collect());
    let monitors: Arc<Vec<Monitor>> =
        Arc::new((0..16).map(|_| Monitor::new(&rt)).collect());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let sections = Arc::clone(&sections);
            let monitors = Arc::clone(&monitors);
            thread::spawn(move || {
                for _ in 0..100 {
                    let section = &sections[fastrand::usize(0..sections.len())];
                    section.with(may_yield);
                    let monitor = &monitors[fastrand::usize(0..monitors.len())];
                    monitor.with(may_yield);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(rt.registered(), 20);
    assert_eq!(rt.shutdown(), 20);
}
