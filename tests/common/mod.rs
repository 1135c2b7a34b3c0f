//! Host stand-ins for the interrupt controller and the thread registry.
//!
//! Each std thread plays a kernel thread. The interrupt level is kept per
//! thread, and blocked threads park until they are unblocked.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use koe_tick::interrupt::irq::IrqHandler;
use koe_tick::{IntrptCtl, IntrptLevel, SchedMode, SchedParams, ThreadRegistry, Timer};

thread_local! {
    static LEVEL: Cell<IntrptLevel> = const { Cell::new(IntrptLevel::On) };
}

#[derive(Default)]
pub struct MockIntrpt {
    yields: AtomicUsize,
}

impl MockIntrpt {
    pub fn yields(&self) -> usize { self.yields.load(Ordering::SeqCst) }
}

impl IntrptCtl for MockIntrpt {
    fn level(&self) -> IntrptLevel { LEVEL.with(Cell::get) }

    fn set_level(&self, level: IntrptLevel) -> IntrptLevel { LEVEL.with(|cur| cur.replace(level)) }

    fn yield_on_return(&self) { self.yields.fetch_add(1, Ordering::SeqCst); }
}

struct Slot {
    name: String,
    handle: thread::Thread,
    woken: AtomicBool,
}

#[derive(Clone)]
pub struct MockThread(Arc<Slot>);

impl MockThread {
    pub fn name(&self) -> &str { &self.0.name }
}

#[derive(Default)]
pub struct MockRegistry {
    slots: Mutex<HashMap<ThreadId, Arc<Slot>>>,
    /// Names of unblocked threads, in unblock order.
    unblocked: Mutex<Vec<String>>,
    pub params: Mutex<Vec<SchedParams>>,
    pub ready: AtomicUsize,
    pub idle: AtomicBool,
    ticks: AtomicUsize,
}

impl MockRegistry {
    pub fn unblocked(&self) -> Vec<String> { self.unblocked.lock().unwrap().clone() }

    pub fn ticks(&self) -> usize { self.ticks.load(Ordering::SeqCst) }

    fn slot(&self) -> Arc<Slot> {
        let current = thread::current();
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(current.id())
            .or_insert_with(|| {
                Arc::new(Slot {
                    name: current.name().unwrap_or("unnamed").to_string(),
                    handle: current.clone(),
                    woken: AtomicBool::new(false),
                })
            })
            .clone()
    }
}

impl ThreadRegistry for MockRegistry {
    type Thread = MockThread;

    fn current(&self) -> MockThread { MockThread(self.slot()) }

    fn is_idle(&self, _: &MockThread) -> bool { self.idle.load(Ordering::SeqCst) }

    fn block_current(&self) {
        let slot = self.slot();
        while !slot.woken.swap(false, Ordering::SeqCst) {
            thread::park();
        }
    }

    fn unblock(&self, thread: &MockThread) {
        self.unblocked.lock().unwrap().push(thread.0.name.clone());
        thread.0.woken.store(true, Ordering::SeqCst);
        thread.0.handle.unpark();
    }

    fn ready_len(&self) -> usize { self.ready.load(Ordering::SeqCst) }

    fn for_each_thread(&self, visit: &mut dyn FnMut(&mut SchedParams)) {
        self.params.lock().unwrap().iter_mut().for_each(visit);
    }

    fn tick(&self) { self.ticks.fetch_add(1, Ordering::SeqCst); }
}

pub type MockTimer = Timer<MockRegistry, MockIntrpt>;

pub fn timer(mode: SchedMode) -> MockTimer {
    Timer::new(MockRegistry::default(), MockIntrpt::default(), mode)
}

/// Fires the timer interrupt `n` times.
pub fn tick(timer: &MockTimer, n: usize) {
    for _ in 0..n {
        timer.handle();
    }
}

/// Waits until `n` threads are asleep on `timer`.
pub fn wait_for_sleepers(timer: &MockTimer, n: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while timer.pending_sleepers() < n {
        assert!(Instant::now() < deadline, "threads never fell asleep");
        thread::yield_now();
    }
}
