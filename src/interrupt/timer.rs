//! The tick engine.
//!
//! [`Timer`] counts timer interrupts, puts threads to sleep until a given tick
//! and wakes them from the interrupt handler. In feedback mode the handler
//! also drives the [`Mlfqs`] recurrences.

use core::pin::pin;
use core::sync::atomic::{AtomicU32, Ordering};

use atomic::Atomic;

use self::wake_queue::{SleepEntry, WakeQueue};
use super::irq::IrqHandler;
use super::{IntrptCtl, IntrptGuard, IntrptLevel};
use crate::common::log::{info, ok};
use crate::sched::mlfqs::Mlfqs;
use crate::sched::{SchedMode, ThreadRegistry};

pub mod calibrate;
pub mod wake_queue;

/// Timer ticks since boot.
pub type Tick = i64;

/// Timer interrupts per second.
pub const TIMER_FREQ: Tick = 100;

// The 8254 cannot go below 19 Hz.
const _: () = assert!(19 <= TIMER_FREQ && TIMER_FREQ <= 1000);

pub struct Timer<R: ThreadRegistry, I: IntrptCtl> {
    ticks: Atomic<Tick>,
    /// Zero until calibrated.
    loops_per_tick: AtomicU32,
    wake_queue: spin::Mutex<WakeQueue<R::Thread>>,
    mlfqs: Mlfqs,
    mode: SchedMode,
    registry: R,
    intrpt: I,
}

impl<R: ThreadRegistry, I: IntrptCtl> Timer<R, I> {
    pub fn new(registry: R, intrpt: I, mode: SchedMode) -> Self {
        ok!("Timer initialized at {} Hz, {} scheduler", TIMER_FREQ, mode);
        Self {
            ticks: Atomic::new(0),
            loops_per_tick: AtomicU32::new(0),
            wake_queue: spin::Mutex::new(WakeQueue::new()),
            mlfqs: Mlfqs::new(),
            mode,
            registry,
            intrpt,
        }
    }

    pub fn registry(&self) -> &R { &self.registry }

    pub fn intrpt(&self) -> &I { &self.intrpt }

    pub fn mode(&self) -> SchedMode { self.mode }

    pub fn mlfqs(&self) -> &Mlfqs { &self.mlfqs }

    /// Ticks since the timer started.
    pub fn now(&self) -> Tick {
        let _intrpt = IntrptGuard::new(&self.intrpt);
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks elapsed since `since`, a value once returned by [`Timer::now`].
    pub fn elapsed(&self, since: Tick) -> Tick { self.now() - since }

    /// Blocks the current thread until `ticks` more ticks have passed.
    ///
    /// Returns at the first tick strictly after the call for `ticks <= 0`.
    pub fn sleep(&self, ticks: Tick) {
        assert_eq!(
            self.intrpt.level(),
            IntrptLevel::On,
            "sleep with interrupts masked"
        );

        let _intrpt = IntrptGuard::new(&self.intrpt);
        let wake_at = self.ticks.load(Ordering::Relaxed) + ticks;
        let entry = pin!(SleepEntry::new(self.registry.current(), wake_at));
        // SAFETY: The entry is unlinked by the handler before this thread is
        // unblocked, and this frame lives until then.
        unsafe { self.wake_queue.lock().insert(entry.as_ref()) };
        self.registry.block_current();
        debug_assert!(!entry.is_queued());
    }

    /// Sleeps for about `ms` milliseconds. Busy-waits if that is less than a tick.
    pub fn delay_ms(&self, ms: Tick) { self.real_time_sleep(ms, 1000) }

    /// Sleeps for about `us` microseconds. Busy-waits if that is less than a tick.
    pub fn delay_us(&self, us: Tick) { self.real_time_sleep(us, 1000 * 1000) }

    /// Sleeps for about `ns` nanoseconds. Busy-waits if that is less than a tick.
    pub fn delay_ns(&self, ns: Tick) { self.real_time_sleep(ns, 1000 * 1000 * 1000) }

    /// Busy-waits for about `ms` milliseconds.
    ///
    /// Works with interrupts masked, but ticks that would have arrived while
    /// spinning masked for longer than a tick are lost.
    pub fn busy_delay_ms(&self, ms: Tick) { self.real_time_delay(ms, 1000) }

    /// Busy-waits for about `us` microseconds.
    pub fn busy_delay_us(&self, us: Tick) { self.real_time_delay(us, 1000 * 1000) }

    /// Busy-waits for about `ns` nanoseconds.
    pub fn busy_delay_ns(&self, ns: Tick) { self.real_time_delay(ns, 1000 * 1000 * 1000) }

    fn real_time_sleep(&self, num: Tick, denom: Tick) {
        let ticks = whole_ticks(num, denom);
        if ticks > 0 {
            self.sleep(ticks);
        } else {
            self.real_time_delay(num, denom);
        }
    }

    fn real_time_delay(&self, num: Tick, denom: Tick) {
        let loops_per_tick = self.loops_per_tick();
        assert!(loops_per_tick != 0, "busy delay before timer calibration");
        calibrate::busy_wait(delay_loops(loops_per_tick, num, denom));
    }

    /// Measures how many [`calibrate::busy_wait`] loops fit in a tick.
    ///
    /// Must run once, with interrupts on, before any busy delay.
    pub fn calibrate(&self) {
        assert_eq!(
            self.intrpt.level(),
            IntrptLevel::On,
            "calibrate with interrupts masked"
        );
        info!("Calibrating timer...");

        let loops = calibrate::search_loops_per_tick(|loops| self.too_many_loops(loops));
        self.loops_per_tick.store(loops, Ordering::Relaxed);

        ok!("Timer calibrated: {} loops/s", u64::from(loops) * TIMER_FREQ as u64);
    }

    /// Whether `loops` iterations of busy waiting, started on a tick edge,
    /// run into the next tick.
    pub fn too_many_loops(&self, loops: u32) -> bool {
        let start = self.ticks.load(Ordering::Acquire);
        while self.ticks.load(Ordering::Acquire) == start {
            core::hint::spin_loop();
        }

        let start = self.ticks.load(Ordering::Acquire);
        calibrate::busy_wait(i64::from(loops));
        start != self.ticks.load(Ordering::Acquire)
    }

    /// Calibrated busy-wait loops per tick, zero before [`Timer::calibrate`].
    pub fn loops_per_tick(&self) -> u32 { self.loops_per_tick.load(Ordering::Relaxed) }

    /// Number of threads waiting in [`Timer::sleep`].
    pub fn pending_sleepers(&self) -> usize {
        let _intrpt = IntrptGuard::new(&self.intrpt);
        self.wake_queue.lock().len()
    }

    pub fn print_stats(&self) { info!("Timer: {} ticks", self.now()); }

    /// Advances time by one tick.
    ///
    /// Runs the per-tick accounting, wakes every sleeper now due in queue
    /// order and, in feedback mode, updates the scheduler state.
    pub fn on_tick(&self, _intrpt: &IntrptGuard<'_, I>) {
        let now = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        self.registry.tick();

        self.wake_queue
            .lock()
            .drain_due(now, |thread| self.registry.unblock(&thread));

        if self.mode == SchedMode::Mlfqs && self.mlfqs.on_tick(&self.registry, now, TIMER_FREQ) {
            self.intrpt.yield_on_return();
        }
    }
}

impl<R, I> IrqHandler for Timer<R, I>
where
    R: ThreadRegistry + Sync,
    R::Thread: Send,
    I: IntrptCtl + Sync,
{
    fn handle(&self) {
        let intrpt = IntrptGuard::new(&self.intrpt);
        self.on_tick(&intrpt);
    }
}

/// Whole ticks in `num / denom` seconds, rounded down.
fn whole_ticks(num: Tick, denom: Tick) -> Tick { num * TIMER_FREQ / denom }

/// Busy-wait loops for `num / denom` seconds.
///
/// Both terms are scaled down by 1000 first to keep the product in range.
fn delay_loops(loops_per_tick: u32, num: Tick, denom: Tick) -> i64 {
    assert!(denom % 1000 == 0, "delay denominator {denom} not a multiple of 1000");
    i64::from(loops_per_tick) * num / 1000 * TIMER_FREQ / (denom / 1000)
}
