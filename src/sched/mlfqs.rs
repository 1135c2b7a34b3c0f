//! Feedback scheduler recurrences.
//!
//! Once per second the load average and every thread's `recent_cpu` decay;
//! every fourth tick each priority is derived again:
//!
//! ```text
//! load_avg   = (59/60) * load_avg + (1/60) * ready_threads
//! recent_cpu = (2*load_avg) / (2*load_avg + 1) * recent_cpu + nice
//! priority   = PRI_MAX - (recent_cpu / 4) - (nice * 2)
//! ```
//!
//! All arithmetic is [`Fixed`], so results are reproducible bit for bit.

use core::sync::atomic::Ordering;

use atomic::Atomic;

use super::{SchedParams, ThreadRegistry, PRI_MAX, PRI_MIN};
use crate::common::Fixed;

/// Ticks between priority recomputations.
pub const PRIORITY_INTERVAL: i64 = 4;

/// System-wide state of the feedback scheduler.
pub struct Mlfqs {
    load_avg: Atomic<Fixed>,
}

impl Mlfqs {
    pub const fn new() -> Self {
        Self {
            load_avg: Atomic::new(Fixed::ZERO),
        }
    }

    pub fn load_avg(&self) -> Fixed { self.load_avg.load(Ordering::Relaxed) }

    /// 100 times the load average, rounded to the nearest integer.
    pub fn load_avg_x100(&self) -> i32 { (self.load_avg() * 100).to_int_round() }

    /// Folds `ready_threads` into the load average and returns the new value.
    pub fn update_load_avg(&self, ready_threads: i32) -> Fixed {
        let new = load_avg(self.load_avg(), ready_threads);
        self.load_avg.store(new, Ordering::Relaxed);
        new
    }

    /// Decays `recent_cpu` of every thread against the current load average.
    pub fn decay_recent_cpu(&self, registry: &impl ThreadRegistry) {
        let load_avg = self.load_avg();
        registry.for_each_thread(&mut |params: &mut SchedParams| {
            params.recent_cpu = recent_cpu(load_avg, params.recent_cpu, params.nice);
        });
    }

    /// Derives every thread's priority from its `recent_cpu` and nice.
    pub fn recompute_priorities(&self, registry: &impl ThreadRegistry) {
        registry.for_each_thread(&mut |params: &mut SchedParams| {
            params.priority = priority(params.recent_cpu, params.nice);
        });
    }

    /// Runs the recurrences due at tick `now`.
    ///
    /// Returns true when priorities were recomputed, in which case the running
    /// thread should yield.
    pub fn on_tick<R: ThreadRegistry>(&self, registry: &R, now: i64, ticks_per_sec: i64) -> bool {
        if now % ticks_per_sec == 0 {
            // The load average must be current before recent_cpu decays.
            self.update_load_avg(ready_threads(registry));
            self.decay_recent_cpu(registry);
        }
        if now % PRIORITY_INTERVAL == 0 {
            self.recompute_priorities(registry);
            return true;
        }
        false
    }
}

impl Default for Mlfqs {
    fn default() -> Self { Self::new() }
}

/// Threads competing for the CPU: the ready queue plus the running thread,
/// unless it is idle.
pub fn ready_threads<R: ThreadRegistry>(registry: &R) -> i32 {
    let running = !registry.is_idle(&registry.current());
    registry.ready_len() as i32 + running as i32
}

pub fn load_avg(load_avg: Fixed, ready_threads: i32) -> Fixed {
    let sixty = Fixed::from_int(60);
    let decay = Fixed::from_int(59) / sixty;
    let weight = Fixed::ONE / sixty;
    decay * load_avg + weight * ready_threads
}

pub fn recent_cpu(load_avg: Fixed, recent_cpu: i32, nice: i32) -> i32 {
    let twice = load_avg * 2;
    let coefficient = twice / (twice + 1);
    (coefficient * recent_cpu + nice).to_int_round()
}

/// Priority for the given usage, clamped to `PRI_MIN..=PRI_MAX`.
pub fn priority(recent_cpu: i32, nice: i32) -> i32 {
    let usage = Fixed::from_int(recent_cpu) / Fixed::from_int(4);
    let priority = (Fixed::from_int(PRI_MAX) - usage - nice * 2).to_int_trunc();
    priority.clamp(PRI_MIN, PRI_MAX)
}

#[cfg(test)]
mod tests {
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct Threads {
        params: RefCell<Vec<SchedParams>>,
        ready: Cell<usize>,
        idle_running: Cell<bool>,
    }
    impl ThreadRegistry for Threads {
        type Thread = ();

        fn current(&self) {}

        fn is_idle(&self, _: &()) -> bool { self.idle_running.get() }

        fn block_current(&self) { unreachable!() }

        fn unblock(&self, _: &()) { unreachable!() }

        fn ready_len(&self) -> usize { self.ready.get() }

        fn for_each_thread(&self, visit: &mut dyn FnMut(&mut SchedParams)) {
            self.params.borrow_mut().iter_mut().for_each(visit);
        }

        fn tick(&self) {}
    }

    #[test]
    fn load_avg_first_step() {
        let new = load_avg(Fixed::ZERO, 1);
        assert_eq!(new, Fixed::ONE / 60);
        assert_eq!(new.to_int(false), 0);
        assert!(matches!(new.to_int(true), 0 | 1));
    }

    #[test]
    fn load_avg_converges_to_ready_count() {
        let mut avg = Fixed::ZERO;
        for _ in 0..2000 {
            avg = load_avg(avg, 3);
        }
        assert_eq!(avg.to_int_round(), 3);
    }

    #[test]
    fn recent_cpu_decay() {
        // With no load only nice survives.
        assert_eq!(recent_cpu(Fixed::ZERO, 100, 0), 0);
        assert_eq!(recent_cpu(Fixed::ZERO, 100, 5), 5);
        // load_avg = 1 gives a coefficient of 2/3.
        assert_eq!(recent_cpu(Fixed::ONE, 60, 0), 40);
        assert_eq!(recent_cpu(Fixed::ONE, 60, -3), 37);
    }

    #[test]
    fn priority_bounds() {
        assert_eq!(priority(0, 0), PRI_MAX);
        // 63 - 2.5 truncates to 60.
        assert_eq!(priority(10, 0), PRI_MAX - 3);
        assert_eq!(priority(12, 1), PRI_MAX - 3 - 2);
        assert_eq!(priority(1000, 20), PRI_MIN);
        assert_eq!(priority(0, -20), PRI_MAX);
    }

    #[test]
    fn ready_threads_counts_running_thread() {
        let threads = Threads::default();
        threads.ready.set(2);
        assert_eq!(ready_threads(&threads), 3);
        threads.idle_running.set(true);
        assert_eq!(ready_threads(&threads), 2);
    }

    #[test]
    fn second_boundary_updates_load_before_decay() {
        let threads = Threads::default();
        threads.params.borrow_mut().push(SchedParams {
            nice: 0,
            recent_cpu: 60,
            priority: 0,
        });
        threads.ready.set(59);

        let mlfqs = Mlfqs::new();
        assert!(mlfqs.on_tick(&threads, 100, 100));

        // load_avg goes from 0 to ~1 first, so recent_cpu decays by ~2/3
        // instead of dropping to zero.
        assert_eq!(mlfqs.load_avg().to_int_round(), 1);
        let params = threads.params.borrow()[0];
        assert_eq!(params.recent_cpu, recent_cpu(mlfqs.load_avg(), 60, 0));
        assert!(params.recent_cpu > 0);
        assert_eq!(params.priority, priority(params.recent_cpu, 0));
    }

    #[test]
    fn intervals() {
        let threads = Threads::default();
        threads.params.borrow_mut().push(SchedParams::default());
        let mlfqs = Mlfqs::new();

        assert!(!mlfqs.on_tick(&threads, 1, 100));
        assert!(!mlfqs.on_tick(&threads, 6, 100));
        assert!(mlfqs.on_tick(&threads, 8, 100));
        assert_eq!(mlfqs.load_avg(), Fixed::ZERO);
        assert_eq!(threads.params.borrow()[0].priority, PRI_MAX);
    }
}
