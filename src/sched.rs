//! The scheduler as seen from the timer core.
//!
//! Thread objects live in an external registry. This crate only blocks and
//! unblocks them, and reads and writes the fields in [`SchedParams`].

use strum::{Display, EnumString, IntoStaticStr};

pub mod mlfqs;

/// Lowest priority.
pub const PRI_MIN: i32 = 0;
/// Priority of a newly created thread.
pub const PRI_DEFAULT: i32 = 31;
/// Highest priority.
pub const PRI_MAX: i32 = 63;

pub const NICE_MIN: i32 = -20;
pub const NICE_DEFAULT: i32 = 0;
pub const NICE_MAX: i32 = 20;

const _: () = assert!(PRI_MIN <= PRI_DEFAULT && PRI_DEFAULT <= PRI_MAX);
const _: () = assert!(NICE_MIN <= NICE_DEFAULT && NICE_DEFAULT <= NICE_MAX);

/// How thread priorities are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum SchedMode {
    /// Priorities are set by their owners and never recomputed.
    #[default]
    Priority,
    /// Multi-level feedback queue: priorities follow recent CPU usage.
    Mlfqs,
}

impl SchedMode {
    /// Picks the mode from a kernel command line. Accepts `-mlfqs` and
    /// `sched=<mode>`. The last matching option wins.
    pub fn from_cmdline(cmdline: &str) -> Self {
        cmdline
            .split_ascii_whitespace()
            .filter_map(|opt| {
                if opt == "-mlfqs" {
                    return Some(SchedMode::Mlfqs);
                }
                opt.strip_prefix("sched=")?.parse().ok()
            })
            .last()
            .unwrap_or_default()
    }
}

/// Scheduler fields of a thread written by the timer core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedParams {
    pub nice: i32,
    /// Recent CPU usage in whole ticks.
    pub recent_cpu: i32,
    pub priority: i32,
}

impl SchedParams {
    pub const fn new(nice: i32) -> Self {
        Self {
            nice,
            recent_cpu: 0,
            priority: PRI_DEFAULT,
        }
    }

    /// Sets nice, clamped to `NICE_MIN..=NICE_MAX`, and derives the priority
    /// again from it.
    pub fn set_nice(&mut self, nice: i32) {
        self.nice = nice.clamp(NICE_MIN, NICE_MAX);
        self.priority = mlfqs::priority(self.recent_cpu, self.nice);
    }
}

impl Default for SchedParams {
    fn default() -> Self { Self::new(NICE_DEFAULT) }
}

/// The thread registry the timer core runs against.
///
/// `block_current` and `unblock` must be called with interrupts masked.
pub trait ThreadRegistry {
    /// Reference to a thread. It does not own the thread.
    type Thread: Clone;

    fn current(&self) -> Self::Thread;

    fn is_idle(&self, thread: &Self::Thread) -> bool;

    /// Suspends the current thread until [`ThreadRegistry::unblock`] is called
    /// on it. An unblock that lands before the block must not be lost.
    fn block_current(&self);

    fn unblock(&self, thread: &Self::Thread);

    /// Number of threads waiting in the ready queue, excluding the running one.
    fn ready_len(&self) -> usize;

    /// Visits the scheduler fields of every thread.
    fn for_each_thread(&self, visit: &mut dyn FnMut(&mut SchedParams));

    /// Per-tick accounting for the running thread.
    fn tick(&self);
}
