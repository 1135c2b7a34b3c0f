//! Timer and scheduling core of a small teaching kernel.
//!
//! Counts timer ticks, sleeps threads until a tick and wakes them from the
//! timer interrupt, and in feedback mode recomputes thread priorities from
//! fixed-point load and usage estimates.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod arch;
pub mod common;
pub mod drivers;
pub mod interrupt;
pub mod sched;

pub use common::Fixed;
pub use interrupt::timer::{Tick, Timer, TIMER_FREQ};
pub use interrupt::{IntrptCtl, IntrptGuard, IntrptLevel};
pub use sched::{SchedMode, SchedParams, ThreadRegistry};
