//! Busy-wait loops for sub-tick delays.

use core::hint::black_box;

/// Initial guess for loops per tick.
const LOOPS_START: u32 = 1 << 10;

/// Bits refined below the highest power of two that fits in a tick.
const REFINE_BITS: u32 = 9;

/// Spins `loops` times.
///
/// Never inlined: the loop is timed once during calibration and has to cost
/// the same wherever it is called from.
#[inline(never)]
pub fn busy_wait(loops: i64) {
    let mut loops = loops;
    while loops > 0 {
        loops = black_box(loops) - 1;
    }
}

/// Finds the largest loop count that does not outlast a tick.
///
/// `too_many(loops)` reports whether `loops` iterations of [`busy_wait`] ran
/// past a tick boundary. It is assumed to be monotonic in `loops`.
pub fn search_loops_per_tick(mut too_many: impl FnMut(u32) -> bool) -> u32 {
    // Largest power of two still less than one tick.
    let mut loops = LOOPS_START;
    while !too_many(loops << 1) {
        loops <<= 1;
        assert!(loops != 0, "loops per tick overflowed during calibration");
    }

    let high_bit = loops;
    let mut test_bit = high_bit >> 1;
    while test_bit != high_bit >> (REFINE_BITS + 1) {
        if !too_many(loops | test_bit) {
            loops |= test_bit;
        }
        test_bit >>= 1;
    }
    loops
}
