//! 8254 programmable interval timer.

use core::ops::Range;

use bitvec::field::BitField as _;
use bitvec::order::Lsb0;
use bitvec::view::BitView as _;

/// Input clock of the 8254 in Hz.
pub const PIT_HZ: u32 = 1_193_180;

/// Lowest rate the 16-bit counter can divide down to.
pub const PIT_MIN_FREQ: u32 = 19;

const CONTROL_PORT: u16 = 0x43;
const CHANNEL_PORT_BASE: u16 = 0x40;

/// Read/write the low byte then the high byte of the counter.
const ACCESS_LO_HI: u8 = 0b11;

const BCD_IDXS: Range<usize> = 0..1;
const MODE_IDXS: Range<usize> = 1..4;
const ACCESS_IDXS: Range<usize> = 4..6;
const CHANNEL_IDXS: Range<usize> = 6..8;

/// Control word selecting `channel` in `mode` with a binary lo/hi counter.
pub fn control_word(channel: u8, mode: u8) -> u8 {
    let mut word = 0u8;
    let bits = word.view_bits_mut::<Lsb0>();
    bits[BCD_IDXS].store_le(0u8);
    bits[MODE_IDXS].store_le(mode);
    bits[ACCESS_IDXS].store_le(ACCESS_LO_HI);
    bits[CHANNEL_IDXS].store_le(channel);
    word
}

/// Counter value making the PIT fire `freq` times per second.
///
/// Rounds to the nearest count. Rates too slow for the counter give 0, which
/// the chip reads as 65536. Rates above the input clock give the smallest
/// count mode 2 accepts.
pub fn counter_for(freq: u32) -> u16 {
    if freq < PIT_MIN_FREQ {
        0
    } else if freq > PIT_HZ {
        2
    } else {
        ((PIT_HZ + freq / 2) / freq) as u16
    }
}

/// Programs `channel` to run in `mode` at `freq` Hz.
///
/// Channel 0 drives IRQ 0 and channel 2 the speaker. Mode 2 is a rate
/// generator and mode 3 a square wave.
#[cfg(target_arch = "x86_64")]
pub fn configure(channel: u8, mode: u8, freq: u32) {
    use crate::arch::pmio::{outb, Port};
    use crate::interrupt::IntrptGuard;

    assert!(channel == 0 || channel == 2, "bad pit channel {channel}");
    assert!(mode == 2 || mode == 3, "bad pit mode {mode}");

    let [lo, hi] = counter_for(freq).to_le_bytes();
    let port = Port(CHANNEL_PORT_BASE + u16::from(channel));

    let _intrpt = IntrptGuard::new(&crate::arch::X86Intrpt);
    outb(Port(CONTROL_PORT), control_word(channel, mode));
    outb(port, lo);
    outb(port, hi);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_channel_rate_generator() {
        assert_eq!(control_word(0, 2), 0x34);
        assert_eq!(control_word(2, 3), 0xb6);
    }

    #[test]
    fn counter_rounds_to_nearest() {
        assert_eq!(counter_for(100), 11932);
        assert_eq!(counter_for(1000), 1193);
        assert_eq!(counter_for(PIT_MIN_FREQ), 62799);
    }

    #[test]
    fn counter_out_of_range() {
        assert_eq!(counter_for(0), 0);
        assert_eq!(counter_for(18), 0);
        assert_eq!(counter_for(PIT_HZ + 1), 2);
    }
}
