//! Port-mapped I/O.

use core::arch::asm;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port(pub u16);

#[inline(always)]
pub fn outb(port: Port, value: u8) {
    // SAFETY: Callers own the device behind `port`.
    unsafe {
        asm!(
            "out dx, al",
            in("dx") port.0,
            in("al") value,
            options(nomem, nostack, preserves_flags),
        )
    };
}

#[inline(always)]
pub fn inb(port: Port) -> u8 {
    let value: u8;
    // SAFETY: Callers own the device behind `port`.
    unsafe {
        asm!(
            "in al, dx",
            in("dx") port.0,
            out("al") value,
            options(nomem, nostack, preserves_flags),
        )
    };
    value
}
