//! Legacy 8259 PIC pair.

use bitvec::order::Lsb0;
use bitvec::view::BitView as _;

use crate::arch::pmio::{inb, outb, Port};
use crate::interrupt::irq::IrqLine;

const PIC1_CMD_PORT: Port = Port(0x20);
const PIC1_DATA_PORT: Port = Port(0x21);
const PIC2_CMD_PORT: Port = Port(0xA0);
const PIC2_DATA_PORT: Port = Port(0xA1);

/// Vector of irq line 0 after remapping.
pub const VECTOR_PIC: u8 = 0x20;

// Initialize and send ICW4 later
const ICW1: u8 = 0b0001_0001;

// Slave PIC sits on IRQ2.
const ICW3_PIC1: u8 = 0b100;
const ICW3_PIC2: u8 = 2;

// 8086 mode
const ICW4: u8 = 0b0000_0001;

const EOI: u8 = 0x20;

/// Remaps lines 0..16 to `VECTOR_PIC..VECTOR_PIC + 16` and masks them all.
pub fn init() {
    outb(PIC1_CMD_PORT, ICW1);
    outb(PIC2_CMD_PORT, ICW1);

    outb(PIC1_DATA_PORT, VECTOR_PIC);
    outb(PIC2_DATA_PORT, VECTOR_PIC + 8);

    outb(PIC1_DATA_PORT, ICW3_PIC1);
    outb(PIC2_DATA_PORT, ICW3_PIC2);

    outb(PIC1_DATA_PORT, ICW4);
    outb(PIC2_DATA_PORT, ICW4);

    outb(PIC1_DATA_PORT, 0xff);
    outb(PIC2_DATA_PORT, 0xff);
}

/// Signals end of interrupt for `line`.
pub fn ack(line: IrqLine) {
    match line {
        0..8 => outb(PIC1_CMD_PORT, EOI),
        8..16 => {
            outb(PIC2_CMD_PORT, EOI);
            outb(PIC1_CMD_PORT, EOI);
        },
        _ => (),
    }
}

pub fn mask(line: IrqLine) { set_masked(line, true) }

pub fn unmask(line: IrqLine) { set_masked(line, false) }

fn set_masked(line: IrqLine, masked: bool) {
    let (port, offset) = match line {
        0..8 => (PIC1_DATA_PORT, line),
        8..16 => (PIC2_DATA_PORT, line - 8),
        _ => return,
    };

    let mut mask = inb(port);
    mask.view_bits_mut::<Lsb0>().set(offset as usize, masked);
    outb(port, mask);
}
