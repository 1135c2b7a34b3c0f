//! 16550 UART on COM1, used as the log sink.

use core::fmt::{Arguments, Write};

use crate::arch::pmio::{inb, outb, Port};
use crate::arch::X86Intrpt;
use crate::common::log;
use crate::interrupt::{IntrptCtl, IntrptGuard};

const COM1_PORT: u16 = 0x3f8;

pub static COM1: spin::Mutex<Serial> = spin::Mutex::new(Serial(0));

/// Brings up COM1 and routes the log to it.
pub fn init() {
    COM1.lock().init(COM1_PORT);
    log::set_sink(sink);
}

/// Log sink writing to COM1.
pub fn sink(args: Arguments) { write_masked(&X86Intrpt, &COM1, args) }

/// Writes a whole line to `port` with interrupts masked.
///
/// A handler that logs would otherwise spin forever on a port locked by the
/// code it interrupted.
fn write_masked<I: IntrptCtl, W: Write>(intrpt: &I, port: &spin::Mutex<W>, args: Arguments) {
    let _intrpt = IntrptGuard::new(intrpt);
    // Nothing to report a serial failure to.
    let _ = port.lock().write_fmt(args);
}

pub struct Serial(u16);

impl Serial {
    pub fn is_init(&self) -> bool { self.0 != 0 }

    /// 38400 baud, 8N1, FIFOs on.
    pub fn init(&mut self, port: u16) {
        assert!(!self.is_init(), "serial port initialized twice");

        outb(Port(port + 1), 0x00); // No interrupts
        outb(Port(port + 3), 0x80); // DLAB on
        outb(Port(port), 0x03); // Divisor 3, lo byte
        outb(Port(port + 1), 0x00); //           hi byte
        outb(Port(port + 3), 0x03); // 8 bits, no parity, one stop bit
        outb(Port(port + 2), 0xC7); // FIFO on, cleared, 14-byte threshold
        outb(Port(port + 4), 0x0F); // DTR, RTS, OUT1, OUT2

        self.0 = port;
    }

    fn transmit_empty(&self) -> bool { inb(Port(self.0 + 5)) & 0x20 != 0 }

    pub fn write(&mut self, byte: u8) {
        assert!(self.is_init(), "write to uninitialized serial port");
        while !self.transmit_empty() {
            core::hint::spin_loop();
        }
        outb(Port(self.0), byte);
    }
}

impl Write for Serial {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes() {
            if b == b'\n' {
                self.write(b'\r');
            }
            self.write(b);
        }
        Ok(())
    }
}
