use core::arch::asm;
use core::sync::atomic::{AtomicBool, Ordering};

use bitvec::order::Lsb0;
use bitvec::view::BitView as _;

use crate::common::log::error;
use crate::drivers::{pic, pit};
use crate::interrupt::irq::{self, IrqHandler, IrqLine, IRQ_TIMER};
use crate::interrupt::timer::TIMER_FREQ;
use crate::interrupt::{IntrptCtl, IntrptLevel};

pub mod pmio;

/// Interrupt enable flag in RFLAGS.
const RFLAGS_IF: usize = 9;

/// Set while an external interrupt is being handled.
static IN_EXTERNAL: AtomicBool = AtomicBool::new(false);
/// Set by a handler that wants the interrupted thread to yield.
static YIELD_ON_RETURN: AtomicBool = AtomicBool::new(false);

/// Interrupt flag of the running CPU.
pub struct X86Intrpt;

impl IntrptCtl for X86Intrpt {
    fn level(&self) -> IntrptLevel {
        let rflags: u64;
        // SAFETY: Reading rflags is safe.
        unsafe { asm!("pushfq", "pop {}", out(reg) rflags, options(nomem, preserves_flags)) };

        if rflags.view_bits::<Lsb0>()[RFLAGS_IF] {
            IntrptLevel::On
        } else {
            IntrptLevel::Off
        }
    }

    fn set_level(&self, level: IntrptLevel) -> IntrptLevel {
        let old = self.level();
        match level {
            // SAFETY: enabling interrupt is safe.
            IntrptLevel::On => unsafe { asm!("sti", options(nomem, nostack)) },
            // SAFETY: disabling interrupt is safe.
            IntrptLevel::Off => unsafe { asm!("cli", options(nomem, nostack)) },
        }
        old
    }

    fn yield_on_return(&self) {
        debug_assert!(IN_EXTERNAL.load(Ordering::Relaxed));
        YIELD_ON_RETURN.store(true, Ordering::Relaxed);
    }
}

/// Entry of the irq stubs, called with interrupts masked.
///
/// Returns true if the interrupted thread should yield before the stub
/// returns to it.
#[no_mangle]
pub extern "C" fn irq_handler(line: IrqLine) -> bool {
    IN_EXTERNAL.store(true, Ordering::Relaxed);
    if !irq::dispatch(line) {
        error!("No handler for irq {}", line);
    }
    pic::ack(line);
    IN_EXTERNAL.store(false, Ordering::Relaxed);

    YIELD_ON_RETURN.swap(false, Ordering::Relaxed)
}

/// Starts the periodic timer interrupt with `timer` as its handler.
pub fn init_timer(timer: &'static dyn IrqHandler) {
    pic::init();
    pit::configure(0, 2, TIMER_FREQ as u32);
    irq::register(IRQ_TIMER, timer);
    pic::unmask(IRQ_TIMER);
}

/// Halts the CPU for good.
#[inline(always)]
pub fn die() -> ! {
    loop {
        // SAFETY: hlt is safe
        unsafe { asm!("cli", "hlt") };
    }
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    crate::common::log::panic(format_args!("{}", info));
    die()
}
