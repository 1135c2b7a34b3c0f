use spin::Once;

pub type IrqLine = u8;

/// Number of legacy PIC lines.
pub const IRQ_LINES: usize = 16;

/// IRQ line of the periodic timer.
pub const IRQ_TIMER: IrqLine = 0;

/// Top-half irq handling routine.
///
/// This executes in an interrupt disabled context and must not block.
pub trait IrqHandler: Sync {
    fn handle(&self);
}

static HANDLERS: [Once<&'static dyn IrqHandler>; IRQ_LINES] = [const { Once::new() }; IRQ_LINES];

/// Installs `handler` for `line`. Each line can be registered once.
pub fn register(line: IrqLine, handler: &'static dyn IrqHandler) {
    let slot = &HANDLERS[line as usize];
    assert!(!slot.is_completed(), "irq line {line} registered twice");
    slot.call_once(|| handler);
}

/// Runs the handler of `line`. Returns false if the line has none.
pub fn dispatch(line: IrqLine) -> bool {
    let Some(handler) = HANDLERS.get(line as usize).and_then(|slot| slot.get()) else {
        return false;
    };
    handler.handle();
    true
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counter(AtomicUsize);
    impl IrqHandler for Counter {
        fn handle(&self) { self.0.fetch_add(1, Ordering::Relaxed); }
    }

    static COUNTER: Counter = Counter(AtomicUsize::new(0));

    #[test]
    fn dispatch_reaches_registered_line() {
        register(7, &COUNTER);
        assert!(dispatch(7));
        assert!(dispatch(7));
        assert_eq!(COUNTER.0.load(Ordering::Relaxed), 2);

        assert!(!dispatch(9));
        assert!(!dispatch(200));
    }
}
