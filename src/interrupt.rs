//! Interrupt masking.
//!
//! On a single processor the only way to exclude the timer handler is to mask
//! interrupts. [`IntrptCtl`] abstracts the controller doing the masking and
//! [`IntrptGuard`] scopes a masked region.

use core::marker::PhantomData;

pub mod irq;
pub mod timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrptLevel {
    On,
    Off,
}

/// The interrupt controller as seen by the timer core.
pub trait IntrptCtl {
    /// Current interrupt-enable level.
    fn level(&self) -> IntrptLevel;

    /// Sets the interrupt-enable level and returns the previous one.
    fn set_level(&self, level: IntrptLevel) -> IntrptLevel;

    fn disable(&self) -> IntrptLevel { self.set_level(IntrptLevel::Off) }

    fn enable(&self) -> IntrptLevel { self.set_level(IntrptLevel::On) }

    /// Asks for the interrupted thread to yield once the current handler
    /// returns. Must only be called from interrupt context.
    fn yield_on_return(&self);
}

/// Masks interrupts for its lifetime.
///
/// The level seen at creation is restored on drop, so guards nest.
pub struct IntrptGuard<'a, I: IntrptCtl + ?Sized> {
    ctl: &'a I,
    old: IntrptLevel,
    // Levels are per-CPU; the guard must be dropped where it was made.
    _not_send: PhantomData<*const ()>,
}

impl<'a, I: IntrptCtl + ?Sized> IntrptGuard<'a, I> {
    pub fn new(ctl: &'a I) -> Self {
        let old = ctl.disable();
        Self {
            ctl,
            old,
            _not_send: PhantomData,
        }
    }

    /// Level that will be restored when the guard is dropped.
    pub fn old_level(&self) -> IntrptLevel { self.old }
}

impl<I: IntrptCtl + ?Sized> Drop for IntrptGuard<'_, I> {
    fn drop(&mut self) { self.ctl.set_level(self.old); }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    struct FakeCtl {
        level: Cell<IntrptLevel>,
    }
    impl IntrptCtl for FakeCtl {
        fn level(&self) -> IntrptLevel { self.level.get() }

        fn set_level(&self, level: IntrptLevel) -> IntrptLevel { self.level.replace(level) }

        fn yield_on_return(&self) {}
    }

    #[test]
    fn guards_nest_and_restore() {
        let ctl = FakeCtl {
            level: Cell::new(IntrptLevel::On),
        };
        {
            let outer = IntrptGuard::new(&ctl);
            assert_eq!(outer.old_level(), IntrptLevel::On);
            assert_eq!(ctl.level(), IntrptLevel::Off);
            {
                let inner = IntrptGuard::new(&ctl);
                assert_eq!(inner.old_level(), IntrptLevel::Off);
            }
            assert_eq!(ctl.level(), IntrptLevel::Off);
        }
        assert_eq!(ctl.level(), IntrptLevel::On);
    }
}
