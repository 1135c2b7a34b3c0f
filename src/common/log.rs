use core::fmt::Arguments;

pub use mac::*;

pub mod mac {
    macro_rules! ok {
        ($($arg:tt)*) => {
            $crate::common::log::ok(format_args!($($arg)*))
        };
    }
    pub(crate) use ok;
    macro_rules! error {
        ($($arg:tt)*) => {
            $crate::common::log::error(format_args!($($arg)*))
        };
    }
    pub(crate) use error;
    macro_rules! info {
        ($($arg:tt)*) => {
            $crate::common::log::info(format_args!($($arg)*))
        };
    }
    pub(crate) use info;
}

/// Destination of formatted log lines.
pub type Sink = fn(Arguments);

static SINK: spin::Mutex<Option<Sink>> = spin::Mutex::new(None);

/// Routes log lines to `sink`. Lines logged before a sink is set are dropped.
pub fn set_sink(sink: Sink) { *SINK.lock() = Some(sink); }

pub fn ok(msg: Arguments) { log("OK", msg); }
pub fn info(msg: Arguments) { log("INFO", msg); }
pub fn error(msg: Arguments) { log("ERROR!", msg); }
pub fn panic(msg: Arguments) { log("PANIC!", msg); }

fn log(header: &'static str, msg: Arguments) {
    // Copy the sink out so a sink that logs does not deadlock.
    let Some(sink) = *SINK.lock() else {
        return;
    };
    sink(format_args!("[{:^6}] {}\n", header, msg));
}
