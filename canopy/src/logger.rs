// Logging is behind the `logger` cargo feature so that library consumers
// who don't configure a logger pay nothing; the fallback macros compile to
// true no-ops.

#[cfg(feature = "logger")]
pub use log::{debug, trace};

/// Returns true if trace-level logging is enabled.
#[cfg(feature = "logger")]
#[must_use]
pub fn trace_enabled() -> bool {
    log::log_enabled!(log::Level::Trace)
}

#[cfg(not(feature = "logger"))]
pub use noop_logger::{debug, trace, trace_enabled};

#[cfg(not(feature = "logger"))]
mod noop_logger {
    /// Discards its arguments when the `logger` feature is disabled.
    #[macro_export]
    macro_rules! canopy_noop_log {
        ($($arg:tt)+) => {
            if $crate::logger::trace_enabled() {
                // Unreachable: `trace_enabled` is a const false here. The
                // branch keeps the macro arguments "used" for lint purposes.
                let _ = format!($($arg)+);
            }
        };
    }

    pub use canopy_noop_log as debug;
    pub use canopy_noop_log as trace;

    /// Always false without the `logger` feature.
    #[inline]
    #[must_use]
    pub const fn trace_enabled() -> bool {
        false
    }
}
