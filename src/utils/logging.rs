//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag,
//! so chatty loop modules can be silenced without touching the log filter.
//!
//! Each module using them defines:
//! ```rust
//! const ENABLE_LOGS: bool = true;
//! ```

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
