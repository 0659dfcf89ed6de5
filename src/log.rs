//! Logging macros
//!
//! With the `esp32-log` feature the macros print through `esp-println`,
//! otherwise they compile to nothing while still type-checking their
//! arguments.

#[cfg(feature = "esp32-log")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        esp_println::println!($($arg)*)
    };
}

#[cfg(not(feature = "esp32-log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        if false {
            let _ = core::format_args!($($arg)*).as_str();
        }
    }};
}

#[cfg(feature = "esp32-log")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        esp_println::println!("WARN {}", core::format_args!($($arg)*))
    };
}

#[cfg(not(feature = "esp32-log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        if false {
            let _ = core::format_args!($($arg)*).as_str();
        }
    }};
}

pub(crate) use {log_debug, log_warn};
