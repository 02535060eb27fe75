//! Crate-internal logging.
//!
//! Every event is emitted under the `event_stream` target. Without the `tracing` feature the
//! macros only borrow their field values, so call sites compile the same either way.
//!
//! Call sites use the structured form: `key = value` fields first, then a literal message.

#[cfg(feature = "tracing")]
macro_rules! emit {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!(target: "event_stream", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! emit {
    ($level:ident, $($arg:tt)*) => {
        discard!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($field:ident = % $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        discard!($($rest)*)
    }};
    ($field:ident = ? $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        discard!($($rest)*)
    }};
    ($field:ident = $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        discard!($($rest)*)
    }};
    ($message:literal $(, $value:expr)* $(,)?) => {{
        $(let _ = &$value;)*
    }};
    () => {};
}

#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => { emit!(error, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => { emit!(warn, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => { emit!(info, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => { emit!(debug, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => { emit!(trace, $($arg)*) };
}
