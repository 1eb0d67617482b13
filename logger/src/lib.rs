#![no_std]

//! Leveled logging macros that fan out to `defmt` and/or `log`, depending on
//! which features the consuming crate enables. With neither feature enabled
//! every statement compiles away.
//!
//! Format strings must stay within the subset both backends understand, i.e.
//! plain `{}` placeholders.

#[doc(hidden)]
#[macro_export]
macro_rules! dispatch {
    ($level:ident, $($args:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::$level!($($args)*);
        #[cfg(feature = "log")]
        log::$level!($($args)*);
    }};
}

#[macro_export]
macro_rules! trace {
    ($($args:tt)*) => { $crate::dispatch!(trace, $($args)*) };
}

#[macro_export]
macro_rules! debug {
    ($($args:tt)*) => { $crate::dispatch!(debug, $($args)*) };
}

#[macro_export]
macro_rules! info {
    ($($args:tt)*) => { $crate::dispatch!(info, $($args)*) };
}

#[macro_export]
macro_rules! warn {
    ($($args:tt)*) => { $crate::dispatch!(warn, $($args)*) };
}

#[macro_export]
macro_rules! error {
    ($($args:tt)*) => { $crate::dispatch!(error, $($args)*) };
}
