//! Logging macros that forward to `tracing` when the feature is enabled and
//! expand to nothing otherwise.

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::trace!($($arg)+);
        }
    };
}

#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::debug!($($arg)+);
        }
    };
}

#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::info!($($arg)+);
        }
    };
}

#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::warn!($($arg)+);
        }
    };
}

#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::error!($($arg)+);
        }
    };
}
