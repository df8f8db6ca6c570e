/// Returns early from a function producing [`crate::error::Result`] with a
/// formatted [`crate::error::Error::Generic`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::generic(format!($($arg)*)))
    };
}

// Logging goes through the re-exported `tracing` so dependents need no
// direct dependency on it.

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::tracing::trace!($($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::tracing::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::tracing::error!($($arg)*)
    };
}

/// Panics with a formatted message unless `cond` holds. Used for internal
/// invariants of IR construction, which indicate a bug in the caller.
#[macro_export]
macro_rules! assert_expr {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            panic!("assertion failed: {}", format_args!($($arg)*));
        }
    };
}
