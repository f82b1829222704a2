//! Logging macros shared by every crate of the workspace.
//!
//! They forward to `tracing`, so the subscriber installed by the binary decides
//! how (and whether) they are rendered. `success!` is an `INFO` event under a
//! dedicated target the terminal formatter recognises.

#[doc(hidden)]
pub use tracing as __tracing;

pub const SUCCESS_TARGET: &str = "sweepr::success";

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::__tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::log::__tracing::info!(target: "sweepr::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log::__tracing::error!($($arg)*)
    };
}
