//! Shared building blocks for `sweepr`.
//!
//! * [`network`]: range specifications, address expansion and the probe/report model.
//! * [`config`]: the explicit configuration handed to the sweep engine.
//! * [`error`]: typed errors for invalid or oversized input.
//! * [`log`]: logging macros used across the workspace.

pub mod config;
pub mod error;
pub mod log;
pub mod network;
pub mod utils;
