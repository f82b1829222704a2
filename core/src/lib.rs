//! The sweep engine: probes, name resolution, the coordinator that fans them
//! out, and the sinks that receive finished reports.

pub mod discovery;
pub mod network;
pub mod scanner;
