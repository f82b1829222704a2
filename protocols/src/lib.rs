//! Wire formats spoken by the sweep engine outside of the probes themselves.

pub mod dns;
