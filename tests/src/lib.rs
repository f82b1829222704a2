//! End-to-end tests across the workspace crates.

#[cfg(test)]
mod discovery;
#[cfg(test)]
mod support;
#[cfg(test)]
mod sweep;
