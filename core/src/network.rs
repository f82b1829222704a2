//! Concrete liveness probes.

use std::io::{self, ErrorKind};

use sweepr_common::network::report::ProbeErrorKind;

pub mod icmp;
pub mod tcp;

/// Maps a socket error onto the probe taxonomy.
pub(crate) fn classify_io_error(err: &io::Error) -> ProbeErrorKind {
    match err.kind() {
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => ProbeErrorKind::Unreachable,
        ErrorKind::TimedOut => ProbeErrorKind::Timeout,
        _ => ProbeErrorKind::SendError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_onto_probe_errors() {
        let unreachable = io::Error::from(ErrorKind::HostUnreachable);
        let no_route = io::Error::from(ErrorKind::NetworkUnreachable);
        let denied = io::Error::from(ErrorKind::PermissionDenied);

        assert_eq!(classify_io_error(&unreachable), ProbeErrorKind::Unreachable);
        assert_eq!(classify_io_error(&no_route), ProbeErrorKind::Unreachable);
        assert_eq!(classify_io_error(&denied), ProbeErrorKind::SendError);
    }
}
