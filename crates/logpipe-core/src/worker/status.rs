//! The gRPC/OTLP transport status → `FlushOutcome` decision table, pulled
//! out as a pure function so any destination driver can reuse it without
//! re-deriving the mapping.

use super::FlushOutcome;

/// A transport-level status code, named after the gRPC status space since
/// that is the common denominator across the destinations this table is
/// meant to serve (OTLP, and gRPC-backed sinks generally). Drivers for
/// other transports translate their own status space into this one at
/// their boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    PermissionDenied,
    /// `details` mirrors gRPC's `RetryInfo`/`QuotaFailure` detail payload:
    /// `true` when the server told us it is a transient, worth-retrying
    /// condition (the decision table's "resource-exhausted with details").
    ResourceExhausted { retryable_detail: bool },
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

/// Maps a transport status to the outcome a `ThreadedDestination` worker
/// should treat it as.
pub fn classify_status(status: TransportStatus) -> FlushOutcome {
    use TransportStatus::*;
    match status {
        Ok => FlushOutcome::Success,

        Unavailable | Cancelled | DeadlineExceeded | Aborted | OutOfRange | DataLoss => {
            FlushOutcome::NotConnected
        }

        Unknown | InvalidArgument | NotFound | PermissionDenied | Unimplemented | Internal => {
            FlushOutcome::Drop
        }

        ResourceExhausted { retryable_detail: true } => FlushOutcome::NotConnected,
        ResourceExhausted { retryable_detail: false } => FlushOutcome::Drop,

        // Treated as a permanent failure rather than retried forever
        // against a precondition that will not fix itself.
        FailedPrecondition | Unauthenticated => FlushOutcome::Drop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_exhausted_depends_on_detail() {
        assert_eq!(
            classify_status(TransportStatus::ResourceExhausted { retryable_detail: true }),
            FlushOutcome::NotConnected
        );
        assert_eq!(
            classify_status(TransportStatus::ResourceExhausted { retryable_detail: false }),
            FlushOutcome::Drop
        );
    }

    #[test]
    fn unavailable_is_a_retryable_connectivity_problem() {
        assert_eq!(classify_status(TransportStatus::Unavailable), FlushOutcome::NotConnected);
    }

    #[test]
    fn invalid_argument_is_permanent() {
        assert_eq!(classify_status(TransportStatus::InvalidArgument), FlushOutcome::Drop);
    }
}
