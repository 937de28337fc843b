use thiserror::Error;

/// Oracle error type.
///
/// Every variant maps to exactly one error code in the HTTP boundary's
/// taxonomy (see `oracle-server`'s `ApiError`). Variants never carry the
/// oracle private key, a `k` value, or an internal stack trace.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The requested time parameter could not be parsed.
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    /// The canonical publish instant falls after the asset's configured range.
    #[error("requested instant is too far in the future: {0}")]
    InstantTooLate(String),
    /// A signature was requested for an instant that has not occurred yet.
    #[error("publish instant is not yet due: {0}")]
    InstantNotYetDue(String),
    /// The event type is not one the outcome encoder knows how to handle.
    #[error("unsupported event type: {0}")]
    UnsupportedEventType(String),
    /// No asset is configured under the given id.
    #[error("unknown asset: {0}")]
    UnknownAsset(String),
    /// The price/outcome feed could not produce a value.
    #[error("feed unavailable: {0}")]
    FeedUnavailable(String),
    /// The secp256k1 backend failed to produce or verify a signature.
    #[error("crypto backend failure: {0}")]
    CryptoFailure(String),
    /// The store failed to read or write.
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// A record was not found where one was expected.
    #[error("not found")]
    NotFound,
    /// Insert lost a race against a concurrent insert of the same composite key.
    ///
    /// Internal to the engine/store boundary; `Oracle::commit` always catches
    /// this and re-reads. It should never reach the HTTP boundary.
    #[error("duplicate key")]
    DuplicateKey,
    /// `seal` found the row already sealed with a different value than the
    /// one being sealed now. A catastrophic invariant violation (nonce reuse
    /// risk) that `Oracle::sign`'s idempotency check should make unreachable
    /// in practice.
    #[error("commitment already sealed with a different value")]
    SealConflict,
}

impl Error {
    /// A stable, machine-readable error code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidTimeFormat(_) => "invalid-time-format",
            Error::InstantTooLate(_) => "invalid-time-too-late",
            Error::InstantNotYetDue(_) => "invalid-time-too-early",
            Error::UnsupportedEventType(_) => "unsupported-event-type",
            Error::UnknownAsset(_) => "unknown-asset",
            Error::FeedUnavailable(_) => "feed-unavailable",
            Error::CryptoFailure(_) => "crypto-failure",
            Error::StorageFailure(_) | Error::NotFound | Error::DuplicateKey => "storage-failure",
            Error::SealConflict => "storage-failure",
        }
    }
}
