//! Machine-readable failure codes for ledger operations.
//!
//! The ledger core defines the error enum; this module defines the stable
//! wire codes it maps onto so that clients can branch on failures without
//! parsing messages.

use serde::{Deserialize, Serialize};

/// Machine-readable reason codes for rejected ledger calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorReason {
    /// The system was already initialized.
    AlreadyInitialized,
    /// The fee rate is above 10 000 bps.
    InvalidFeeRate,
    /// A deposit carried no value.
    ZeroAmount,
    /// The revealed secret does not hash to the payer's anchor.
    AuthMismatch,
    /// The commitment digest does not match the payment parameters.
    CommitMismatch,
    /// No pending commitment exists for the digest.
    UnknownCommit,
    /// The commitment digest is already registered.
    DuplicateCommit,
    /// The amount exceeds the payer's payment limit.
    PaymentLimitExceeded,
    /// The payer's balance does not cover the amount.
    InsufficientBalance,
    /// A native value transfer could not be completed.
    TransferFailed,
    /// A balance or counter would overflow.
    Overflow,
    /// A lifecycle hook aborted the call.
    Aborted,
}

impl ErrorReason {
    /// Returns the `snake_case` string representation matching the wire format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "already_initialized",
            Self::InvalidFeeRate => "invalid_fee_rate",
            Self::ZeroAmount => "zero_amount",
            Self::AuthMismatch => "auth_mismatch",
            Self::CommitMismatch => "commit_mismatch",
            Self::UnknownCommit => "unknown_commit",
            Self::DuplicateCommit => "duplicate_commit",
            Self::PaymentLimitExceeded => "payment_limit_exceeded",
            Self::InsufficientBalance => "insufficient_balance",
            Self::TransferFailed => "transfer_failed",
            Self::Overflow => "overflow",
            Self::Aborted => "aborted",
        }
    }
}

impl core::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for converting errors into structured ledger problems.
pub trait AsLedgerProblem {
    /// Converts this error into a [`LedgerProblem`].
    fn as_ledger_problem(&self) -> LedgerProblem;
}

/// A structured failure with reason code and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProblem {
    reason: ErrorReason,
    details: String,
}

impl LedgerProblem {
    /// Creates a new problem with the given reason and details.
    #[must_use]
    pub const fn new(reason: ErrorReason, details: String) -> Self {
        Self { reason, details }
    }

    /// Returns the error reason code.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        self.reason
    }

    /// Returns the human-readable error details.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_wire_format_matches_as_str() {
        for reason in [
            ErrorReason::AuthMismatch,
            ErrorReason::PaymentLimitExceeded,
            ErrorReason::TransferFailed,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }
}
