//! Error types for ledger operations.
//!
//! Every variant is a synchronous validation failure. A call that returns
//! any of them has left the committed ledger untouched.

use tinypay_proto::{
    Account, Amount, AsLedgerProblem, Digest, ErrorReason, FeeRateError, LedgerProblem,
};

use crate::payout::PayoutError;

/// Errors returned by state-changing ledger calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// `init_system` was called a second time.
    #[error("system is already initialized")]
    AlreadyInitialized,
    /// The fee rate is out of range.
    #[error(transparent)]
    InvalidFeeRate(#[from] FeeRateError),
    /// A deposit carried no value.
    #[error("deposit value must be greater than zero")]
    ZeroAmount,
    /// The revealed secret does not hash to the payer's anchor.
    #[error("secret does not unlock the anchor of {payer}")]
    AuthMismatch {
        /// The payer whose anchor was checked.
        payer: Account,
    },
    /// The commitment digest does not encode the payment parameters.
    #[error("commitment {commit_hash} does not match the payment parameters")]
    CommitMismatch {
        /// The supplied digest.
        commit_hash: Digest,
    },
    /// The commitment digest is not pending.
    #[error("no pending commitment {commit_hash}")]
    UnknownCommit {
        /// The supplied digest.
        commit_hash: Digest,
    },
    /// The commitment digest was registered before.
    #[error("commitment {commit_hash} is already registered")]
    DuplicateCommit {
        /// The supplied digest.
        commit_hash: Digest,
    },
    /// The amount is above the payer's nonzero payment limit.
    #[error("amount {amount} exceeds payment limit {limit}")]
    PaymentLimitExceeded {
        /// Requested amount.
        amount: Amount,
        /// The payer's limit.
        limit: Amount,
    },
    /// The payer's ledger balance does not cover the amount.
    #[error("balance {balance} does not cover amount {amount}")]
    InsufficientBalance {
        /// The payer's balance.
        balance: Amount,
        /// Requested amount.
        amount: Amount,
    },
    /// The host could not move native value.
    #[error(transparent)]
    TransferFailed(#[from] PayoutError),
    /// A balance or aggregate counter would overflow.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
    /// A `before_payment` hook aborted the call.
    #[error("{reason}: {message}")]
    Aborted {
        /// Machine-readable abort reason.
        reason: String,
        /// Human-readable abort message.
        message: String,
    },
}

impl LedgerError {
    /// Returns the wire reason code for this error.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        match self {
            Self::AlreadyInitialized => ErrorReason::AlreadyInitialized,
            Self::InvalidFeeRate(_) => ErrorReason::InvalidFeeRate,
            Self::ZeroAmount => ErrorReason::ZeroAmount,
            Self::AuthMismatch { .. } => ErrorReason::AuthMismatch,
            Self::CommitMismatch { .. } => ErrorReason::CommitMismatch,
            Self::UnknownCommit { .. } => ErrorReason::UnknownCommit,
            Self::DuplicateCommit { .. } => ErrorReason::DuplicateCommit,
            Self::PaymentLimitExceeded { .. } => ErrorReason::PaymentLimitExceeded,
            Self::InsufficientBalance { .. } => ErrorReason::InsufficientBalance,
            Self::TransferFailed(_) => ErrorReason::TransferFailed,
            Self::Overflow(_) => ErrorReason::Overflow,
            Self::Aborted { .. } => ErrorReason::Aborted,
        }
    }
}

impl AsLedgerProblem for LedgerError {
    fn as_ledger_problem(&self) -> LedgerProblem {
        LedgerProblem::new(self.reason(), self.to_string())
    }
}
