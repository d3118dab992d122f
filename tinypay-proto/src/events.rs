//! Ledger event records.
//!
//! Every successful state-changing call appends exactly one [`LedgerEvent`],
//! except payment-limit writes which are silent. Events carry the account that
//! emitted them (the caller) and a sequence number assigned by the log.

use serde::{Deserialize, Serialize};

use crate::{Account, Amount, Digest, FeeRate};

/// A single entry in the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    /// Position in the log, starting at zero.
    pub sequence: u64,
    /// The caller whose operation produced this event.
    pub emitter: Account,
    /// What happened.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The observable effect recorded by a [`LedgerEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum EventKind {
    /// The one-time system initialization.
    SystemInitialized {
        /// Account exempt from precommits and credited with fees.
        privileged: Account,
        /// Fee rate fixed for the lifetime of the ledger.
        fee_rate: FeeRate,
    },
    /// Value was credited to an account and its anchor replaced.
    Deposit {
        /// Credited account.
        account: Account,
        /// Deposited value.
        value: Amount,
        /// The anchor stored with the deposit.
        anchor: Digest,
    },
    /// An account replaced its anchor without moving value.
    AnchorRefreshed {
        /// Account whose anchor changed.
        account: Account,
        /// The new anchor.
        new_anchor: Digest,
    },
    /// A merchant registered a pending commitment.
    PreCommitMade {
        /// Submitting merchant.
        account: Account,
        /// The registered commitment digest.
        commit_hash: Digest,
    },
    /// A payment settled.
    PaymentCompleted {
        /// Debited account.
        payer: Account,
        /// Account paid `amount - fee`.
        recipient: Account,
        /// Gross amount debited from the payer.
        amount: Amount,
        /// Portion routed to the privileged account.
        fee: Amount,
        /// The secret revealed by this payment, now the payer's anchor.
        secret: Digest,
    },
}

impl EventKind {
    /// Returns the event name as it appears in the `type` field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SystemInitialized { .. } => "SystemInitialized",
            Self::Deposit { .. } => "Deposit",
            Self::AnchorRefreshed { .. } => "AnchorRefreshed",
            Self::PreCommitMade { .. } => "PreCommitMade",
            Self::PaymentCompleted { .. } => "PaymentCompleted",
        }
    }

    /// Returns `true` if `account` appears in this event's payload.
    #[must_use]
    pub fn involves(&self, account: &Account) -> bool {
        match self {
            Self::SystemInitialized { privileged, .. } => privileged == account,
            Self::Deposit { account: a, .. }
            | Self::AnchorRefreshed { account: a, .. }
            | Self::PreCommitMade { account: a, .. } => a == account,
            Self::PaymentCompleted {
                payer, recipient, ..
            } => payer == account || recipient == account,
        }
    }
}
