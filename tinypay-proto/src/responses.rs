//! Read-side views returned by the ledger.

use serde::{Deserialize, Serialize};

use crate::{Account, Amount, Digest, FeeRate};

/// Aggregate ledger counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    /// Cumulative value ever deposited.
    pub total_deposited: Amount,
    /// Cumulative gross value ever paid out of balances.
    pub total_paid: Amount,
    /// Current fee rate.
    pub fee_rate: FeeRate,
}

/// How the commitment step of a payment was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentMode {
    /// A pending merchant commitment matched and was consumed.
    Required,
    /// The privileged account skipped the commitment with the zero digest.
    PrivilegedBypass,
}

/// The settlement plan of a payment, returned on completion or dry-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Debited account.
    pub payer: Account,
    /// Credited account.
    pub recipient: Account,
    /// Gross amount debited.
    pub amount: Amount,
    /// Fee routed to the privileged account.
    pub fee: Amount,
    /// `amount - fee`, transferred to the recipient.
    pub net: Amount,
    /// The payer's anchor after the payment.
    pub new_anchor: Digest,
    /// Commitment path taken.
    pub mode: CommitmentMode,
}
