//! Native value transfer seam.
//!
//! Payments move value out of the custodial ledger to the recipient and the
//! privileged account. The host supplies that movement through [`Payouts`];
//! the engine only ever hands it a complete, pre-computed batch after every
//! check has passed.

use std::collections::{HashMap, HashSet};

use tinypay_proto::{Account, Amount};

/// A single outbound value transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    /// Receiving account.
    pub to: Account,
    /// Value moved.
    pub amount: Amount,
}

/// A transfer in a batch could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transfer of {amount} to {to} failed: {reason}")]
pub struct PayoutError {
    /// Receiving account of the failed transfer.
    pub to: Account,
    /// Value of the failed transfer.
    pub amount: Amount,
    /// Host-specific failure description.
    pub reason: String,
}

/// Host primitive for moving native value out of the ledger.
///
/// Implementations must be all-or-nothing: when `settle` returns an error
/// none of the batch may have been applied.
pub trait Payouts: Send {
    /// Applies every payout in `batch`, or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`PayoutError`] describing the first transfer that could not
    /// be completed.
    fn settle(&mut self, batch: &[Payout]) -> Result<(), PayoutError>;
}

/// In-memory native wallets.
///
/// Holds the external (non-ledger) balance of every account that received a
/// payout. Accounts marked with [`NativeBank::reject_transfers_to`] refuse
/// incoming value, the way a receiving contract without a payable fallback
/// would.
///
/// The bank is an outbound sink only. Deposited value arrives from the host
/// and is never debited from a wallet here, so wallet balances count payouts
/// and nothing else.
#[derive(Debug, Clone, Default)]
pub struct NativeBank {
    wallets: HashMap<Account, Amount>,
    rejecting: HashSet<Account>,
}

impl NativeBank {
    /// Creates a bank with no wallets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the external balance of `account`.
    #[must_use]
    pub fn wallet_balance(&self, account: &Account) -> Amount {
        self.wallets.get(account).copied().unwrap_or_default()
    }

    /// Makes every future transfer to `account` fail.
    pub fn reject_transfers_to(&mut self, account: Account) {
        self.rejecting.insert(account);
    }

    /// Lets `account` receive value again.
    pub fn accept_transfers_to(&mut self, account: &Account) {
        self.rejecting.remove(account);
    }
}

impl Payouts for NativeBank {
    fn settle(&mut self, batch: &[Payout]) -> Result<(), PayoutError> {
        let mut credited: HashMap<Account, Amount> = HashMap::new();
        for payout in batch {
            if self.rejecting.contains(&payout.to) {
                return Err(PayoutError {
                    to: payout.to,
                    amount: payout.amount,
                    reason: "receiver rejected the transfer".to_owned(),
                });
            }
            let current = credited
                .get(&payout.to)
                .copied()
                .unwrap_or_else(|| self.wallet_balance(&payout.to));
            let next = current
                .checked_add(payout.amount)
                .ok_or_else(|| PayoutError {
                    to: payout.to,
                    amount: payout.amount,
                    reason: "wallet balance overflow".to_owned(),
                })?;
            credited.insert(payout.to, next);
        }
        self.wallets.extend(credited);
        Ok(())
    }
}
