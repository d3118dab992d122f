//! Ledger state: accounts, system configuration and aggregate counters.
//!
//! [`LedgerState`] is the committed state. It is never mutated by an
//! operation directly. Each state-changing call opens a [`StagedState`]
//! over it, which records only the accounts and counters the call touches.
//! A successful call turns its staging into a [`StateDelta`] and applies it;
//! a failed call drops the staging and the committed state is untouched.

use std::collections::HashMap;

use tinypay_proto::{Account, Amount, Digest, FeeRate, SystemStats, ZERO_DIGEST};

use crate::error::LedgerError;

/// One-time system configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemConfig {
    privileged: Option<Account>,
    fee_rate: FeeRate,
}

impl SystemConfig {
    /// Returns the privileged account, or `None` before initialization.
    #[must_use]
    pub const fn privileged(&self) -> Option<Account> {
        self.privileged
    }

    /// Returns the fee rate. Zero before initialization.
    #[must_use]
    pub const fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Returns `true` once `init_system` has succeeded.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.privileged.is_some()
    }

    /// Returns `true` if `account` is the privileged account.
    #[must_use]
    pub fn is_privileged(&self, account: &Account) -> bool {
        self.privileged.as_ref() == Some(account)
    }
}

/// Per-account ledger record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    /// Custodial balance.
    pub balance: Amount,
    /// Current authentication anchor.
    pub anchor: Digest,
    /// Maximum amount per payment; zero means unlimited.
    pub payment_limit: Amount,
}

/// Committed balances, anchors, limits, configuration and counters.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    accounts: HashMap<Account, AccountState>,
    config: SystemConfig,
    total_deposited: Amount,
    total_paid: Amount,
}

impl LedgerState {
    /// Creates an empty, uninitialized ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a staging area over this state.
    #[must_use]
    pub fn stage(&self) -> StagedState<'_> {
        StagedState {
            base: self,
            touched: HashMap::new(),
            config: self.config,
            total_deposited: self.total_deposited,
            total_paid: self.total_paid,
        }
    }

    /// Writes a staged delta into the committed state.
    pub fn apply(&mut self, delta: StateDelta) {
        self.accounts.extend(delta.accounts);
        self.config = delta.config;
        self.total_deposited = delta.total_deposited;
        self.total_paid = delta.total_paid;
    }

    /// Returns the record of `account`, if it was ever touched.
    #[must_use]
    pub fn account(&self, account: &Account) -> Option<&AccountState> {
        self.accounts.get(account)
    }

    /// Returns the balance of `account`, zero if unknown.
    #[must_use]
    pub fn balance_of(&self, account: &Account) -> Amount {
        self.accounts
            .get(account)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    /// Returns the anchor of `account`, the zero digest if unknown.
    #[must_use]
    pub fn anchor_of(&self, account: &Account) -> Digest {
        self.accounts.get(account).map_or(ZERO_DIGEST, |a| a.anchor)
    }

    /// Returns the payment limit of `account`, zero if unknown.
    #[must_use]
    pub fn payment_limit_of(&self, account: &Account) -> Amount {
        self.accounts
            .get(account)
            .map(|a| a.payment_limit)
            .unwrap_or_default()
    }

    /// Returns the system configuration.
    #[must_use]
    pub const fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Returns the aggregate counters and the current fee rate.
    #[must_use]
    pub const fn stats(&self) -> SystemStats {
        SystemStats {
            total_deposited: self.total_deposited,
            total_paid: self.total_paid,
            fee_rate: self.config.fee_rate,
        }
    }

    /// Returns the number of accounts with a record.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

/// Uncommitted changes layered over a [`LedgerState`].
///
/// Reads see the staged value of an account if the call already touched it,
/// and the committed value otherwise.
#[derive(Debug)]
pub struct StagedState<'a> {
    base: &'a LedgerState,
    touched: HashMap<Account, AccountState>,
    config: SystemConfig,
    total_deposited: Amount,
    total_paid: Amount,
}

impl StagedState<'_> {
    fn record(&self, account: &Account) -> AccountState {
        self.touched
            .get(account)
            .or_else(|| self.base.accounts.get(account))
            .copied()
            .unwrap_or_default()
    }

    /// Sets the privileged account and fee rate. Allowed exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyInitialized`] on any call after the first
    /// successful one.
    pub fn init_system(
        &mut self,
        privileged: Account,
        fee_rate: FeeRate,
    ) -> Result<(), LedgerError> {
        if self.config.is_initialized() {
            return Err(LedgerError::AlreadyInitialized);
        }
        self.config = SystemConfig {
            privileged: Some(privileged),
            fee_rate,
        };
        Ok(())
    }

    /// Credits `value` to `account` and overwrites its anchor.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`] for a zero deposit and
    /// [`LedgerError::Overflow`] if the balance or the deposit counter would
    /// overflow.
    pub fn deposit(
        &mut self,
        account: Account,
        value: Amount,
        anchor: Digest,
    ) -> Result<(), LedgerError> {
        if value.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        let total_deposited = self
            .total_deposited
            .checked_add(value)
            .ok_or(LedgerError::Overflow("total deposited"))?;
        let mut entry = self.record(&account);
        entry.balance = entry
            .balance
            .checked_add(value)
            .ok_or(LedgerError::Overflow("account balance"))?;
        entry.anchor = anchor;
        self.touched.insert(account, entry);
        self.total_deposited = total_deposited;
        Ok(())
    }

    /// Overwrites the anchor of `account`.
    pub fn set_anchor(&mut self, account: Account, anchor: Digest) {
        let mut entry = self.record(&account);
        entry.anchor = anchor;
        self.touched.insert(account, entry);
    }

    /// Sets the payment limit of `account`. Zero disables the limit.
    pub fn set_payment_limit(&mut self, account: Account, limit: Amount) {
        let mut entry = self.record(&account);
        entry.payment_limit = limit;
        self.touched.insert(account, entry);
    }

    /// Removes `amount` from the balance of `payer` and counts it as paid.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if the balance does not
    /// cover `amount`, or [`LedgerError::Overflow`] if the paid counter would
    /// overflow.
    pub fn debit(&mut self, payer: Account, amount: Amount) -> Result<(), LedgerError> {
        let mut entry = self.record(&payer);
        let balance = entry.balance;
        entry.balance = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance { balance, amount })?;
        let total_paid = self
            .total_paid
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("total paid"))?;
        self.touched.insert(payer, entry);
        self.total_paid = total_paid;
        Ok(())
    }

    /// Returns the staged balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: &Account) -> Amount {
        self.record(account).balance
    }

    /// Returns the staged anchor of `account`, the zero digest if unknown.
    #[must_use]
    pub fn anchor_of(&self, account: &Account) -> Digest {
        self.record(account).anchor
    }

    /// Returns the staged payment limit of `account`.
    #[must_use]
    pub fn payment_limit_of(&self, account: &Account) -> Amount {
        self.record(account).payment_limit
    }

    /// Returns the staged system configuration.
    #[must_use]
    pub const fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Closes the staging area, keeping only what changed.
    #[must_use]
    pub fn into_delta(self) -> StateDelta {
        StateDelta {
            accounts: self.touched,
            config: self.config,
            total_deposited: self.total_deposited,
            total_paid: self.total_paid,
        }
    }
}

/// The changes of one successful call, ready for [`LedgerState::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    accounts: HashMap<Account, AccountState>,
    config: SystemConfig,
    total_deposited: Amount,
    total_paid: Amount,
}

impl StateDelta {
    /// Returns the number of account records the delta rewrites.
    #[must_use]
    pub fn touched_accounts(&self) -> usize {
        self.accounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const USER: Account = address!("0x1111111111111111111111111111111111111111");
    const PAYMASTER: Account = address!("0x9999999999999999999999999999999999999999");

    #[test]
    fn test_init_system_once() {
        let base = LedgerState::new();
        let mut state = base.stage();
        let rate = FeeRate::from_bps(100).unwrap();
        state.init_system(PAYMASTER, rate).unwrap();
        assert!(state.config().is_privileged(&PAYMASTER));
        assert_eq!(
            state.init_system(USER, FeeRate::ZERO),
            Err(LedgerError::AlreadyInitialized)
        );
        assert_eq!(state.config().fee_rate(), rate);
        assert_eq!(state.config().privileged(), Some(PAYMASTER));
    }

    #[test]
    fn test_deposit_credits_and_overwrites_anchor() {
        let mut base = LedgerState::new();
        let mut state = base.stage();
        state
            .deposit(USER, Amount::from(5u64), Digest::with_last_byte(1))
            .unwrap();
        state
            .deposit(USER, Amount::from(2u64), Digest::with_last_byte(2))
            .unwrap();
        assert_eq!(state.balance_of(&USER), Amount::from(7u64));
        let delta = state.into_delta();
        base.apply(delta);

        assert_eq!(base.balance_of(&USER), Amount::from(7u64));
        assert_eq!(base.anchor_of(&USER), Digest::with_last_byte(2));
        assert_eq!(base.stats().total_deposited, Amount::from(7u64));
    }

    #[test]
    fn test_zero_deposit_rejected() {
        let base = LedgerState::new();
        let mut state = base.stage();
        assert_eq!(
            state.deposit(USER, Amount::ZERO, Digest::with_last_byte(1)),
            Err(LedgerError::ZeroAmount)
        );
        assert_eq!(state.into_delta().touched_accounts(), 0);
    }

    #[test]
    fn test_deposit_overflow_leaves_counters() {
        let base = LedgerState::new();
        let mut state = base.stage();
        state
            .deposit(USER, Amount::MAX, Digest::with_last_byte(1))
            .unwrap();
        assert_eq!(
            state.deposit(USER, Amount::from(1u64), Digest::with_last_byte(2)),
            Err(LedgerError::Overflow("total deposited"))
        );
        assert_eq!(state.anchor_of(&USER), Digest::with_last_byte(1));
    }

    #[test]
    fn test_debit_checks_balance() {
        let base = LedgerState::new();
        let mut state = base.stage();
        state
            .deposit(USER, Amount::from(10u64), Digest::ZERO)
            .unwrap();
        let err = state.debit(USER, Amount::from(11u64)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                balance: Amount::from(10u64),
                amount: Amount::from(11u64),
            }
        );
        state.debit(USER, Amount::from(10u64)).unwrap();
        assert_eq!(state.balance_of(&USER), Amount::ZERO);
        assert_eq!(state.into_delta().total_paid, Amount::from(10u64));
    }

    #[test]
    fn test_staged_changes_invisible_until_applied() {
        let mut base = LedgerState::new();
        let mut state = base.stage();
        state.set_payment_limit(USER, Amount::from(3u64));
        assert_eq!(state.payment_limit_of(&USER), Amount::from(3u64));
        assert_eq!(base.payment_limit_of(&USER), Amount::ZERO);

        let delta = state.into_delta();
        base.apply(delta);
        assert_eq!(base.payment_limit_of(&USER), Amount::from(3u64));
        assert!(base.account(&USER).is_some());
    }

    #[test]
    fn test_write_on_large_ledger_touches_one_record() {
        let mut base = LedgerState::new();
        let mut state = base.stage();
        for i in 0..10_000u64 {
            let account = Account::left_padding_from(&i.to_be_bytes());
            state
                .deposit(account, Amount::from(1u64), Digest::ZERO)
                .unwrap();
        }
        let delta = state.into_delta();
        base.apply(delta);
        assert_eq!(base.account_count(), 10_000);

        let account = Account::left_padding_from(&7u64.to_be_bytes());
        let mut state = base.stage();
        state.set_anchor(account, Digest::with_last_byte(7));
        let delta = state.into_delta();
        assert_eq!(delta.touched_accounts(), 1);

        base.apply(delta);
        assert_eq!(base.account_count(), 10_000);
        assert_eq!(base.anchor_of(&account), Digest::with_last_byte(7));
        assert_eq!(base.balance_of(&account), Amount::from(1u64));
        assert_eq!(base.stats().total_deposited, Amount::from(10_000u64));
    }

    #[test]
    fn test_unknown_account_defaults() {
        let base = LedgerState::new();
        assert_eq!(base.balance_of(&USER), Amount::ZERO);
        assert_eq!(base.anchor_of(&USER), ZERO_DIGEST);
        assert_eq!(base.payment_limit_of(&USER), Amount::ZERO);
        assert_eq!(base.stats(), SystemStats::default());
        assert_eq!(base.stage().anchor_of(&USER), ZERO_DIGEST);
    }
}
