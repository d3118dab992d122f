//! Payment completion state machine.
//!
//! [`PaymentEngine::execute`] runs the full check-then-act sequence of one
//! payment against a [`StagedState`] and [`StagedCommits`]:
//!
//! 1. authenticate the revealed secret against the payer's anchor
//! 2. verify and consume the merchant commitment, unless the privileged
//!    account presents the zero digest
//! 3. enforce the payer's payment limit
//! 4. debit the payer, failing on insufficient balance
//! 5. split the amount into recipient and fee payouts
//! 6. advance the payer's anchor to the revealed secret
//!
//! The engine never moves native value. It returns a [`SettlementPlan`]
//! whose payouts the caller hands to the host before publishing the staged
//! state; if the payouts fail the staged state is dropped.

use tinypay_proto::{
    Account, Amount, CommitmentMode, Digest, EventKind, PaymentReceipt, ZERO_DIGEST,
    commitment_digest,
};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::auth::AuthenticationChain;
use crate::commit::StagedCommits;
use crate::error::LedgerError;
use crate::payout::Payout;
use crate::state::{StagedState, SystemConfig};

/// Arguments of a `complete_payment` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Secret whose digest must equal the payer's anchor.
    pub secret: Digest,
    /// Account debited.
    pub payer: Account,
    /// Account paid `amount - fee`.
    pub recipient: Account,
    /// Gross amount.
    pub amount: Amount,
    /// The merchant commitment, or [`ZERO_DIGEST`] for the privileged bypass.
    pub commit_hash: Digest,
}

impl PaymentRequest {
    /// Builds a request whose commitment digest is derived from its own
    /// parameters, as a merchant would precommit it.
    #[must_use]
    pub fn committed(
        secret: Digest,
        payer: Account,
        recipient: Account,
        amount: Amount,
    ) -> Self {
        Self {
            secret,
            payer,
            recipient,
            amount,
            commit_hash: commitment_digest(payer, recipient, amount, secret),
        }
    }

    /// Builds a request that carries the zero digest in place of a commitment.
    #[must_use]
    pub const fn bypass(
        secret: Digest,
        payer: Account,
        recipient: Account,
        amount: Amount,
    ) -> Self {
        Self {
            secret,
            payer,
            recipient,
            amount,
            commit_hash: ZERO_DIGEST,
        }
    }

    /// Recomputes the commitment digest these parameters bind to.
    #[must_use]
    pub fn expected_commitment(&self) -> Digest {
        commitment_digest(self.payer, self.recipient, self.amount, self.secret)
    }
}

/// The outcome of a successful [`PaymentEngine::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    receipt: PaymentReceipt,
    payouts: Vec<Payout>,
}

impl SettlementPlan {
    /// The receipt describing the payment.
    #[must_use]
    pub const fn receipt(&self) -> &PaymentReceipt {
        &self.receipt
    }

    /// Native value transfers the host must apply, zero-value transfers omitted.
    #[must_use]
    pub fn payouts(&self) -> &[Payout] {
        &self.payouts
    }

    /// The event recorded once the plan is committed.
    #[must_use]
    pub const fn event(&self) -> EventKind {
        EventKind::PaymentCompleted {
            payer: self.receipt.payer,
            recipient: self.receipt.recipient,
            amount: self.receipt.amount,
            fee: self.receipt.fee,
            secret: self.receipt.new_anchor,
        }
    }

    /// Consumes the plan, returning its receipt.
    #[must_use]
    pub fn into_receipt(self) -> PaymentReceipt {
        self.receipt
    }
}

/// Executes payments against staged ledger state.
#[derive(Debug)]
pub struct PaymentEngine<'t, 'a> {
    state: &'t mut StagedState<'a>,
    commits: &'t mut StagedCommits<'a>,
}

impl<'t, 'a> PaymentEngine<'t, 'a> {
    /// Binds the engine to a staged state and registry.
    pub const fn new(
        state: &'t mut StagedState<'a>,
        commits: &'t mut StagedCommits<'a>,
    ) -> Self {
        Self { state, commits }
    }

    /// Selects the commitment path for a call.
    ///
    /// The bypass requires both that `caller` is the privileged account and
    /// that the supplied digest is the zero sentinel. Anything else goes
    /// through the regular commitment check.
    #[must_use]
    pub fn select_mode(
        config: &SystemConfig,
        caller: &Account,
        commit_hash: &Digest,
    ) -> CommitmentMode {
        if config.is_privileged(caller) && *commit_hash == ZERO_DIGEST {
            CommitmentMode::PrivilegedBypass
        } else {
            CommitmentMode::Required
        }
    }

    /// Runs every payment step on the staged state.
    ///
    /// On error the staged state may be partially modified and must be
    /// discarded by the caller.
    ///
    /// # Errors
    ///
    /// Returns, in check order, [`LedgerError::AuthMismatch`],
    /// [`LedgerError::CommitMismatch`], [`LedgerError::UnknownCommit`],
    /// [`LedgerError::PaymentLimitExceeded`], [`LedgerError::InsufficientBalance`]
    /// or [`LedgerError::Overflow`].
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            skip_all,
            err,
            fields(payer = %request.payer, recipient = %request.recipient, amount = %request.amount)
        )
    )]
    pub fn execute(
        &mut self,
        caller: Account,
        request: &PaymentRequest,
    ) -> Result<SettlementPlan, LedgerError> {
        let proof = AuthenticationChain::authenticate(self.state, request.payer, request.secret)?;

        let mode = Self::select_mode(self.state.config(), &caller, &request.commit_hash);
        if mode == CommitmentMode::Required {
            if request.expected_commitment() != request.commit_hash {
                return Err(LedgerError::CommitMismatch {
                    commit_hash: request.commit_hash,
                });
            }
            self.commits.consume(&request.commit_hash)?;
        }

        let limit = self.state.payment_limit_of(&request.payer);
        if !limit.is_zero() && request.amount > limit {
            return Err(LedgerError::PaymentLimitExceeded {
                amount: request.amount,
                limit,
            });
        }

        self.state.debit(request.payer, request.amount)?;
        let (net, fee) = self.state.config().fee_rate().split(request.amount);

        let mut payouts = Vec::with_capacity(2);
        if !net.is_zero() {
            payouts.push(Payout {
                to: request.recipient,
                amount: net,
            });
        }
        if !fee.is_zero() {
            if let Some(privileged) = self.state.config().privileged() {
                payouts.push(Payout {
                    to: privileged,
                    amount: fee,
                });
            }
        }

        AuthenticationChain::advance(self.state, proof);

        Ok(SettlementPlan {
            receipt: PaymentReceipt {
                payer: request.payer,
                recipient: request.recipient,
                amount: request.amount,
                fee,
                net,
                new_anchor: request.secret,
                mode,
            },
            payouts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{CommitRegistry, CommitStatus};
    use crate::state::LedgerState;
    use alloy_primitives::address;
    use tinypay_proto::{FeeRate, anchor_for};

    const USER: Account = address!("0x1111111111111111111111111111111111111111");
    const MERCHANT: Account = address!("0x4444444444444444444444444444444444444444");
    const RECIPIENT: Account = address!("0x5555555555555555555555555555555555555555");
    const PAYMASTER: Account = address!("0x9999999999999999999999999999999999999999");

    fn funded(secret: Digest, balance: u64) -> (LedgerState, CommitRegistry) {
        let mut base = LedgerState::new();
        let mut state = base.stage();
        state
            .init_system(PAYMASTER, FeeRate::from_bps(100).unwrap())
            .unwrap();
        state
            .deposit(USER, Amount::from(balance), anchor_for(&secret))
            .unwrap();
        let delta = state.into_delta();
        base.apply(delta);
        (base, CommitRegistry::new())
    }

    #[test]
    fn test_committed_payment_settles() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 10_000);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        let request = PaymentRequest::committed(secret, USER, RECIPIENT, Amount::from(5_000u64));
        commits.register(MERCHANT, request.commit_hash).unwrap();

        let plan = PaymentEngine::new(&mut state, &mut commits)
            .execute(MERCHANT, &request)
            .unwrap();

        assert_eq!(plan.receipt().mode, CommitmentMode::Required);
        assert_eq!(plan.receipt().fee, Amount::from(50u64));
        assert_eq!(
            plan.payouts(),
            &[
                Payout {
                    to: RECIPIENT,
                    amount: Amount::from(4_950u64)
                },
                Payout {
                    to: PAYMASTER,
                    amount: Amount::from(50u64)
                },
            ]
        );
        assert_eq!(state.balance_of(&USER), Amount::from(5_000u64));
        assert_eq!(state.anchor_of(&USER), secret);
        assert_eq!(
            commits.status(&request.commit_hash),
            Some(CommitStatus::Consumed)
        );
        assert_eq!(base.balance_of(&USER), Amount::from(10_000u64));
    }

    #[test]
    fn test_auth_checked_before_commitment() {
        let (base, registry) = funded(Digest::with_last_byte(1), 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        let request = PaymentRequest::committed(
            Digest::with_last_byte(2),
            USER,
            RECIPIENT,
            Amount::from(1u64),
        );
        commits.register(MERCHANT, request.commit_hash).unwrap();

        let err = PaymentEngine::new(&mut state, &mut commits)
            .execute(MERCHANT, &request)
            .unwrap_err();
        assert_eq!(err, LedgerError::AuthMismatch { payer: USER });
        assert_eq!(
            commits.status(&request.commit_hash),
            Some(CommitStatus::Pending)
        );
    }

    #[test]
    fn test_commit_mismatch() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        let mut request = PaymentRequest::committed(secret, USER, RECIPIENT, Amount::from(1u64));
        commits.register(MERCHANT, request.commit_hash).unwrap();
        request.amount = Amount::from(2u64);

        let err = PaymentEngine::new(&mut state, &mut commits)
            .execute(MERCHANT, &request)
            .unwrap_err();
        assert!(matches!(err, LedgerError::CommitMismatch { .. }));
    }

    #[test]
    fn test_unregistered_commitment() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        let request = PaymentRequest::committed(secret, USER, RECIPIENT, Amount::from(1u64));

        let err = PaymentEngine::new(&mut state, &mut commits)
            .execute(MERCHANT, &request)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownCommit { .. }));
    }

    #[test]
    fn test_bypass_only_for_privileged_zero_digest() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        let request = PaymentRequest::bypass(secret, USER, MERCHANT, Amount::from(10u64));

        let err = PaymentEngine::new(&mut state, &mut commits)
            .execute(MERCHANT, &request)
            .unwrap_err();
        assert!(matches!(err, LedgerError::CommitMismatch { .. }));

        let plan = PaymentEngine::new(&mut state, &mut commits)
            .execute(PAYMASTER, &request)
            .unwrap();
        assert_eq!(plan.receipt().mode, CommitmentMode::PrivilegedBypass);
    }

    #[test]
    fn test_privileged_with_real_commitment_is_checked() {
        let (base, _) = funded(Digest::ZERO, 1);
        let config = *base.config();
        assert_eq!(
            PaymentEngine::select_mode(&config, &PAYMASTER, &Digest::with_last_byte(3)),
            CommitmentMode::Required
        );
        assert_eq!(
            PaymentEngine::select_mode(&config, &PAYMASTER, &ZERO_DIGEST),
            CommitmentMode::PrivilegedBypass
        );
        assert_eq!(
            PaymentEngine::select_mode(&SystemConfig::default(), &PAYMASTER, &ZERO_DIGEST),
            CommitmentMode::Required
        );
    }

    #[test]
    fn test_limit_checked_before_balance() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        state.set_payment_limit(USER, Amount::from(50u64));
        let request = PaymentRequest::bypass(secret, USER, RECIPIENT, Amount::from(500u64));

        let err = PaymentEngine::new(&mut state, &mut commits)
            .execute(PAYMASTER, &request)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::PaymentLimitExceeded {
                amount: Amount::from(500u64),
                limit: Amount::from(50u64),
            }
        );
    }

    #[test]
    fn test_amount_equal_to_limit_allowed() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        state.set_payment_limit(USER, Amount::from(50u64));
        let request = PaymentRequest::bypass(secret, USER, RECIPIENT, Amount::from(50u64));

        assert!(
            PaymentEngine::new(&mut state, &mut commits)
                .execute(PAYMASTER, &request)
                .is_ok()
        );
    }

    #[test]
    fn test_insufficient_balance() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        let request = PaymentRequest::bypass(secret, USER, RECIPIENT, Amount::from(101u64));

        let err = PaymentEngine::new(&mut state, &mut commits)
            .execute(PAYMASTER, &request)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_small_amount_has_no_fee_payout() {
        let secret = Digest::with_last_byte(1);
        let (base, registry) = funded(secret, 100);
        let (mut state, mut commits) = (base.stage(), registry.stage());
        let request = PaymentRequest::bypass(secret, USER, RECIPIENT, Amount::from(99u64));

        let plan = PaymentEngine::new(&mut state, &mut commits)
            .execute(PAYMASTER, &request)
            .unwrap();
        assert_eq!(plan.receipt().fee, Amount::ZERO);
        assert_eq!(plan.payouts().len(), 1);
        assert!(matches!(plan.event(), EventKind::PaymentCompleted { .. }));
    }
}
