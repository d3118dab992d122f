//! The shared, serialized ledger handle.
//!
//! [`TinyPay`] owns the committed ledger state and orders every
//! state-changing call through a single writer lock. Each call:
//!
//! 1. takes the writer lock
//! 2. opens a [`Transaction`] over the committed [`Snapshot`]
//! 3. runs all checks and mutations inside the transaction, which records
//!    only the accounts, commitments and counters it touches
//! 4. applies native payouts through the host [`Payouts`] implementation
//! 5. applies the recorded delta and appends the event in one step
//!
//! Any error before step 5 drops the transaction, so a failed call has no
//! persisted effect. The cost of a call is proportional to what it touches,
//! not to the size of the ledger.
//!
//! Readers never observe a transaction. The snapshot is updated in place
//! unless a reader still holds an [`Arc`] from [`TinyPay::snapshot`], in which
//! case that reader keeps its view and the ledger copies on write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use tinypay_proto::{
    Account, Amount, Digest, EventKind, FeeRate, LedgerEvent, PaymentReceipt, SystemStats,
};
#[cfg(feature = "telemetry")]
use tracing::instrument;
#[cfg(feature = "telemetry")]
use tracing_core::Level;

use crate::commit::{CommitDelta, CommitRegistry, CommitStatus, StagedCommits};
use crate::config::LedgerConfig;
use crate::engine::{PaymentEngine, PaymentRequest, SettlementPlan};
use crate::error::LedgerError;
use crate::events::EventLog;
use crate::hooks::{HookChain, PaymentHookContext, PaymentHooks};
use crate::payout::{NativeBank, Payouts};
use crate::state::{LedgerState, StagedState, StateDelta, SystemConfig};

/// A consistent view of the ledger: account state plus commitments.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Balances, anchors, limits, configuration and counters.
    pub state: LedgerState,
    /// Merchant commitments.
    pub commits: CommitRegistry,
}

impl Snapshot {
    /// Opens a transaction over this snapshot.
    #[must_use]
    pub fn begin(&self) -> Transaction<'_> {
        Transaction {
            state: self.state.stage(),
            commits: self.commits.stage(),
        }
    }

    fn apply(&mut self, delta: SnapshotDelta) {
        self.state.apply(delta.state);
        self.commits.apply(delta.commits);
    }
}

/// Staged account and commitment changes of one call.
#[derive(Debug)]
pub struct Transaction<'a> {
    /// Staged accounts, configuration and counters.
    pub state: StagedState<'a>,
    /// Staged commitment registrations and consumptions.
    pub commits: StagedCommits<'a>,
}

impl Transaction<'_> {
    fn into_delta(self) -> SnapshotDelta {
        SnapshotDelta {
            state: self.state.into_delta(),
            commits: self.commits.into_delta(),
        }
    }
}

#[derive(Debug)]
struct SnapshotDelta {
    state: StateDelta,
    commits: CommitDelta,
}

#[derive(Debug, Default)]
struct Committed {
    snapshot: Arc<Snapshot>,
    log: EventLog,
}

#[derive(Debug)]
struct Writer<B> {
    payouts: B,
    hooks: HookChain,
}

/// The TinyPay ledger.
///
/// Every mutator takes the calling account explicitly; authenticating that
/// the caller is who it claims to be is the host's job.
#[derive(Debug)]
pub struct TinyPay<B = NativeBank> {
    writer: Mutex<Writer<B>>,
    committed: RwLock<Committed>,
}

impl Default for TinyPay<NativeBank> {
    fn default() -> Self {
        Self::new(NativeBank::new())
    }
}

impl<B: Payouts> TinyPay<B> {
    /// Creates an empty, uninitialized ledger that pays out through `payouts`.
    pub fn new(payouts: B) -> Self {
        Self {
            writer: Mutex::new(Writer {
                payouts,
                hooks: HookChain::default(),
            }),
            committed: RwLock::new(Committed::default()),
        }
    }

    /// Creates a ledger and initializes it from `config`.
    ///
    /// # Errors
    ///
    /// Propagates any [`init_system`](Self::init_system) error.
    pub fn from_config(
        deployer: Account,
        config: &LedgerConfig,
        payouts: B,
    ) -> Result<Self, LedgerError> {
        let ledger = Self::new(payouts);
        ledger.init_system(deployer, config.privileged, u32::from(config.fee_rate))?;
        Ok(ledger)
    }

    /// Registers a payment lifecycle hook. Hooks execute in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: impl PaymentHooks + 'static) -> Self {
        self.add_hook(hook);
        self
    }

    /// Adds a hook after construction.
    pub fn add_hook(&mut self, hook: impl PaymentHooks + 'static) {
        self.writer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .hooks
            .push(hook);
    }

    /// Sets the privileged account and fee rate. Succeeds exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidFeeRate`] for rates above 10 000 bps and
    /// [`LedgerError::AlreadyInitialized`] on any later call.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            skip_all,
            err,
            fields(caller = %caller, privileged = %privileged, fee_rate_bps)
        )
    )]
    pub fn init_system(
        &self,
        caller: Account,
        privileged: Account,
        fee_rate_bps: u32,
    ) -> Result<(), LedgerError> {
        let fee_rate = FeeRate::from_bps(fee_rate_bps)?;
        self.transact(caller, |txn| {
            txn.state.init_system(privileged, fee_rate)?;
            Ok(((), Some(EventKind::SystemInitialized { privileged, fee_rate })))
        })
    }

    /// Credits `value` to the caller and stores `anchor` as its anchor.
    ///
    /// `value` is the native value the host received with the call.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`] for a zero deposit, or
    /// [`LedgerError::Overflow`].
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(caller = %caller, value = %value))
    )]
    pub fn deposit(
        &self,
        caller: Account,
        value: Amount,
        anchor: Digest,
    ) -> Result<(), LedgerError> {
        self.transact(caller, |txn| {
            txn.state.deposit(caller, value, anchor)?;
            Ok((
                (),
                Some(EventKind::Deposit {
                    account: caller,
                    value,
                    anchor,
                }),
            ))
        })
    }

    /// Replaces the caller's anchor without moving value.
    ///
    /// # Errors
    ///
    /// Currently infallible.
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(caller = %caller))
    )]
    pub fn refresh_anchor(&self, caller: Account, new_anchor: Digest) -> Result<(), LedgerError> {
        self.transact(caller, |txn| {
            txn.state.set_anchor(caller, new_anchor);
            Ok((
                (),
                Some(EventKind::AnchorRefreshed {
                    account: caller,
                    new_anchor,
                }),
            ))
        })
    }

    /// Registers `commit_hash` as a pending merchant commitment.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateCommit`] if the digest was already
    /// registered.
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(caller = %caller, commit_hash = %commit_hash))
    )]
    pub fn merchant_precommit(
        &self,
        caller: Account,
        commit_hash: Digest,
    ) -> Result<(), LedgerError> {
        self.transact(caller, |txn| {
            txn.commits.register(caller, commit_hash)?;
            Ok((
                (),
                Some(EventKind::PreCommitMade {
                    account: caller,
                    commit_hash,
                }),
            ))
        })
    }

    /// Sets the caller's per-payment limit. Zero removes the limit.
    ///
    /// Emits no event.
    ///
    /// # Errors
    ///
    /// Currently infallible.
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(caller = %caller, limit = %limit))
    )]
    pub fn set_payment_limit(&self, caller: Account, limit: Amount) -> Result<(), LedgerError> {
        self.transact(caller, |txn| {
            txn.state.set_payment_limit(caller, limit);
            Ok(((), None))
        })
    }

    /// Authenticates, verifies the commitment and settles a payment.
    ///
    /// # Errors
    ///
    /// Returns the first failing check (see [`PaymentEngine::execute`]),
    /// [`LedgerError::TransferFailed`] if the host payouts fail, or
    /// [`LedgerError::Aborted`] if a hook rejected the call.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            skip_all,
            err,
            fields(caller = %caller, payer = %request.payer, amount = %request.amount)
        )
    )]
    pub fn complete_payment(
        &self,
        caller: Account,
        request: PaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError> {
        let mut writer = lock(&self.writer);
        let Writer { payouts, hooks } = &mut *writer;
        let ctx = PaymentHookContext {
            caller,
            request: &request,
        };
        hooks.before(&ctx)?;

        let base = self.snapshot();
        let mut txn = base.begin();
        let result = PaymentEngine::new(&mut txn.state, &mut txn.commits)
            .execute(caller, &request)
            .and_then(|plan| {
                payouts.settle(plan.payouts())?;
                Ok(plan)
            });

        match result {
            Ok(plan) => {
                let delta = txn.into_delta();
                drop(base);
                self.publish(delta, caller, Some(plan.event()));
                #[cfg(feature = "telemetry")]
                tracing::event!(Level::INFO,
                    status = "ok",
                    payer = %plan.receipt().payer,
                    recipient = %plan.receipt().recipient,
                    fee = %plan.receipt().fee,
                    mode = ?plan.receipt().mode,
                    "payment completed"
                );
                let receipt = plan.into_receipt();
                hooks.after(&ctx, &receipt);
                Ok(receipt)
            }
            Err(error) => {
                #[cfg(feature = "telemetry")]
                tracing::event!(
                    Level::WARN,
                    status = "failed",
                    reason = %error.reason(),
                    "payment rejected"
                );
                hooks.failure(&ctx, &error);
                Err(error)
            }
        }
    }

    /// Runs every payment check against the current state without
    /// committing anything or emitting events.
    ///
    /// Host payouts are not attempted, so a payment that verifies can still
    /// fail with [`LedgerError::TransferFailed`] on completion.
    ///
    /// # Errors
    ///
    /// Returns the error `complete_payment` would fail its checks with.
    pub fn verify_payment(
        &self,
        caller: Account,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, LedgerError> {
        let base = self.snapshot();
        let mut txn = base.begin();
        PaymentEngine::new(&mut txn.state, &mut txn.commits)
            .execute(caller, request)
            .map(SettlementPlan::into_receipt)
    }

    fn transact<T, F>(&self, caller: Account, op: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<(T, Option<EventKind>), LedgerError>,
    {
        let _writer = lock(&self.writer);
        let base = self.snapshot();
        let mut txn = base.begin();
        let (output, event) = op(&mut txn)?;
        let delta = txn.into_delta();
        drop(base);
        self.publish(delta, caller, event);
        Ok(output)
    }

    /// Applies `delta` and records `event` under one write lock.
    ///
    /// The caller must not hold a clone of the committed snapshot, or the
    /// snapshot is copied before the delta is applied.
    fn publish(&self, delta: SnapshotDelta, emitter: Account, event: Option<EventKind>) {
        let mut committed = self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut committed.snapshot).apply(delta);
        if let Some(kind) = event {
            #[cfg(feature = "telemetry")]
            {
                let sequence = committed.log.append(emitter, kind);
                tracing::event!(Level::DEBUG, sequence, emitter = %emitter, "event recorded");
            }
            #[cfg(not(feature = "telemetry"))]
            committed.log.append(emitter, kind);
        }
    }
}

impl<B> TinyPay<B> {
    fn read(&self) -> RwLockReadGuard<'_, Committed> {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the latest committed snapshot.
    ///
    /// The snapshot stays unchanged while held. Holding it across writes
    /// makes each of those writes copy the ledger once.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.read().snapshot)
    }

    /// Returns the ledger balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: &Account) -> Amount {
        self.read().snapshot.state.balance_of(account)
    }

    /// Returns the current anchor of `account`, zero if unknown.
    #[must_use]
    pub fn anchor_of(&self, account: &Account) -> Digest {
        self.read().snapshot.state.anchor_of(account)
    }

    /// Returns the payment limit of `account`, zero if none.
    #[must_use]
    pub fn payment_limit_of(&self, account: &Account) -> Amount {
        self.read().snapshot.state.payment_limit_of(account)
    }

    /// Returns cumulative deposited, cumulative paid and the fee rate.
    #[must_use]
    pub fn system_stats(&self) -> SystemStats {
        self.read().snapshot.state.stats()
    }

    /// Returns the system configuration.
    #[must_use]
    pub fn system_config(&self) -> SystemConfig {
        *self.read().snapshot.state.config()
    }

    /// Returns the status of a commitment digest.
    #[must_use]
    pub fn commitment_status(&self, commit_hash: &Digest) -> Option<CommitStatus> {
        self.read().snapshot.commits.status(commit_hash)
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.read().log.entries().to_vec()
    }

    /// Returns a copy of the events with sequence number `sequence` or later.
    #[must_use]
    pub fn events_since(&self, sequence: u64) -> Vec<LedgerEvent> {
        self.read().log.events_since(sequence).to_vec()
    }

    /// Runs `f` with exclusive access to the host payouts, e.g. to inspect
    /// native wallet balances.
    pub fn with_payouts<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut lock(&self.writer).payouts)
    }
}

/// Locks a writer mutex, recovering from poisoning.
///
/// Committed state only changes inside `publish`, after every check and
/// payout has succeeded, so a poisoned writer never guards a half-run call.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
