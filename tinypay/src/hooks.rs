//! Lifecycle hooks for payment completion.
//!
//! Hooks let a host intercept `complete_payment` at three points:
//!
//! - **Before**: Inspect the request and optionally abort it
//! - **After**: Observe the receipt of a committed payment
//! - **On Failure**: Observe the error of a rejected payment
//!
//! Hooks run while the ledger's writer lock is held, in registration order.
//! They see calls, not state, and cannot mutate the ledger.

use std::fmt::{self, Debug};

use tinypay_proto::{Account, PaymentReceipt};

use crate::engine::PaymentRequest;
use crate::error::LedgerError;

/// Decision returned by [`PaymentHooks::before_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Allow the payment to proceed.
    Continue,
    /// Reject the payment before any check runs.
    Abort {
        /// Machine-readable reason (e.g., `"merchant_blocked"`).
        reason: String,
        /// Human-readable message.
        message: String,
    },
}

/// Context passed to every payment hook.
#[derive(Debug, Clone, Copy)]
pub struct PaymentHookContext<'a> {
    /// The account submitting the call.
    pub caller: Account,
    /// The call arguments.
    pub request: &'a PaymentRequest,
}

/// Lifecycle hooks for `complete_payment`.
///
/// All methods default to no-ops; implement only what you need.
pub trait PaymentHooks: Send + Sync {
    /// Called before the payment is executed.
    ///
    /// The first hook to return [`HookDecision::Abort`] wins; the payment
    /// fails with [`LedgerError::Aborted`] and later hooks are skipped.
    fn before_payment(&self, _ctx: &PaymentHookContext<'_>) -> HookDecision {
        HookDecision::Continue
    }

    /// Called after the payment has been committed.
    fn after_payment(&self, _ctx: &PaymentHookContext<'_>, _receipt: &PaymentReceipt) {}

    /// Called when the payment failed and nothing was committed.
    ///
    /// Not called for aborts raised by `before_payment`.
    fn on_payment_failure(&self, _ctx: &PaymentHookContext<'_>, _error: &LedgerError) {}
}

/// An ordered list of registered hooks.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn PaymentHooks>>,
}

impl Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("hooks", &format!("[{} hooks]", self.hooks.len()))
            .finish()
    }
}

impl HookChain {
    /// Appends a hook.
    pub fn push(&mut self, hook: impl PaymentHooks + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Returns the number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs every `before_payment` hook until one aborts.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Aborted`] carrying the first abort.
    pub fn before(&self, ctx: &PaymentHookContext<'_>) -> Result<(), LedgerError> {
        for hook in &self.hooks {
            if let HookDecision::Abort { reason, message } = hook.before_payment(ctx) {
                return Err(LedgerError::Aborted { reason, message });
            }
        }
        Ok(())
    }

    /// Runs every `after_payment` hook.
    pub fn after(&self, ctx: &PaymentHookContext<'_>, receipt: &PaymentReceipt) {
        for hook in &self.hooks {
            hook.after_payment(ctx, receipt);
        }
    }

    /// Runs every `on_payment_failure` hook.
    pub fn failure(&self, ctx: &PaymentHookContext<'_>, error: &LedgerError) {
        for hook in &self.hooks {
            hook.on_payment_failure(ctx, error);
        }
    }
}
