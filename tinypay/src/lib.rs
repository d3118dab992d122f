#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core state machine for the TinyPay payment ledger.
//!
//! TinyPay is a custodial micropayment ledger. Payers deposit value and
//! register an anchor, the digest of a secret from a hash chain. Each payment
//! reveals the secret that hashes to the current anchor and advances the
//! anchor to it. Merchants bind a payment's parameters ahead of time with a
//! commit-reveal precommitment; a privileged account may settle without one.
//! A basis-point fee is withheld from every payment and paid to the
//! privileged account.
//!
//! # Modules
//!
//! - [`auth`] - Hash-chain authentication and anchor rotation
//! - [`commit`] - Merchant commitment registry
//! - [`config`] - TOML configuration for system initialization
//! - [`engine`] - The payment completion state machine
//! - [`error`] - Ledger error taxonomy
//! - [`events`] - Append-only event log
//! - [`hooks`] - Lifecycle hooks around payment completion
//! - [`ledger`] - The shared [`TinyPay`] handle
//! - [`payout`] - Native value transfers to the host
//! - [`state`] - Balances, anchors, limits and counters
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod auth;
pub mod commit;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod hooks;
pub mod ledger;
pub mod payout;
pub mod state;

pub use tinypay_proto as proto;

pub use commit::CommitStatus;
pub use config::{ConfigError, LedgerConfig};
pub use engine::PaymentRequest;
pub use error::LedgerError;
pub use hooks::{HookDecision, PaymentHookContext, PaymentHooks};
pub use ledger::{Snapshot, TinyPay, Transaction};
pub use payout::{NativeBank, Payout, PayoutError, Payouts};
