//! Wire format types for the TinyPay payment ledger.
//!
//! This crate defines the serialization-level data structures shared by the
//! ledger core and anything that observes it: account and digest aliases,
//! the event records the ledger emits, aggregate statistics, fee-rate
//! arithmetic, and the machine-readable error reason codes.
//!
//! It also owns the two digest constructions every participant must agree
//! on: the anchor digest of a secret and the merchant commitment digest.
//!
//! # Modules
//!
//! - [`encoding`] - SHA-256 anchor and commitment digest construction
//! - [`events`] - Append-only ledger event records
//! - [`fee`] - Basis-point fee rate and the fee split
//! - [`error`] - Machine-readable failure codes
//! - [`responses`] - Read-side views (`SystemStats`, `PaymentReceipt`)

pub mod encoding;
pub mod error;
pub mod events;
pub mod fee;
pub mod responses;

pub use alloy_primitives::{Address, B256, U256};
pub use encoding::{anchor_for, commitment_digest, digest_of};
pub use error::{AsLedgerProblem, ErrorReason, LedgerProblem};
pub use events::{EventKind, LedgerEvent};
pub use fee::{FeeRate, FeeRateError};
pub use responses::{CommitmentMode, PaymentReceipt, SystemStats};

/// A 32-byte SHA-256 digest: anchors, secrets and commitment hashes.
pub type Digest = B256;

/// An opaque 20-byte account identifier.
pub type Account = Address;

/// An amount in the ledger's single native value unit.
pub type Amount = U256;

/// The all-zero commitment digest that selects the privileged bypass.
pub const ZERO_DIGEST: Digest = B256::ZERO;
