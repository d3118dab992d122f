//! Hash-chain authentication.
//!
//! An account's anchor is normally `sha256(secret)` for a secret only the
//! account holder knows. Revealing the secret authorizes one payment, after
//! which the revealed secret itself becomes the anchor. Because nobody holds
//! a preimage of an already-public value, the chain is exhausted until the
//! holder refreshes the anchor (or pre-linked it so that the revealed secret
//! was itself a digest of a further secret).

use tinypay_proto::{Account, Digest, anchor_for};

use crate::error::LedgerError;
use crate::state::StagedState;

/// Proof that a secret unlocked a payer's anchor.
///
/// Can only be obtained through [`AuthenticationChain::authenticate`] and is
/// consumed by [`AuthenticationChain::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated {
    payer: Account,
    secret: Digest,
}

impl Authenticated {
    /// The authenticated payer.
    #[must_use]
    pub const fn payer(&self) -> Account {
        self.payer
    }
}

/// Validates revealed secrets against stored anchors.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationChain;

impl AuthenticationChain {
    /// Checks that `sha256(secret)` equals the anchor stored for `payer`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AuthMismatch`] if the digest differs.
    pub fn authenticate(
        state: &StagedState<'_>,
        payer: Account,
        secret: Digest,
    ) -> Result<Authenticated, LedgerError> {
        if anchor_for(&secret) != state.anchor_of(&payer) {
            return Err(LedgerError::AuthMismatch { payer });
        }
        Ok(Authenticated { payer, secret })
    }

    /// Moves the payer's anchor to the revealed secret.
    pub fn advance(state: &mut StagedState<'_>, proof: Authenticated) {
        state.set_anchor(proof.payer, proof.secret);
    }
}
