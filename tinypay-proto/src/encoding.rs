//! Digest construction for anchors and merchant commitments.
//!
//! Both digests are SHA-256. The commitment preimage is the ABI parameter
//! encoding of `(address payer, address recipient, uint256 amount, bytes32 secret)`,
//! so four 32-byte words with the addresses left-padded. Commitments built by
//! off-ledger merchants with any ABI encoder hash to the same value.

use alloy_sol_types::SolValue;
use sha2::{Digest as _, Sha256};

use crate::{Account, Amount, Digest};

/// Hashes arbitrary bytes with SHA-256.
#[must_use]
pub fn digest_of(preimage: &[u8]) -> Digest {
    Digest::from_slice(&Sha256::digest(preimage))
}

/// Returns the anchor a secret unlocks: `sha256(secret)`.
#[must_use]
pub fn anchor_for(secret: &Digest) -> Digest {
    digest_of(secret.as_slice())
}

/// ABI-encodes the commitment preimage.
#[must_use]
pub fn commitment_preimage(
    payer: Account,
    recipient: Account,
    amount: Amount,
    secret: Digest,
) -> Vec<u8> {
    (payer, recipient, amount, secret).abi_encode_params()
}

/// Computes the commitment digest a merchant precommits for a payment.
#[must_use]
pub fn commitment_digest(
    payer: Account,
    recipient: Account,
    amount: Amount,
    secret: Digest,
) -> Digest {
    digest_of(&commitment_preimage(payer, recipient, amount, secret))
}
