//! Basis-point fee rates.

use serde::{Deserialize, Serialize};

use crate::Amount;

/// A fee rate in basis points, bounded to `0..=10_000`.
///
/// Serialized as a plain integer. Deserialization rejects rates above
/// [`FeeRate::MAX_BPS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FeeRate(u16);

/// The requested fee rate exceeds 100% (10 000 bps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("fee rate {0} bps exceeds the 10000 bps maximum")]
pub struct FeeRateError(pub u32);

impl FeeRate {
    /// Denominator of a basis-point fraction.
    pub const MAX_BPS: u16 = 10_000;

    /// A zero fee rate.
    pub const ZERO: Self = Self(0);

    /// Creates a fee rate from basis points.
    ///
    /// # Errors
    ///
    /// Returns [`FeeRateError`] if `bps` is greater than [`FeeRate::MAX_BPS`].
    pub const fn from_bps(bps: u32) -> Result<Self, FeeRateError> {
        if bps > Self::MAX_BPS as u32 {
            return Err(FeeRateError(bps));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(bps as u16))
    }

    /// Returns the rate in basis points.
    #[must_use]
    pub const fn bps(self) -> u16 {
        self.0
    }

    /// Computes `floor(amount * bps / 10_000)` without intermediate overflow.
    ///
    /// The amount is split as `q * 10_000 + r`, which keeps every product
    /// bounded by `amount` itself.
    #[must_use]
    pub fn fee_for(self, amount: Amount) -> Amount {
        let denominator = Amount::from(Self::MAX_BPS);
        let rate = Amount::from(self.0);
        let quotient = amount / denominator;
        let remainder = amount % denominator;
        quotient * rate + remainder * rate / denominator
    }

    /// Splits `amount` into `(net, fee)` where `net + fee == amount`.
    #[must_use]
    pub fn split(self, amount: Amount) -> (Amount, Amount) {
        let fee = self.fee_for(amount);
        (amount - fee, fee)
    }
}

impl TryFrom<u32> for FeeRate {
    type Error = FeeRateError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_bps(bps)
    }
}

impl From<FeeRate> for u32 {
    fn from(rate: FeeRate) -> Self {
        Self::from(rate.0)
    }
}

impl std::fmt::Display for FeeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bps", self.0)
    }
}
