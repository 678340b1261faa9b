//! 256-bit unsigned integer arithmetic.
//!
//! Wraps `ruint` to provide a stable interface. This adapter module exists
//! so we can swap the underlying library or implement our own arithmetic
//! without changing callers.

use ruint::aliases::{U256 as Ruint256, U512 as Ruint512};

/// A 256-bit unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct U256(Ruint256);

impl U256 {
    /// Zero constant.
    pub const ZERO: Self = Self(Ruint256::ZERO);

    /// Maximum value (2^256 - 1).
    pub const MAX: Self = Self(Ruint256::MAX);

    /// Create from big-endian bytes.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(Ruint256::from_be_bytes(bytes))
    }

    /// Create from little-endian bytes.
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(Ruint256::from_le_bytes(bytes))
    }

    /// Convert to little-endian bytes.
    pub fn to_le_bytes(self) -> [u8; 32] {
        self.0.to_le_bytes()
    }

    /// Compute `self * mul / div` with a 512-bit intermediate, so the
    /// product cannot overflow. A quotient that does not fit in 256 bits
    /// saturates to [`U256::MAX`].
    ///
    /// `div` must be non-zero.
    pub fn mul_div(self, mul: u64, div: u128) -> Self {
        debug_assert!(div != 0, "mul_div divisor must be non-zero");

        let mut wide_bytes = [0u8; 64];
        wide_bytes[..32].copy_from_slice(&self.to_le_bytes());
        let wide = Ruint512::from_le_bytes(wide_bytes);

        let quotient = wide * Ruint512::from(mul) / Ruint512::from(div);

        let bytes = quotient.to_le_bytes::<64>();
        if bytes[32..].iter().any(|&b| b != 0) {
            return Self::MAX;
        }
        let mut narrow = [0u8; 32];
        narrow.copy_from_slice(&bytes[..32]);
        Self::from_le_bytes(narrow)
    }
}
