//! Source messages and their place on the value axis
//!
//! A bit string `b1..bL` names the dyadic cell `[m / 2^L, (m + 1) / 2^L)`
//! where `m` is the string read as a binary number; the value transmitted
//! is the cell midpoint. Value messages are sent as they are and read back
//! to a fixed number of bits.

use std::fmt;

use bitvec::prelude::*;

use crate::numeric::Real;
use crate::SchemeError;

/// Decoded length used for value messages unless configured otherwise.
pub const DEFAULT_VALUE_BITS: usize = 60;

/// Longest bit string whose dyadic cell is still wider than the default
/// boundary tolerance (2^-56 > 1e-18).
pub const MAX_MESSAGE_BITS: usize = 56;

/// Longest binary expansion a value message can be read back to.
pub const MAX_VALUE_BITS: usize = 128;

/// What the sender wants the receiver to learn.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A binary sequence; its length fixes the decoding precision.
    Bits(BitVec),
    /// A point in [0, 1).
    Value(Real),
}

impl Message {
    /// Parse a string of `0` and `1` characters.
    pub fn parse_bits(text: &str) -> Result<Self, SchemeError> {
        let bits = text
            .trim()
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(SchemeError::InvalidMessage(format!(
                    "'{other}' is not a binary digit"
                ))),
            })
            .collect::<Result<BitVec, _>>()?;
        Self::from_bits(bits)
    }

    /// Wrap an explicit bit vector.
    pub fn from_bits(bits: BitVec) -> Result<Self, SchemeError> {
        if bits.is_empty() {
            return Err(SchemeError::InvalidMessage(
                "bit string is empty".to_string(),
            ));
        }
        if bits.len() > MAX_MESSAGE_BITS {
            return Err(SchemeError::InvalidMessage(format!(
                "{} bits exceed the {MAX_MESSAGE_BITS}-bit limit",
                bits.len()
            )));
        }
        Ok(Message::Bits(bits))
    }

    /// A value message from a float in [0, 1).
    pub fn from_value(value: f64) -> Result<Self, SchemeError> {
        let real =
            Real::try_from(value).map_err(|err| SchemeError::InvalidMessage(err.to_string()))?;
        Self::from_real(real)
    }

    /// A value message from an extended-precision value in [0, 1).
    pub fn from_real(value: Real) -> Result<Self, SchemeError> {
        if value.is_negative() || value >= Real::one() {
            return Err(SchemeError::InvalidMessage(format!(
                "value {value} outside [0, 1)"
            )));
        }
        Ok(Message::Value(value))
    }

    /// Point on the value axis the sender steers towards.
    pub fn target(&self) -> Real {
        match self {
            Message::Bits(bits) => {
                let (lower, upper) = dyadic_cell(bits);
                (lower + upper) * Real::half()
            }
            Message::Value(value) => value.clone(),
        }
    }

    /// Length of a bit-string message, `None` for values.
    pub fn bit_len(&self) -> Option<usize> {
        match self {
            Message::Bits(bits) => Some(bits.len()),
            Message::Value(_) => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Bits(bits) => f.write_str(&bit_string(bits)),
            Message::Value(value) => write!(f, "{value}"),
        }
    }
}

/// First `count` bits of the binary expansion of `x` in [0, 1).
pub fn leading_bits(x: &Real, count: usize) -> BitVec {
    let one = Real::one();
    let mut rest = x.clone();
    let mut bits = BitVec::with_capacity(count);
    for _ in 0..count {
        rest = &rest + &rest;
        let bit = rest >= one;
        if bit {
            rest -= &one;
        }
        bits.push(bit);
    }
    bits
}

/// `[lower, upper)` of the dyadic cell named by `bits`.
pub fn dyadic_cell(bits: &BitSlice) -> (Real, Real) {
    let mut lower = Real::zero();
    let mut weight = Real::one();
    for bit in bits.iter().by_vals() {
        weight = &weight * &Real::half();
        if bit {
            lower += &weight;
        }
    }
    let upper = &lower + &weight;
    (lower, upper)
}

/// `"1001"`-style rendering.
pub fn bit_string(bits: &BitSlice) -> String {
    bits.iter()
        .by_vals()
        .map(|bit| if bit { '1' } else { '0' })
        .collect()
}

/// Most-significant-first binary form of `index` on `width` bits.
pub(crate) fn index_to_bits(index: u64, width: usize) -> BitVec {
    (0..width).rev().map(|i| (index >> i) & 1 == 1).collect()
}

/// Inverse of [`index_to_bits`].
pub(crate) fn bits_to_index(bits: &BitSlice) -> u64 {
    bits.iter()
        .by_vals()
        .fold(0, |acc, bit| (acc << 1) | u64::from(bit))
}
