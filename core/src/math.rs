use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::{Address, U256};

/// Uniswap V3 tick bounds.
pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount '{0}': {1}")]
    Invalid(String, String),
    #[error("negative amount '{0}'")]
    Negative(String),
}

/// 10^decimals as a U256.
#[inline]
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// One whole token in raw units.
#[inline]
pub fn one_unit(decimals: u8) -> U256 {
    pow10(decimals)
}

/// Converts a millionths-denominated amount into raw token units.
/// `from_micro_units(5_000, 18)` is 0.005 of an 18-decimals token.
pub fn from_micro_units(micros: u64, decimals: u8) -> U256 {
    if decimals >= 6 {
        U256::from(micros) * pow10(decimals - 6)
    } else {
        U256::from(micros) / pow10(6 - decimals)
    }
}

/// Parses a human decimal string ("0.02", "15") into raw units.
pub fn parse_amount(value: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = value.trim();
    if trimmed.starts_with('-') {
        return Err(AmountError::Negative(trimmed.to_string()));
    }
    parse_units(trimmed, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| AmountError::Invalid(trimmed.to_string(), e.to_string()))
}

/// Renders raw units as a human decimal string.
pub fn format_amount(raw: U256, decimals: u8) -> String {
    format_units(raw, decimals).unwrap_or_else(|_| raw.to_string())
}

/// `amount * pct / 100`, floored. Split as `q * pct + r * pct / 100` with
/// `amount = 100q + r` so large amounts never wrap; results above
/// `U256::MAX` saturate.
#[inline]
pub fn percent_of(amount: U256, pct: u64) -> U256 {
    let hundred = U256::from(100u64);
    let pct = U256::from(pct);
    let (q, r) = (amount / hundred, amount % hundred);
    q.saturating_mul(pct).saturating_add(r * pct / hundred)
}

/// Converts raw units to a float of whole tokens. Lossy; only used for
/// estimate-grade sizing.
pub fn to_float_units(raw: U256, decimals: u8) -> f64 {
    let whole = raw / pow10(decimals);
    let frac = raw % pow10(decimals);
    let whole_f: f64 = whole.to_string().parse().unwrap_or(f64::MAX);
    let frac_f: f64 = frac.to_string().parse().unwrap_or(0.0);
    whole_f + frac_f / 10f64.powi(decimals as i32)
}

/// Converts whole-token floats back to raw units, flooring. Negative or
/// non-finite input yields zero.
pub fn from_float_units(value: f64, decimals: u8) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    let rendered = format!("{:.*}", decimals as usize, value);
    parse_amount(&rendered, decimals).unwrap_or(U256::ZERO)
}

/// Full-range tick pair for a fee tier, rounded inward to `tick_spacing` so
/// both bounds stay inside [MIN_TICK, MAX_TICK].
pub fn full_range_ticks(fee: u32, tick_spacing: i32) -> (i32, i32) {
    let (lower, upper): (i32, i32) = match fee {
        100 | 500 => (-887_270, 887_270),
        3000 => (-887_220, 887_220),
        10000 => (-887_200, 887_200),
        _ => (-887_270, 887_270),
    };
    let spacing = tick_spacing.max(1);
    let lower = -((-lower).div_euclid(spacing) * spacing);
    let upper = upper.div_euclid(spacing) * spacing;
    (lower, upper)
}

/// A token pair in the order the position manager expects: lower address first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalPair {
    pub token0: Address,
    pub token1: Address,
    pub amount0: U256,
    pub amount1: U256,
    /// True when the inputs had to be swapped.
    pub flipped: bool,
}

pub fn canonical_pair(a: (Address, U256), b: (Address, U256)) -> CanonicalPair {
    if a.0 <= b.0 {
        CanonicalPair { token0: a.0, token1: b.0, amount0: a.1, amount1: b.1, flipped: false }
    } else {
        CanonicalPair { token0: b.0, token1: a.0, amount0: b.1, amount1: a.1, flipped: true }
    }
}
