//! Conversions from text and from floating point.
//!
//! The accepted text forms are an integer (`3`), a fraction (`3/4`), a decimal
//! (`1.5`), a decimal with exponent (`1.5e-3`) and the special values `inf`
//! and `nan`, all case-insensitive with an optional leading sign.
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{One, Zero};

use super::Rational;

/// How floating point input is converted to an exact value.
///
/// Floats carry binary rounding noise, so the conversion has to be a policy
/// decision rather than a `From` impl.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum FloatPolicy {
    /// Refuse all floating point input.
    #[default]
    Disallow,
    /// Accept only floats with a zero fractional part.
    IfIntegral,
    /// Convert the binary value exactly; `0.1` becomes `3602879701896397/2^55`.
    Exact,
    /// Round to 15 significant decimal digits first, recovering the decimal a
    /// human most likely wrote.
    Round,
}

/// Number of decimal digits [`FloatPolicy::Round`] keeps.
const ROUND_DIGITS: u32 = 15;

/// A floating point value that could not be converted under the given policy.
#[derive(Debug, Clone, PartialEq)]
pub enum FromFloatError {
    /// The policy was [`FloatPolicy::Disallow`].
    Disallowed(f64),
    /// The policy was [`FloatPolicy::IfIntegral`] and the value had a
    /// fractional part or was not finite.
    NonIntegral(f64),
}

impl fmt::Display for FromFloatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Disallowed(value) => {
                write!(f, "floating point input is disallowed: {value}")
            }
            Self::NonIntegral(value) => {
                write!(f, "floating point input is not an integer: {value}")
            }
        }
    }
}

impl Error for FromFloatError {}

/// A string that is not a recognized rational literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRationalError {
    input: String,
}

impl ParseRationalError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }
}

impl fmt::Display for ParseRationalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid rational literal: {:?}", self.input)
    }
}

impl Error for ParseRationalError {}

impl Rational {
    /// Convert a float under an explicit [`FloatPolicy`].
    ///
    /// Under [`FloatPolicy::Exact`] and [`FloatPolicy::Round`] the float
    /// specials map to the corresponding rational specials.
    pub fn from_f64(value: f64, policy: FloatPolicy) -> Result<Self, FromFloatError> {
        match policy {
            FloatPolicy::Disallow => Err(FromFloatError::Disallowed(value)),
            FloatPolicy::IfIntegral => {
                if value.is_finite() && value.fract() == 0.0 {
                    Ok(exact(value))
                } else {
                    Err(FromFloatError::NonIntegral(value))
                }
            }
            FloatPolicy::Exact => Ok(special(value).unwrap_or_else(|| exact(value))),
            FloatPolicy::Round => Ok(special(value).unwrap_or_else(|| rounded(value))),
        }
    }
}

fn special(value: f64) -> Option<Rational> {
    if value.is_nan() {
        Some(Rational::nan())
    } else if value == f64::INFINITY {
        Some(Rational::infinity())
    } else if value == f64::NEG_INFINITY {
        Some(Rational::neg_infinity())
    } else {
        None
    }
}

/// The exact binary value of a finite float.
fn exact(value: f64) -> Rational {
    let (mantissa, exponent, sign) = num_traits::float::FloatCore::integer_decode(value);
    let num = BigInt::from(mantissa) * BigInt::from(sign);
    if exponent >= 0 {
        Rational::from_integer(num << exponent as usize)
    } else {
        Rational::from_parts(num, BigInt::one() << (-exponent) as usize)
    }
}

fn rounded(value: f64) -> Rational {
    let scaled = (value * 10f64.powi(ROUND_DIGITS as i32)).round_ties_even();
    if !scaled.is_finite() {
        // scaling overflowed; the input had no fractional digits to recover
        return exact(value);
    }
    let den = BigInt::from(10u32).pow(ROUND_DIGITS);
    exact(scaled).div_by(&Rational::from_integer(den))
}

impl FromStr for Rational {
    type Err = ParseRationalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let value = parse_body(body).ok_or_else(|| ParseRationalError::new(s))?;
        Ok(if negative { -value } else { value })
    }
}

fn parse_body(body: &str) -> Option<Rational> {
    if body.eq_ignore_ascii_case("inf") || body.eq_ignore_ascii_case("infinity") {
        return Some(Rational::infinity());
    }
    if body.eq_ignore_ascii_case("nan") {
        return Some(Rational::nan());
    }
    if let Some((num, den)) = body.split_once('/') {
        let num = parse_digits(num)?;
        let den = parse_digits(den)?;
        if den.is_zero() {
            return None;
        }
        return Some(Rational::from_parts(num, den));
    }
    let (mantissa, exponent) = match body.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (body, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut num = if int_part.is_empty() {
        BigInt::zero()
    } else {
        parse_digits(int_part)?
    };
    let mut den = BigInt::one();
    if !frac_part.is_empty() {
        num = num * BigInt::from(10u32).pow(frac_part.len() as u32) + parse_digits(frac_part)?;
        den = BigInt::from(10u32).pow(frac_part.len() as u32);
    }
    if let Some(exponent) = exponent {
        let exponent: i32 = exponent.parse().ok()?;
        if exponent >= 0 {
            num *= BigInt::from(10u32).pow(exponent as u32);
        } else {
            den *= BigInt::from(10u32).pow(exponent.unsigned_abs());
        }
    }
    Some(Rational::from_parts(num, den))
}

/// Parse a run of ASCII digits; rejects signs, whitespace and underscores.
fn parse_digits(s: &str) -> Option<BigInt> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
