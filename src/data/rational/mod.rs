//! # Exact rational numbers
//!
//! The number type everything else is built on. A `Rational` is a reduced
//! numerator/denominator pair of arbitrary-precision integers, extended with a
//! signed infinity and a single NaN value. All arithmetic is exact; there is no
//! floating point anywhere in a solve, so ratios reproduce bit for bit.
//!
//! Division is deliberately not an operator. Use the [`div`] free function,
//! which takes an explicit [`NumericPolicy`] deciding what division by zero
//! means, or fails with an [`ArithmeticError`].
use std::cmp::Ordering;
use std::error::Error;
use std::fmt;

use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

mod parse;

pub use parse::{FloatPolicy, FromFloatError, ParseRationalError};

/// An exact rational number, or one of the special values ±Infinity and NaN.
///
/// Invariants: a finite value has `den > 0` and `gcd(num, den) == 1`. The
/// specials are encoded with `den == 0`: `num == 1` is `Inf`, `num == -1` is
/// `-Inf` and `num == 0` is NaN.
///
/// Equality and hashing are structural, so `NaN == NaN`. Ordering is partial:
/// comparing NaN against anything else yields `None`, which a caller must
/// handle explicitly rather than silently resolve to a boolean.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Rational {
    num: BigInt,
    den: BigInt,
}

/// What dividing by an exact zero should produce.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ZeroDivision {
    /// Division by zero is a domain error.
    #[default]
    Error,
    /// Division by zero follows the sign of the numerator: `x/0` is `Inf` for
    /// positive `x`, `-Inf` for negative `x` and NaN for `x == 0`.
    BySign,
}

/// Ambient numeric semantics, read once and passed explicitly.
///
/// Bundles the division-by-zero policy with the switch deciding whether the
/// indeterminate forms may produce NaN or must fail with
/// [`ArithmeticError::NotANumber`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct NumericPolicy {
    /// Policy for division by the rational zero.
    pub zero_division: ZeroDivision,
    /// Whether NaN results are permitted at all.
    pub allow_nan: bool,
}

impl NumericPolicy {
    /// The default policy: division by zero and NaN production are errors.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Division by zero resolves by sign and NaN values are permitted.
    #[must_use]
    pub fn extended() -> Self {
        Self {
            zero_division: ZeroDivision::BySign,
            allow_nan: true,
        }
    }
}

/// A domain error in exact arithmetic.
///
/// These abort whatever computation produced them; they are never folded into
/// a result code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArithmeticError {
    /// Division by an exact zero under a policy that forbids it.
    DivisionByZero,
    /// An indeterminate form (`Inf - Inf`, `0 * Inf`, `Inf / Inf`) under a
    /// policy that forbids NaN.
    NotANumber,
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::NotANumber => write!(f, "result is not a number"),
        }
    }
}

impl Error for ArithmeticError {}

impl Rational {
    /// Create a rational from a numerator and denominator.
    ///
    /// # Panics
    ///
    /// If `den` is zero; the special values have their own constructors.
    #[must_use]
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "denominator must be nonzero");
        Self::normalized(BigInt::from(num), BigInt::from(den))
    }

    /// Create a rational from arbitrary-precision parts, `den != 0`.
    #[must_use]
    pub fn from_parts(num: BigInt, den: BigInt) -> Self {
        assert!(!den.is_zero(), "denominator must be nonzero");
        Self::normalized(num, den)
    }

    /// An integer value.
    #[must_use]
    pub fn from_integer<N: Into<BigInt>>(value: N) -> Self {
        Self {
            num: value.into(),
            den: BigInt::one(),
        }
    }

    /// Positive infinity.
    #[must_use]
    pub fn infinity() -> Self {
        Self {
            num: BigInt::one(),
            den: BigInt::zero(),
        }
    }

    /// Negative infinity.
    #[must_use]
    pub fn neg_infinity() -> Self {
        Self {
            num: -BigInt::one(),
            den: BigInt::zero(),
        }
    }

    /// The single NaN value.
    #[must_use]
    pub fn nan() -> Self {
        Self {
            num: BigInt::zero(),
            den: BigInt::zero(),
        }
    }

    /// Sign-normalize and reduce. `den` may be negative but not zero.
    fn normalized(num: BigInt, den: BigInt) -> Self {
        debug_assert!(!den.is_zero());
        if den.sign() == Sign::Minus {
            Self::reduced(-num, -den)
        } else {
            Self::reduced(num, den)
        }
    }

    /// Reduce to lowest terms. `den` must be strictly positive.
    fn reduced(num: BigInt, den: BigInt) -> Self {
        debug_assert!(den.sign() == Sign::Plus);
        let g = num.gcd(&den);
        if g.is_one() {
            Self { num, den }
        } else {
            Self {
                num: num / &g,
                den: den / g,
            }
        }
    }

    fn signed_infinity(sign: Sign) -> Self {
        match sign {
            Sign::Plus => Self::infinity(),
            Sign::Minus => Self::neg_infinity(),
            Sign::NoSign => Self::nan(),
        }
    }

    /// The numerator; `±1` for the infinities and `0` for NaN.
    #[must_use]
    pub fn numer(&self) -> &BigInt {
        &self.num
    }

    /// The denominator; `0` for the special values.
    #[must_use]
    pub fn denom(&self) -> &BigInt {
        &self.den
    }

    /// Whether this is neither infinite nor NaN.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        !self.den.is_zero()
    }

    /// Whether this is `Inf` or `-Inf`.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.den.is_zero() && !self.num.is_zero()
    }

    /// Whether this is the NaN value.
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.den.is_zero() && self.num.is_zero()
    }

    /// Whether the value is strictly positive. False for NaN.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.num.sign() == Sign::Plus
    }

    /// Whether the value is strictly negative. False for NaN.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.num.sign() == Sign::Minus
    }

    /// The sign as a rational: `-1`, `0` or `1`; NaN for NaN.
    #[must_use]
    pub fn signum(&self) -> Self {
        if self.is_nan() {
            return Self::nan();
        }
        Self::from_integer(match self.num.sign() {
            Sign::Plus => 1,
            Sign::Minus => -1,
            Sign::NoSign => 0,
        })
    }

    /// The absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self.clone()
        }
    }

    /// Round toward negative infinity. `None` for the special values.
    #[must_use]
    pub fn floor(&self) -> Option<BigInt> {
        self.is_finite().then(|| self.num.div_floor(&self.den))
    }

    /// Round toward positive infinity. `None` for the special values.
    #[must_use]
    pub fn ceil(&self) -> Option<BigInt> {
        self.is_finite().then(|| -(-&self.num).div_floor(&self.den))
    }

    /// Round toward zero. `None` for the special values.
    #[must_use]
    pub fn trunc(&self) -> Option<BigInt> {
        self.is_finite().then(|| &self.num / &self.den)
    }

    /// The value as a `(numerator, denominator)` pair.
    #[must_use]
    pub fn as_integer_ratio(&self) -> (&BigInt, &BigInt) {
        (&self.num, &self.den)
    }

    /// Division by a value already known to be finite and nonzero.
    ///
    /// The pivot loop and the simplifier divide by coefficients they have just
    /// tested; routing those through a policy would let a policy change alter
    /// a solve midway.
    pub(crate) fn div_by(&self, rhs: &Rational) -> Self {
        debug_assert!(rhs.is_finite() && !rhs.is_zero());
        debug_assert!(!self.is_nan());
        if self.den.is_zero() {
            return Self::signed_infinity(self.num.sign() * rhs.num.sign());
        }
        Self::normalized(&self.num * &rhs.den, &self.den * &rhs.num)
    }

    /// A decimal rendering, rounded half-to-even at `places` fractional
    /// digits with trailing zeros trimmed. For diagnostics only; the exact
    /// value is what [`fmt::Display`] prints.
    #[must_use]
    pub fn to_decimal(&self, places: u32) -> String {
        if self.den.is_zero() {
            return self.to_string();
        }
        if self.den.is_one() {
            return self.num.to_string();
        }
        let negative = self.is_negative();
        let num = self.num.magnitude().to_owned();
        let den = self.den.magnitude().to_owned();
        let scale = num_bigint::BigUint::from(10u32).pow(places);
        let (mut q, r) = (num * &scale).div_rem(&den);
        // round half to even
        let twice = &r * 2u32;
        match twice.cmp(&den) {
            Ordering::Greater => q += 1u32,
            Ordering::Equal if q.is_odd() => q += 1u32,
            _ => {}
        }
        let digits = q.to_string();
        let places = places as usize;
        let (int_part, frac_part) = if digits.len() > places {
            let (i, f) = digits.split_at(digits.len() - places);
            (i.to_string(), f.to_string())
        } else {
            ("0".to_string(), format!("{digits:0>places$}"))
        };
        let frac_part = frac_part.trim_end_matches('0');
        let sign = if negative { "-" } else { "" };
        if frac_part.is_empty() {
            format!("{sign}{int_part}")
        } else {
            format!("{sign}{int_part}.{frac_part}")
        }
    }
}

/// Divide two rationals under an explicit policy.
///
/// Equivalent to exact division for a finite, nonzero divisor. Division by
/// zero and the indeterminate forms resolve per `policy`, or fail with an
/// [`ArithmeticError`].
pub fn div(num: &Rational, den: &Rational, policy: &NumericPolicy) -> Result<Rational, ArithmeticError> {
    if num.is_nan() || den.is_nan() {
        return if policy.allow_nan {
            Ok(Rational::nan())
        } else {
            Err(ArithmeticError::NotANumber)
        };
    }
    if den.is_zero() {
        return match policy.zero_division {
            ZeroDivision::BySign => Ok(Rational::signed_infinity(num.num.sign())),
            ZeroDivision::Error if policy.allow_nan => Ok(Rational::nan()),
            ZeroDivision::Error => Err(ArithmeticError::DivisionByZero),
        };
    }
    if den.is_infinite() {
        return if num.is_infinite() {
            if policy.allow_nan {
                Ok(Rational::nan())
            } else {
                Err(ArithmeticError::NotANumber)
            }
        } else {
            Ok(Rational::zero())
        };
    }
    Ok(num.div_by(den))
}

fn add_impl(lhs: &Rational, rhs: &Rational) -> Rational {
    if lhs.is_nan() || rhs.is_nan() {
        return Rational::nan();
    }
    match (lhs.den.is_zero(), rhs.den.is_zero()) {
        (true, true) => {
            if lhs.num == rhs.num {
                lhs.clone()
            } else {
                Rational::nan()
            }
        }
        (true, false) => lhs.clone(),
        (false, true) => rhs.clone(),
        (false, false) => Rational::reduced(
            &lhs.num * &rhs.den + &rhs.num * &lhs.den,
            &lhs.den * &rhs.den,
        ),
    }
}

fn mul_impl(lhs: &Rational, rhs: &Rational) -> Rational {
    if lhs.is_nan() || rhs.is_nan() {
        return Rational::nan();
    }
    if lhs.den.is_zero() || rhs.den.is_zero() {
        // 0 * Inf is NaN, covered by the NoSign case
        return Rational::signed_infinity(lhs.num.sign() * rhs.num.sign());
    }
    Rational::reduced(&lhs.num * &rhs.num, &lhs.den * &rhs.den)
}

impl std::ops::Add for &Rational {
    type Output = Rational;

    fn add(self, rhs: Self) -> Rational {
        add_impl(self, rhs)
    }
}

impl std::ops::Sub for &Rational {
    type Output = Rational;

    fn sub(self, rhs: Self) -> Rational {
        add_impl(self, &-rhs)
    }
}

impl std::ops::Mul for &Rational {
    type Output = Rational;

    fn mul(self, rhs: Self) -> Rational {
        mul_impl(self, rhs)
    }
}

impl std::ops::Neg for &Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            num: -&self.num,
            den: self.den.clone(),
        }
    }
}

impl std::ops::Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            num: -self.num,
            den: self.den,
        }
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl std::ops::$trait<Rational> for Rational {
            type Output = Rational;

            fn $method(self, rhs: Rational) -> Rational {
                std::ops::$trait::$method(&self, &rhs)
            }
        }

        impl std::ops::$trait<&Rational> for Rational {
            type Output = Rational;

            fn $method(self, rhs: &Rational) -> Rational {
                std::ops::$trait::$method(&self, rhs)
            }
        }

        impl std::ops::$trait<Rational> for &Rational {
            type Output = Rational;

            fn $method(self, rhs: Rational) -> Rational {
                std::ops::$trait::$method(self, &rhs)
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

macro_rules! forward_assign {
    ($trait:ident, $assign_method:ident, $method:ident, $op:ident) => {
        impl std::ops::$trait<&Rational> for Rational {
            fn $assign_method(&mut self, rhs: &Rational) {
                *self = std::ops::$op::$method(&*self, rhs);
            }
        }

        impl std::ops::$trait<Rational> for Rational {
            fn $assign_method(&mut self, rhs: Rational) {
                *self = std::ops::$op::$method(&*self, &rhs);
            }
        }
    };
}

forward_assign!(AddAssign, add_assign, add, Add);
forward_assign!(SubAssign, sub_assign, sub, Sub);
forward_assign!(MulAssign, mul_assign, mul, Mul);

impl PartialOrd for Rational {
    /// `None` whenever exactly one operand is NaN; comparing NaN against a
    /// number is invalid and must be decided by the caller.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => return Some(Ordering::Equal),
            (false, false) => {}
            _ => return None,
        }
        if self.den.is_zero() && other.den.is_zero() {
            return Some(self.num.cmp(&other.num));
        }
        Some((&self.num * &other.den).cmp(&(&other.num * &self.den)))
    }
}

impl Zero for Rational {
    fn zero() -> Self {
        Self::from_integer(0)
    }

    fn is_zero(&self) -> bool {
        self.num.is_zero() && !self.den.is_zero()
    }
}

impl One for Rational {
    fn one() -> Self {
        Self::from_integer(1)
    }

    fn is_one(&self) -> bool {
        self.num.is_one() && self.den.is_one()
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::zero()
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Rational {
                fn from(value: $t) -> Self {
                    Self::from_integer(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<BigInt> for Rational {
    fn from(value: BigInt) -> Self {
        Self::from_integer(value)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.den.is_zero() {
            match self.num.sign() {
                Sign::Plus => write!(f, "Inf"),
                Sign::Minus => write!(f, "-Inf"),
                Sign::NoSign => write!(f, "NaN"),
            }
        } else if self.den.is_one() {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Shorthand for creating a rational number in tests.
#[macro_export]
macro_rules! rat {
    ($num:expr) => {
        $crate::data::rational::Rational::from($num as i64)
    };
    ($num:expr, $den:expr) => {
        $crate::data::rational::Rational::new($num as i64, $den as i64)
    };
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;

    use num_traits::{One, Zero};

    use super::{div, ArithmeticError, NumericPolicy, Rational};
    use crate::rat;

    #[test]
    fn reduction() {
        assert_eq!(rat!(6, 4), rat!(3, 2));
        assert_eq!(rat!(-6, 4), rat!(3, -2));
        assert_eq!(rat!(4, 2), rat!(2));
        assert_eq!(rat!(0, 7), Rational::zero());
        assert!(rat!(4, 2).denom().is_one());
    }

    #[test]
    #[should_panic]
    fn zero_denominator() {
        let _ = rat!(1, 0);
    }

    #[test]
    fn arithmetic() {
        assert_eq!(rat!(3, 2) + rat!(6, 4), rat!(3));
        assert_eq!(rat!(1, 3) - rat!(1, 6), rat!(1, 6));
        assert_eq!(rat!(3, 2) * rat!(6, 4), rat!(9, 4));
        assert_eq!(-rat!(3, 2), rat!(-3, 2));
        let mut x = Rational::zero();
        for _ in 0..1000 {
            x += rat!(1, 3);
        }
        assert_eq!(x, rat!(1000, 3));
    }

    #[test]
    fn infinity_absorbs() {
        let inf = Rational::infinity();
        assert_eq!(&inf + &rat!(5), inf);
        assert_eq!(&rat!(-5) + &inf, inf);
        assert_eq!(&inf + &inf, inf);
        assert_eq!(&inf * &rat!(-2), Rational::neg_infinity());
        assert_eq!(&inf * &inf, inf);
    }

    #[test]
    fn indeterminate_forms_are_nan() {
        let inf = Rational::infinity();
        assert!((&inf - &inf).is_nan());
        assert!((&inf + &Rational::neg_infinity()).is_nan());
        assert!((&Rational::zero() * &inf).is_nan());
        assert!((&inf + &Rational::nan()).is_nan());
    }

    #[test]
    fn nan_comparisons_are_invalid() {
        let nan = Rational::nan();
        assert_eq!(nan.partial_cmp(&rat!(1)), None);
        assert_eq!(rat!(1).partial_cmp(&nan), None);
        // structural equality still holds
        assert_eq!(nan, Rational::nan());
        assert_eq!(nan.partial_cmp(&Rational::nan()), Some(Ordering::Equal));
    }

    #[test]
    fn ordering() {
        assert!(rat!(1, 3) < rat!(1, 2));
        assert!(rat!(-1, 2) < rat!(-1, 3));
        assert!(rat!(5) < Rational::infinity());
        assert!(Rational::neg_infinity() < rat!(-1_000_000));
        assert!(Rational::neg_infinity() < Rational::infinity());
    }

    #[test]
    fn strict_division() {
        let strict = NumericPolicy::strict();
        assert_eq!(div(&rat!(3), &rat!(2), &strict), Ok(rat!(3, 2)));
        assert_eq!(div(&rat!(3), &rat!(-2), &strict), Ok(rat!(-3, 2)));
        assert_eq!(
            div(&rat!(3), &Rational::zero(), &strict),
            Err(ArithmeticError::DivisionByZero)
        );
        assert_eq!(
            div(&Rational::nan(), &rat!(1), &strict),
            Err(ArithmeticError::NotANumber)
        );
        assert_eq!(div(&rat!(3), &Rational::infinity(), &strict), Ok(Rational::zero()));
        assert_eq!(
            div(&Rational::infinity(), &rat!(-2), &strict),
            Ok(Rational::neg_infinity())
        );
        assert_eq!(
            div(&Rational::infinity(), &Rational::infinity(), &strict),
            Err(ArithmeticError::NotANumber)
        );
    }

    #[test]
    fn extended_division() {
        let extended = NumericPolicy::extended();
        assert_eq!(
            div(&rat!(3), &Rational::zero(), &extended),
            Ok(Rational::infinity())
        );
        assert_eq!(
            div(&rat!(-3), &Rational::zero(), &extended),
            Ok(Rational::neg_infinity())
        );
        assert!(div(&Rational::zero(), &Rational::zero(), &extended)
            .unwrap()
            .is_nan());
    }

    #[test]
    fn signum() {
        assert_eq!(rat!(7, 3).signum(), rat!(1));
        assert_eq!(rat!(-1, 8).signum(), rat!(-1));
        assert_eq!(Rational::zero().signum(), Rational::zero());
        assert_eq!(Rational::neg_infinity().signum(), rat!(-1));
        assert!(Rational::nan().signum().is_nan());
    }

    #[test]
    fn rounding() {
        assert_eq!(rat!(7, 2).floor(), Some(3.into()));
        assert_eq!(rat!(7, 2).ceil(), Some(4.into()));
        assert_eq!(rat!(-7, 2).floor(), Some((-4).into()));
        assert_eq!(rat!(-7, 2).ceil(), Some((-3).into()));
        assert_eq!(rat!(-7, 2).trunc(), Some((-3).into()));
        assert_eq!(Rational::infinity().floor(), None);
    }

    #[test]
    fn display() {
        assert_eq!(rat!(7, 3).to_string(), "7/3");
        assert_eq!(rat!(42).to_string(), "42");
        assert_eq!(rat!(-1, 2).to_string(), "-1/2");
        assert_eq!(Rational::infinity().to_string(), "Inf");
        assert_eq!(Rational::neg_infinity().to_string(), "-Inf");
        assert_eq!(Rational::nan().to_string(), "NaN");
    }

    #[test]
    fn decimal_rendering() {
        assert_eq!(rat!(3, 2).to_decimal(6), "1.5");
        assert_eq!(rat!(1, 3).to_decimal(4), "0.3333");
        // half to even
        assert_eq!(rat!(1, 8).to_decimal(2), "0.12");
        assert_eq!(rat!(3, 8).to_decimal(2), "0.38");
        assert_eq!(rat!(-1, 3).to_decimal(3), "-0.333");
        assert_eq!(rat!(5).to_decimal(3), "5");
    }
}
