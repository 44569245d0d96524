//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Sign of a value, with zero (of either sign) mapping to zero.
///
/// `Float::signum` returns 1 for +0.0, which would make static friction terms
/// push a stationary mechanism.
pub fn signum_or_zero<T>(value: T) -> T
where
    T: Float
{
    if value == T::zero() || value.is_nan() {
        T::zero()
    }
    else {
        value.signum()
    }
}

/// Zero the value if its magnitude is not above the threshold.
pub fn apply_deadband<T>(value: T, threshold: T) -> T
where
    T: Float
{
    if value.abs() > threshold {
        value
    }
    else {
        T::zero()
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// IEEE 754 remainder: `lhs - n * rhs` where `n` is `lhs / rhs` rounded to
/// the nearest integer (ties to even).
pub fn ieee_remainder<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let q = lhs / rhs;
    let mut n = q.round();

    // Float::round rounds ties away from zero, IEEE wants ties to even
    if (q - q.trunc()).abs() == T::from(0.5).unwrap() {
        let two = T::from(2.0).unwrap();
        if n % two != T::zero() {
            n = n - q.signum();
        }
    }

    lhs - n * rhs
}

/// Wrap a value into the range `[min, max)` treating the range as circular.
///
/// Used for continuous-input controllers where the error must be the
/// shortest distance around the circle.
pub fn input_modulus<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let modulus = max - min;

    min + rem_euclid(value - min, modulus)
}

/// Wrap an angle into the canonical range `(-pi, pi]`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    // rem_euclid gives [0, 2pi), shift so that the result is (-pi, pi]
    let wrapped = pi_t - rem_euclid(pi_t - angle, tau_t);

    // Round off in rem_euclid can land exactly on -pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    }
    else {
        wrapped
    }
}

/// Get the shortest signed angular distance to go from `a` to `b`.
///
/// The result is in `(-pi, pi]`, positive meaning counter-clockwise.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_pi(b - a)
}
