//! Fixed-point math utilities for deterministic combat resolution.
//!
//! Every percentage, attribute and coordinate in the engine is a [`Fixed`].
//! Floating-point operations can produce different results on different
//! CPUs, and percentage formulas drift when evaluated in binary floats.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all combat math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
///
/// The single coordinate type used by targeting and movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-authored decimal values in data files.
///
/// Data tables are written by designers as `1.5` or `120`, not as raw bits.
/// The number is read as an `f64` and converted to the nearest fixed-point
/// value once at load time; all arithmetic after that is fixed-point.
/// Values outside the fixed-point range are rejected.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a decimal number.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize from a decimal number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("value {value} out of fixed range")))
    }
}

/// Serde support for optional decimal values in data files.
pub mod option_decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional decimal number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_num::<f64>()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional decimal number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(|value| {
                Fixed::checked_from_num(value).ok_or_else(|| {
                    serde::de::Error::custom(format!("value {value} out of fixed range"))
                })
            })
            .transpose()
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Unit vector along +X.
    pub const UNIT_X: Self = Self {
        x: Fixed::ONE,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 2D cross product.
    #[must_use]
    pub fn cross(self, other: Self) -> Fixed {
        self.x * other.y - self.y * other.x
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.dot(self))
    }

    /// Scale by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Move toward `target` by at most `step`, never overshooting.
    #[must_use]
    pub fn step_toward(self, target: Self, step: Fixed) -> Self {
        let diff = target - self;
        let dist = diff.length();
        if dist <= step || dist == Fixed::ZERO {
            return target;
        }
        self + diff.normalize().scale(step)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Cosine of an angle given in whole degrees, evaluated with a Taylor series.
///
/// Only used at cast time for fan-shaped targeting, where the input is a
/// half-angle in `0..=180`.
#[must_use]
pub fn fixed_cos_degrees(degrees: u32) -> Fixed {
    let degrees = degrees % 360;
    // cos is symmetric around 180
    let degrees = if degrees > 180 { 360 - degrees } else { degrees };
    // Fold into [0, 90] to keep the series well conditioned.
    let (folded, sign) = if degrees > 90 {
        (180 - degrees, -Fixed::ONE)
    } else {
        (degrees, Fixed::ONE)
    };

    let pi = Fixed::from_num(fixed::consts::PI);
    let x = Fixed::from_num(folded) * pi / Fixed::from_num(180);
    let x2 = x * x;

    let mut term = Fixed::ONE;
    let mut sum = Fixed::ONE;
    for n in 1..8i32 {
        let denom = Fixed::from_num((2 * n - 1) * (2 * n));
        term = -term * x2 / denom;
        sum += term;
    }

    sum * sign
}

/// Convert a whole percentage (e.g. `25`) into a fraction (`0.25`).
#[must_use]
pub fn percent(value: i32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Round to the nearest integer, halves away from zero.
///
/// Saturates at the ends of the fixed-point range.
#[must_use]
pub fn round_to_i64(value: Fixed) -> i64 {
    value.saturating_round().to_num::<i64>()
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((a.distance(b) - Fixed::from_num(5)).abs() < epsilon);
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_vec2_cross_sign() {
        let forward = Vec2Fixed::UNIT_X;
        let left = Vec2Fixed::from_ints(0, 1);
        assert!(forward.cross(left) > Fixed::ZERO);
        assert!(left.cross(forward) < Fixed::ZERO);
    }

    #[test]
    fn test_step_toward_does_not_overshoot() {
        let from = Vec2Fixed::ZERO;
        let to = Vec2Fixed::from_ints(1, 0);
        assert_eq!(from.step_toward(to, Fixed::from_num(5)), to);

        let far = Vec2Fixed::from_ints(10, 0);
        let moved = from.step_toward(far, Fixed::from_num(2));
        let epsilon = Fixed::ONE / Fixed::from_num(1000);
        assert!((moved.x - Fixed::from_num(2)).abs() < epsilon);
    }

    #[test]
    fn test_cos_reference_angles() {
        let epsilon = Fixed::ONE / Fixed::from_num(1000);
        assert!((fixed_cos_degrees(0) - Fixed::ONE).abs() < epsilon);
        assert!(fixed_cos_degrees(90).abs() < epsilon);
        assert!((fixed_cos_degrees(60) - Fixed::from_num(0.5)).abs() < epsilon);
        assert!((fixed_cos_degrees(180) + Fixed::ONE).abs() < epsilon);
        assert!((fixed_cos_degrees(120) + Fixed::from_num(0.5)).abs() < epsilon);
    }

    #[test]
    fn test_round_to_i64() {
        assert_eq!(round_to_i64(Fixed::from_num(2.5)), 3);
        assert_eq!(round_to_i64(Fixed::from_num(2.49)), 2);
        assert_eq!(round_to_i64(Fixed::from_num(-2.5)), -3);
        assert_eq!(round_to_i64(percent(150) * Fixed::from_num(10)), 15);
        assert_eq!(round_to_i64(Fixed::MAX), Fixed::MAX.to_num::<i64>());
        assert_eq!(round_to_i64(Fixed::MIN), Fixed::MIN.to_num::<i64>());
    }

    #[derive(Debug, serde::Deserialize)]
    struct Decimal {
        #[serde(with = "decimal_serde")]
        value: Fixed,
    }

    #[test]
    fn test_decimal_goes_through_f64() {
        let parsed: Decimal = ron::from_str("(value: 0.1)").unwrap();
        assert_eq!(parsed.value, Fixed::from_num(0.1_f64));
        let whole: Decimal = ron::from_str("(value: 120)").unwrap();
        assert_eq!(whole.value, Fixed::from_num(120));
        assert!(ron::from_str::<Decimal>("(value: 1e20)").is_err());
    }
}
