use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
    str::FromStr,
};

use crate::error::ParseDecimalError;

/// An exact fixed-point number: `unscaled × 10^-scale`.
///
/// Values are never normalised, so `Decimal::new(100, 2)` and `Decimal::new(1000, 3)` keep their own
/// representation while still comparing equal.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decimal {
    /// The unscaled magnitude.
    pub unscaled: i64,

    /// The number of digits after the decimal point. Negative scales multiply by powers of ten.
    pub scale: i32,
}

impl Decimal {
    /// Zero at scale 0.
    pub const ZERO: Self = Self { unscaled: 0, scale: 0 };

    /// Create a decimal from its unscaled magnitude and scale.
    pub const fn new(unscaled: i64, scale: i32) -> Self {
        Self { unscaled, scale }
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        // An empty amount decodes to zero rather than failing; existing payloads rely on it.
        if text.is_empty() {
            return Ok(Self::ZERO);
        }

        let (digits, scale) = match text.split_once('.') {
            Some((integer, fraction)) => {
                if fraction.contains('.') {
                    return Err(ParseDecimalError::MultiplePoints(text.to_string()));
                }
                let scale = i32::try_from(fraction.len()).map_err(|_| ParseDecimalError::Overflow(text.to_string()))?;
                (format!("{integer}{fraction}"), scale)
            }
            None => (text.to_string(), 0),
        };

        let magnitude = digits.strip_prefix(['-', '+']).unwrap_or(&digits);
        if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseDecimalError::InvalidDigits(text.to_string()));
        }

        let unscaled = digits.parse::<i64>().map_err(|_| ParseDecimalError::Overflow(text.to_string()))?;
        Ok(Self { unscaled, scale })
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let digits = self.unscaled.unsigned_abs().to_string();

        if self.scale <= 0 {
            let zeros = "0".repeat(self.scale.unsigned_abs() as usize);
            return write!(f, "{sign}{digits}{zeros}");
        }

        let scale = self.scale as usize;
        let padded = if digits.len() <= scale { format!("{digits:0>width$}", width = scale + 1) } else { digits };
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{integer}.{fraction}")
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (mut left, mut right) = (i128::from(self.unscaled), i128::from(other.unscaled));
        match self.scale.cmp(&other.scale) {
            Ordering::Greater => match rescale(right, self.scale.abs_diff(other.scale)) {
                Some(value) => right = value,
                None => return 0.cmp(&right),
            },
            Ordering::Less => match rescale(left, self.scale.abs_diff(other.scale)) {
                Some(value) => left = value,
                None => return left.cmp(&0),
            },
            Ordering::Equal => {}
        }
        left.cmp(&right)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

/// Multiplies `value` by `10^digits`, or `None` when the result does not fit in an `i128`.
fn rescale(value: i128, digits: u32) -> Option<i128> {
    10i128.checked_pow(digits).and_then(|factor| value.checked_mul(factor))
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.trim().parse().map_err(serde::de::Error::custom)
    }
}
