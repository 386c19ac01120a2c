//! Amount type for monetary values.
//!
//! `Amount` wraps `Decimal` so that summing many expenses never accumulates binary floating point
//! error. In backup documents it is written as an exact JSON number (serde_json's
//! `arbitrary_precision`), and it accepts either a number or a numeric string when read.
//!
//! There is no `Add` impl. `Decimal` addition panics on overflow, so sums go through
//! `checked_add` and `checked_sum`.

use rust_decimal::Decimal;
use serde::de::{self, MapAccess, Visitor};
use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The single map key serde_json uses to hand over a number as its source text.
const JSON_NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// Represents a sum of money.
///
/// Equality is numeric, so `120.5` and `120.50` are equal.
///
/// ```
/// # use accountant::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("$1,020.50").unwrap();
/// let b = Amount::from_str("1020.5").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "1020.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Returns `None` if the sum is outside the range of `Decimal`.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Sums `amounts`, or returns `None` on overflow. The empty sum is zero.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, Amount::checked_add)
    }

    /// Parses the shortest decimal representation of `f`, so `0.1` becomes exactly `0.1`.
    pub fn from_f64(f: f64) -> Result<Self, AmountError> {
        if !f.is_finite() {
            return Err(AmountError(format!("{f} is not a finite number")));
        }
        Decimal::from_str(&f.to_string())
            .map(Amount)
            .map_err(|e| AmountError(e.to_string()))
    }
}

/// An error that can occur when parsing a value into an `Amount`.
pub struct AmountError(String);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid amount: {}", self.0)
    }
}

impl Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    /// Accepts an optional leading minus sign, an optional dollar sign and thousands separators,
    /// e.g. `-$1,250.00`. Only one sign is allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError(String::from("empty string")));
        }
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let digits = unsigned.strip_prefix('$').unwrap_or(unsigned).replace(',', "");
        if negative && digits.starts_with(['-', '+']) {
            return Err(AmountError(format!("'{s}': more than one sign")));
        }
        let value = Decimal::from_str(&digits).map_err(|e| AmountError(format!("'{s}': {e}")))?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    /// Always shows at least two decimal places.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut value = self.0.normalize();
        if value.scale() < 2 {
            value.rescale(2);
        }
        write!(f, "{value}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let number = serde_json::Number::from_str(&self.0.normalize().to_string())
            .map_err(ser::Error::custom)?;
        number.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

/// Parses the source text of a JSON number, which may use an exponent.
fn parse_number(text: &str) -> Result<Amount, AmountError> {
    let value = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text)
    } else {
        Decimal::from_str(text)
    };
    value
        .map(Amount)
        .map_err(|e| AmountError(format!("'{text}': {e}")))
}

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_f64(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Amount, A::Error> {
        match map.next_entry::<String, String>()? {
            Some((key, text)) if key == JSON_NUMBER_TOKEN => {
                parse_number(&text).map_err(de::Error::custom)
            }
            _ => Err(de::Error::invalid_type(de::Unexpected::Map, &self)),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
