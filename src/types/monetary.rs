use crate::types::errors::MonetaryError;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Neg;
use std::str::FromStr;

/// An exact, signed amount of money.
///
/// Every monetary value in the crate goes through this type. There is exactly one way to
/// build one from text ([`Money::from_str`]) and it refuses anything it cannot represent
/// exactly instead of coercing it.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Money(Decimal);

impl Money {
    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Adds `rhs`, returning `None` if the exact sum cannot be represented.
    ///
    /// `Decimal::checked_add` only fails on integer overflow. When the exact sum needs more
    /// than 96 bits of mantissa it drops scale and rounds, which is treated as overflow here.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        let sum = self.0.checked_add(rhs.0)?;
        Money::exact(sum, self.0, rhs.0, sum.checked_sub(rhs.0))
    }

    /// Subtracts `rhs`, with the same exactness rule as [`Money::checked_add`].
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        let difference = self.0.checked_sub(rhs.0)?;
        Money::exact(difference, self.0, rhs.0, difference.checked_add(rhs.0))
    }

    fn exact(result: Decimal, lhs: Decimal, rhs: Decimal, inverse: Option<Decimal>) -> Option<Money> {
        if result.scale() < lhs.scale().max(rhs.scale()) || inverse != Some(lhs) {
            return None;
        }

        Some(Money(result))
    }

    /// Parses a non-negative magnitude, as stored on ledger entries.
    pub fn parse_magnitude(value: &str) -> Result<Money, MonetaryError> {
        let money = Money::from_str(value)?;

        if money.is_negative() {
            return Err(MonetaryError::Negative(value.trim().to_string()));
        }

        Ok(money)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Display for Money {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = MonetaryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();

        if value.is_empty() {
            return Err(MonetaryError::InvalidFormat("Value is an empty string".to_string()));
        }

        let (negative, unsigned) = match value.as_bytes()[0] {
            b'-' => (true, &value[1..]),
            b'+' => (false, &value[1..]),
            _ => (false, value)
        };

        let (integer, fraction) = match unsigned.split_once('.') {
            Some((integer, fraction)) => (integer, fraction),
            None => (unsigned, "")
        };

        if integer.is_empty() || !integer.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonetaryError::InvalidFormat(format!("Value has an invalid integer part: {value:?}")));
        }

        //NOTE: split_once leaves any second decimal point in the fraction, so this also rejects "1.2.3"
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonetaryError::InvalidFormat(format!("Value has an invalid fraction part: {value:?}")));
        }

        let canonical = if fraction.is_empty() {
            integer.to_string()
        } else {
            format!("{integer}.{fraction}")
        };

        let magnitude = Decimal::from_str_exact(&canonical).map_err(|error| {
            MonetaryError::InvalidFormat(format!("Value cannot be represented exactly: {error}"))
        })?;

        Ok(Money(if negative { -magnitude } else { magnitude }))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Money::from_str(&value).map_err(de::Error::custom)
    }
}
