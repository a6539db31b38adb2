// money.rs
// Conversions between the BSON storage type and rust_decimal arithmetic.

use anyhow::{Result, anyhow};
use mongodb::bson::Decimal128;
use rust_decimal::Decimal;
use std::str::FromStr;

pub fn to_decimal(value: &Decimal128) -> Result<Decimal> {
    let text = value.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|err| anyhow!("invalid stored decimal {text}: {err}"))
}

pub fn to_decimal128(value: Decimal) -> Result<Decimal128> {
    Decimal128::from_str(&value.normalize().to_string())
        .map_err(|err| anyhow!("cannot store decimal {value}: {err:?}"))
}

pub fn opt_to_decimal(value: Option<&Decimal128>) -> Result<Option<Decimal>> {
    value.map(to_decimal).transpose()
}

pub fn opt_to_decimal128(value: Option<Decimal>) -> Result<Option<Decimal128>> {
    value.map(to_decimal128).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn stored_value_keeps_scale() {
        let stored = to_decimal128(d("1250.75")).unwrap();
        assert_eq!(to_decimal(&stored).unwrap(), d("1250.75"));
    }

    #[test]
    fn trailing_zeros_are_dropped_before_storing() {
        let stored = to_decimal128(d("100.500")).unwrap();
        assert_eq!(to_decimal(&stored).unwrap(), d("100.5"));
    }

    #[test]
    fn missing_optional_stays_missing() {
        assert_eq!(opt_to_decimal(None).unwrap(), None);
    }
}
