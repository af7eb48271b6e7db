use std::fmt;

use serde::{Deserialize, Serialize};

/// A price or total in integer cents.
///
/// Prices are snapshotted into carts and orders as `Money`, so a total is
/// always an exact sum of `unit_price * quantity` terms. Arithmetic is
/// checked and yields `None` on overflow. Serializes as `{"cents": N}`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// Line total for `quantity` units at this price.
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.cents.checked_mul(i64::from(quantity)).map(Money::from_cents)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Sums the amounts, `None` if the total does not fit.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_cents() {
        assert_eq!(Money::from_cents(5550).to_string(), "$55.50");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_cart_total_is_sum_of_line_totals() {
        let lines = [(Money::from_cents(2000), 2), (Money::from_cents(1550), 1)];

        let total = lines
            .iter()
            .map(|(price, qty)| price.checked_mul(*qty))
            .collect::<Option<Vec<_>>>()
            .and_then(Money::checked_sum);

        assert_eq!(total, Some(Money::from_cents(5550)));
        assert_eq!(Money::checked_sum([]), Some(Money::ZERO));
    }

    #[test]
    fn test_overflow_is_reported_not_wrapped() {
        let huge = Money::from_cents(i64::MAX / 2);

        assert_eq!(huge.checked_mul(3), None);
        assert_eq!(Money::checked_sum([huge, huge, huge]), None);
        assert_eq!(
            Money::from_cents(-5).checked_add(Money::from_cents(5)),
            Some(Money::ZERO)
        );
    }

    #[test]
    fn test_serializes_as_cents_object() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, r#"{"cents":1999}"#);

        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cents(), 1999);
    }
}
