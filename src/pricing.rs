//! Money rules applied when a sale is completed.
//!
//! All amounts are integer cents.

use crate::models::DiscountType;

/// Splits `amount` into `parts` shares that sum to exactly `amount`.
///
/// Every share gets `amount / parts`; the first `amount % parts` shares get one
/// extra cent. `$10.00` over three units is `[334, 333, 333]`.
pub fn split_even(amount: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = amount / n;
    let remainder = (amount % n) as usize;
    (0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// `pct` percent of `price`, rounded half-up to the cent.
pub fn percent_of(price: i64, pct: i64) -> i64 {
    let cents = (price as i128 * pct as i128 + 50) / 100;
    cents as i64
}

/// Sale price after discount; never negative.
pub fn final_price(target_price: i64, discount: i64) -> i64 {
    (target_price - discount).max(0)
}

/// Cart-level discount requested at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartDiscount {
    pub kind: DiscountType,
    /// Cents for `Dollar`, whole percent for `Percent`.
    pub value: i64,
}

impl CartDiscount {
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            DiscountType::Dollar if self.value < 0 => {
                Err("discount amount cannot be negative".into())
            }
            DiscountType::Percent if !(0..=100).contains(&self.value) => {
                Err("discount percent must be between 0 and 100".into())
            }
            _ => Ok(()),
        }
    }

    /// A dollar discount may not exceed the cart's gross.
    pub fn check_within(&self, gross: i64) -> Result<(), String> {
        match self.kind {
            DiscountType::Dollar if self.value > gross => Err(format!(
                "discount of {} cents exceeds the cart total of {gross} cents",
                self.value
            )),
            _ => Ok(()),
        }
    }

    /// Per-unit discounts, one per target price, in the same order.
    ///
    /// A dollar amount is split evenly; a share larger than its unit's price is
    /// capped and the overflow moves on to units with room left. Once
    /// [`check_within`](Self::check_within) has passed, the shares sum to the full amount.
    pub fn allocate(&self, target_prices: &[i64]) -> Vec<i64> {
        match self.kind {
            DiscountType::Dollar => {
                let mut shares = split_even(self.value, target_prices.len());
                let mut carry = 0;
                for (share, price) in shares.iter_mut().zip(target_prices) {
                    let wanted = *share + carry;
                    *share = wanted.min(*price);
                    carry = wanted - *share;
                }
                for (share, price) in shares.iter_mut().zip(target_prices) {
                    let take = (price - *share).min(carry);
                    *share += take;
                    carry -= take;
                }
                shares
            }
            DiscountType::Percent => target_prices
                .iter()
                .map(|price| percent_of(*price, self.value))
                .collect(),
        }
    }
}
