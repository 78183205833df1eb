//! Valuation of a single service line: discount first, then tax on the
//! discounted price, then one rounding step on the final price.

use rust_decimal::{Decimal, RoundingStrategy};

/// Derived amounts for one service line.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub discounted_price: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub final_price: Decimal,
}

/// Value a service line.
///
/// `final_price` is rounded to a whole currency unit, midpoint away from
/// zero. `discount_amount` and `tax_amount` keep full precision, so the
/// components of a line can differ from its rounded final by up to half a
/// unit. Anything that must reconcile against the final price has to use
/// the final price itself, not re-derive it from the parts.
pub fn valuate(
    selling_price: Decimal,
    discount_percentage: Decimal,
    tax_rate: Decimal,
) -> Valuation {
    let discounted_price =
        selling_price * (Decimal::ONE - discount_percentage / Decimal::ONE_HUNDRED);
    let discount_amount = selling_price - discounted_price;
    let tax_amount = discounted_price * (tax_rate / Decimal::ONE_HUNDRED);
    let final_price = (discounted_price + tax_amount)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    Valuation {
        discounted_price,
        discount_amount,
        tax_amount,
        final_price,
    }
}
