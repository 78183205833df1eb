use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A service line embedded in an invoice.
///
/// `tax_id`, `tax_name` and `tax_rate` are a snapshot of the tax as it was
/// when the line was added. The four derived amounts are computed once at
/// that point and never recomputed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub service_type: String,
    pub selling_price: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    pub tax_id: String,
    pub tax_name: String,
    pub tax_rate: Decimal,
    pub discounted_price: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub final_price: Decimal,
}

/// Input for adding a service line. The tax is resolved and the amounts
/// are derived by the aggregator before anything is stored.
#[derive(Debug, Clone)]
pub struct NewService {
    pub service_type: String,
    pub selling_price: Decimal,
    pub discount_percentage: Decimal,
    pub tax_id: String,
}
