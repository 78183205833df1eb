use super::{not_blank, percentage_in_range};
use crate::models::Tax;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaxRequest {
    #[validate(custom(function = "not_blank", message = "Tax name cannot be blank"))]
    pub name: String,
    #[validate(custom(
        function = "percentage_in_range",
        message = "Tax rate must be between 0 and 100"
    ))]
    pub rate: Decimal,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaxRequest {
    #[validate(custom(function = "not_blank", message = "Tax name cannot be blank"))]
    pub name: Option<String>,
    #[validate(custom(
        function = "percentage_in_range",
        message = "Tax rate must be between 0 and 100"
    ))]
    pub rate: Option<Decimal>,
    pub disabled: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaxResponse {
    pub id: String,
    pub name: String,
    pub rate: Decimal,
    pub disabled: bool,
    pub created_utc: String,
    pub updated_utc: String,
}

impl From<Tax> for TaxResponse {
    fn from(tax: Tax) -> Self {
        Self {
            id: tax.id,
            name: tax.name,
            rate: tax.rate,
            disabled: tax.disabled,
            created_utc: tax.created_utc.to_rfc3339(),
            updated_utc: tax.updated_utc.to_rfc3339(),
        }
    }
}
