//! Request and response shapes for the HTTP API, plus the field rules
//! shared between them.

pub mod invoices;
pub mod taxes;

pub use invoices::{
    CreateInvoiceRequest, CreateServiceRequest, DocumentLine, InvoiceDocumentResponse,
    InvoiceListParams, InvoiceListResponse, InvoiceResponse, ServiceResponse,
    UpdateInvoiceRequest,
};
pub use taxes::{CreateTaxRequest, TaxResponse, UpdateTaxRequest};

use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

pub(crate) fn percentage_in_range(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_out_of_range"));
    }
    Ok(())
}
