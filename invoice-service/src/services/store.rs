use crate::models::{Invoice, Tax, TaxChanges};
use async_trait::async_trait;
use billing_core::error::AppError;

/// Page request for invoice listings. Callers normalize the values before
/// they get here; stores only translate them to skip/limit.
#[derive(Debug, Clone, Copy)]
pub struct InvoicePage {
    pub page: u64,
    pub page_size: u64,
}

impl Default for InvoicePage {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

/// Document store for taxes and invoices.
///
/// Invoices are written whole. `replace_invoice` is conditional on the
/// stored `version` still matching `expected_version`; a lost race comes
/// back as `Conflict` and a vanished invoice as `NotFound`. That single
/// primitive is what serializes concurrent invoice mutations.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    async fn insert_tax(&self, tax: &Tax) -> Result<(), AppError>;
    async fn get_tax(&self, tax_id: &str) -> Result<Option<Tax>, AppError>;
    async fn list_taxes(&self) -> Result<Vec<Tax>, AppError>;
    async fn update_tax(&self, tax_id: &str, changes: &TaxChanges)
        -> Result<Option<Tax>, AppError>;
    async fn delete_tax(&self, tax_id: &str) -> Result<bool, AppError>;

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), AppError>;
    async fn get_invoice(&self, invoice_number: &str) -> Result<Option<Invoice>, AppError>;
    /// Returns one page of invoices, newest first, plus the total count.
    async fn list_invoices(&self, page: InvoicePage) -> Result<(Vec<Invoice>, u64), AppError>;
    async fn replace_invoice(
        &self,
        expected_version: i64,
        invoice: &Invoice,
    ) -> Result<(), AppError>;
    async fn delete_invoice(&self, invoice_number: &str) -> Result<bool, AppError>;
}
