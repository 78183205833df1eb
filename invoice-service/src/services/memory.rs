//! In-memory implementation of [`InvoiceStore`] for tests and local runs
//! without a MongoDB instance. Honors the same version semantics as the
//! MongoDB store, including conflict detection on conditional replace.

use crate::models::{Invoice, Tax, TaxChanges};
use crate::services::metrics::STORE_CONFLICTS_TOTAL;
use crate::services::store::{InvoicePage, InvoiceStore};
use async_trait::async_trait;
use billing_core::error::AppError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemoryStore {
    invoices: Mutex<HashMap<String, Invoice>>,
    taxes: Mutex<HashMap<String, Tax>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_invoices(&self) -> Result<MutexGuard<'_, HashMap<String, Invoice>>, AppError> {
        self.invoices
            .lock()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("invoice store mutex poisoned")))
    }

    fn lock_taxes(&self) -> Result<MutexGuard<'_, HashMap<String, Tax>>, AppError> {
        self.taxes
            .lock()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("tax store mutex poisoned")))
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert_tax(&self, tax: &Tax) -> Result<(), AppError> {
        self.lock_taxes()?.insert(tax.id.clone(), tax.clone());
        Ok(())
    }

    async fn get_tax(&self, tax_id: &str) -> Result<Option<Tax>, AppError> {
        Ok(self.lock_taxes()?.get(tax_id).cloned())
    }

    async fn list_taxes(&self) -> Result<Vec<Tax>, AppError> {
        let mut taxes: Vec<Tax> = self.lock_taxes()?.values().cloned().collect();
        taxes.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(taxes)
    }

    async fn update_tax(
        &self,
        tax_id: &str,
        changes: &TaxChanges,
    ) -> Result<Option<Tax>, AppError> {
        let mut taxes = self.lock_taxes()?;
        let Some(tax) = taxes.get_mut(tax_id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            tax.name = name.clone();
        }
        if let Some(rate) = changes.rate {
            tax.rate = rate;
        }
        if let Some(disabled) = changes.disabled {
            tax.disabled = disabled;
        }
        tax.updated_utc = Utc::now();
        Ok(Some(tax.clone()))
    }

    async fn delete_tax(&self, tax_id: &str) -> Result<bool, AppError> {
        Ok(self.lock_taxes()?.remove(tax_id).is_some())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), AppError> {
        let mut invoices = self.lock_invoices()?;
        if invoices.contains_key(&invoice.invoice_number) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice '{}' already exists",
                invoice.invoice_number
            )));
        }
        invoices.insert(invoice.invoice_number.clone(), invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, invoice_number: &str) -> Result<Option<Invoice>, AppError> {
        Ok(self.lock_invoices()?.get(invoice_number).cloned())
    }

    async fn list_invoices(&self, page: InvoicePage) -> Result<(Vec<Invoice>, u64), AppError> {
        let mut all: Vec<Invoice> = self.lock_invoices()?.values().cloned().collect();
        all.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        let total = all.len() as u64;

        let skip = (page.page.saturating_sub(1) * page.page_size) as usize;
        let invoices = all
            .into_iter()
            .skip(skip)
            .take(page.page_size as usize)
            .collect();

        Ok((invoices, total))
    }

    async fn replace_invoice(
        &self,
        expected_version: i64,
        invoice: &Invoice,
    ) -> Result<(), AppError> {
        let mut invoices = self.lock_invoices()?;
        match invoices.get(&invoice.invoice_number) {
            None => return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found"))),
            Some(current) if current.version != expected_version => {
                STORE_CONFLICTS_TOTAL.inc();
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Invoice '{}' was modified concurrently",
                    invoice.invoice_number
                )));
            }
            Some(_) => {}
        }
        invoices.insert(invoice.invoice_number.clone(), invoice.clone());
        Ok(())
    }

    async fn delete_invoice(&self, invoice_number: &str) -> Result<bool, AppError> {
        Ok(self.lock_invoices()?.remove(invoice_number).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewInvoice, PaymentMethod};

    fn invoice(number: &str) -> Invoice {
        Invoice::new(&NewInvoice {
            invoice_number: Some(number.to_string()),
            customer_name: "Acme Traders".to_string(),
            invoice_date: None,
            due_date: None,
            reference_number: None,
            payment_method: PaymentMethod::Cash,
            services: Vec::new(),
        })
    }

    #[tokio::test]
    async fn replace_with_matching_version_succeeds() {
        let store = MemoryStore::new();
        let mut inv = invoice("INV-1");
        store.insert_invoice(&inv).await.unwrap();

        inv.version = 1;
        inv.customer_name = "Northwind".to_string();
        store.replace_invoice(0, &inv).await.unwrap();

        let stored = store.get_invoice("INV-1").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.customer_name, "Northwind");
    }

    #[tokio::test]
    async fn replace_with_stale_version_conflicts() {
        let store = MemoryStore::new();
        let mut inv = invoice("INV-1");
        store.insert_invoice(&inv).await.unwrap();

        inv.version = 1;
        store.replace_invoice(0, &inv).await.unwrap();

        // Second writer still thinks the version is 0
        let mut stale = invoice("INV-1");
        stale.version = 1;
        let result = store.replace_invoice(0, &stale).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn replace_missing_invoice_is_not_found() {
        let store = MemoryStore::new();
        let inv = invoice("INV-1");
        let result = store.replace_invoice(0, &inv).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        let inv = invoice("INV-1");
        store.insert_invoice(&inv).await.unwrap();
        let result = store.insert_invoice(&inv).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_invoices_pages_newest_first() {
        let store = MemoryStore::new();
        for n in ["INV-1", "INV-2", "INV-3"] {
            store.insert_invoice(&invoice(n)).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let (first_page, total) = store
            .list_invoices(InvoicePage {
                page: 1,
                page_size: 2,
            })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].invoice_number, "INV-3");

        let (second_page, _) = store
            .list_invoices(InvoicePage {
                page: 2,
                page_size: 2,
            })
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].invoice_number, "INV-1");
    }
}
