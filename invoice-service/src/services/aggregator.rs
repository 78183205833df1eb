//! Invoice mutations: tax resolution, service valuation, running totals
//! and optimistic version checks, in one place.

use crate::models::{Invoice, InvoiceChanges, NewInvoice, NewService, Service, Tax};
use crate::pricing;
use crate::services::metrics::{INVOICES_TOTAL, SERVICES_TOTAL};
use crate::services::store::{InvoicePage, InvoiceStore};
use billing_core::error::AppError;
use billing_core::retry::{retry_operation, RetryConfig};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Coordinates everything that touches an invoice.
///
/// Writes never update individual fields in place. Each mutation re-reads
/// the invoice, applies the change to the owned value, bumps `version` and
/// writes the whole document back conditionally on the version it read.
/// A lost race surfaces as `Conflict` from the store and is retried with
/// backoff; exhausted retries bubble the conflict to the caller.
#[derive(Clone)]
pub struct InvoiceAggregator {
    store: Arc<dyn InvoiceStore>,
    retry: RetryConfig,
}

impl InvoiceAggregator {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self {
            store,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(store: Arc<dyn InvoiceStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    #[instrument(skip(self, input))]
    pub async fn create_invoice(&self, input: NewInvoice) -> Result<Invoice, AppError> {
        let mut invoice = Invoice::new(&input);
        for item in &input.services {
            let tax = self.resolve_tax(&item.tax_id).await?;
            invoice.add_service(Self::value_service(item, &tax));
        }

        self.store.insert_invoice(&invoice).await?;
        INVOICES_TOTAL.with_label_values(&["created"]).inc();
        info!(
            invoice_number = %invoice.invoice_number,
            services = invoice.services.len(),
            "Invoice created"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, invoice_number: &str) -> Result<Invoice, AppError> {
        self.store
            .get_invoice(invoice_number)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))
    }

    pub async fn list_invoices(&self, page: InvoicePage) -> Result<(Vec<Invoice>, u64), AppError> {
        self.store.list_invoices(page).await
    }

    #[instrument(skip(self, changes), fields(invoice_number = %invoice_number))]
    pub async fn update_invoice(
        &self,
        invoice_number: &str,
        changes: InvoiceChanges,
    ) -> Result<Invoice, AppError> {
        let invoice = self
            .mutate(invoice_number, "update_invoice", move |invoice| {
                invoice.apply_changes(&changes);
                Ok(())
            })
            .await?;
        info!(invoice_number = %invoice_number, "Invoice updated");
        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_number = %invoice_number))]
    pub async fn delete_invoice(&self, invoice_number: &str) -> Result<(), AppError> {
        let deleted = self.store.delete_invoice(invoice_number).await?;
        if !deleted {
            return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
        }
        INVOICES_TOTAL.with_label_values(&["deleted"]).inc();
        info!(invoice_number = %invoice_number, "Invoice deleted");
        Ok(())
    }

    /// Add a service line: resolve the tax, snapshot it, derive amounts
    /// and fold them into the totals, then write conditionally.
    #[instrument(skip(self, input), fields(invoice_number = %invoice_number, tax_id = %input.tax_id))]
    pub async fn add_service(
        &self,
        invoice_number: &str,
        input: NewService,
    ) -> Result<Invoice, AppError> {
        // The tax must resolve before the invoice is touched at all
        let tax = self.resolve_tax(&input.tax_id).await?;

        let invoice = self
            .mutate(invoice_number, "add_service", move |invoice| {
                invoice.add_service(Self::value_service(&input, &tax));
                Ok(())
            })
            .await?;

        SERVICES_TOTAL.with_label_values(&["added"]).inc();
        info!(
            invoice_number = %invoice_number,
            total_amount = %invoice.total_amount,
            "Service added"
        );
        Ok(invoice)
    }

    /// Remove a service line by id, subtracting exactly what it added.
    #[instrument(skip(self), fields(invoice_number = %invoice_number, service_id = %service_id))]
    pub async fn remove_service(
        &self,
        invoice_number: &str,
        service_id: &str,
    ) -> Result<Invoice, AppError> {
        let invoice = self
            .mutate(invoice_number, "remove_service", |invoice| {
                invoice
                    .remove_service(service_id)
                    .map(|_| ())
                    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Service not found")))
            })
            .await?;

        SERVICES_TOTAL.with_label_values(&["removed"]).inc();
        info!(
            invoice_number = %invoice_number,
            service_id = %service_id,
            "Service removed"
        );
        Ok(invoice)
    }

    async fn resolve_tax(&self, tax_id: &str) -> Result<Tax, AppError> {
        self.store
            .get_tax(tax_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tax not found")))
    }

    fn value_service(input: &NewService, tax: &Tax) -> Service {
        let valuation = pricing::valuate(input.selling_price, input.discount_percentage, tax.rate);
        Service {
            id: Uuid::new_v4().to_string(),
            service_type: input.service_type.clone(),
            selling_price: input.selling_price,
            discount_percentage: input.discount_percentage,
            tax_id: tax.id.clone(),
            tax_name: tax.name.clone(),
            tax_rate: tax.rate,
            discounted_price: valuation.discounted_price,
            discount_amount: valuation.discount_amount,
            tax_amount: valuation.tax_amount,
            final_price: valuation.final_price,
        }
    }

    /// Read-modify-write cycle shared by every invoice mutation. The
    /// closure runs on a fresh read each attempt, so retries never apply
    /// a change on top of stale state.
    async fn mutate<F>(
        &self,
        invoice_number: &str,
        operation: &str,
        apply: F,
    ) -> Result<Invoice, AppError>
    where
        F: Fn(&mut Invoice) -> Result<(), AppError>,
    {
        retry_operation(&self.retry, operation, || async {
            let mut invoice = self
                .store
                .get_invoice(invoice_number)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

            let read_version = invoice.version;
            apply(&mut invoice)?;
            invoice.version = read_version + 1;
            invoice.updated_utc = chrono::Utc::now();

            self.store.replace_invoice(read_version, &invoice).await?;
            Ok(invoice)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use crate::services::memory::MemoryStore;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn aggregator() -> (InvoiceAggregator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (InvoiceAggregator::new(store.clone()), store)
    }

    async fn seed_tax(store: &MemoryStore, name: &str, rate: &str) -> Tax {
        let tax = Tax::new(name.to_string(), dec(rate), false);
        store.insert_tax(&tax).await.unwrap();
        tax
    }

    fn invoice_input() -> NewInvoice {
        NewInvoice {
            invoice_number: None,
            customer_name: "Acme Traders".to_string(),
            invoice_date: None,
            due_date: None,
            reference_number: None,
            payment_method: PaymentMethod::Cash,
            services: Vec::new(),
        }
    }

    fn service_input(tax_id: &str, selling: &str, discount: &str) -> NewService {
        NewService {
            service_type: "Consulting".to_string(),
            selling_price: dec(selling),
            discount_percentage: dec(discount),
            tax_id: tax_id.to_string(),
        }
    }

    fn assert_totals_match_services(invoice: &Invoice) {
        let mut recomputed = invoice.clone();
        recomputed.recompute_totals();
        assert_eq!(recomputed.total_amount, invoice.total_amount);
        assert_eq!(
            recomputed.total_discount_amount,
            invoice.total_discount_amount
        );
        assert_eq!(recomputed.total_tax_amount, invoice.total_tax_amount);
    }

    #[tokio::test]
    async fn create_empty_invoice_has_zero_totals() {
        let (agg, _) = aggregator();
        let invoice = agg.create_invoice(invoice_input()).await.unwrap();
        assert_eq!(invoice.total_amount, Decimal::ZERO);
        assert_eq!(invoice.version, 0);
        assert!(invoice.services.is_empty());
    }

    #[tokio::test]
    async fn create_invoice_with_services_computes_totals() {
        let (agg, store) = aggregator();
        let tax = seed_tax(&store, "GST", "8").await;

        let mut input = invoice_input();
        input.services = vec![
            service_input(&tax.id, "100", "10"),
            service_input(&tax.id, "50", "0"),
        ];
        let invoice = agg.create_invoice(input).await.unwrap();

        // line 1: 90 + 7.2 tax -> 97; line 2: 50 + 4 tax -> 54
        assert_eq!(invoice.services.len(), 2);
        assert_eq!(invoice.total_amount, dec("151"));
        assert_eq!(invoice.total_discount_amount, dec("10"));
        assert_eq!(invoice.total_tax_amount, dec("11.2"));
        assert_totals_match_services(&invoice);
    }

    #[tokio::test]
    async fn create_with_unknown_tax_fails_and_stores_nothing() {
        let (agg, store) = aggregator();
        let mut input = invoice_input();
        input.invoice_number = Some("INV-1".to_string());
        input.services = vec![service_input("no-such-tax", "100", "0")];

        let result = agg.create_invoice(input).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(store.get_invoice("INV-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_invoice_number_conflicts() {
        let (agg, _) = aggregator();
        let mut input = invoice_input();
        input.invoice_number = Some("INV-1".to_string());
        agg.create_invoice(input.clone()).await.unwrap();

        let result = agg.create_invoice(input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn add_service_snapshots_tax_and_updates_totals() {
        let (agg, store) = aggregator();
        let tax = seed_tax(&store, "GST", "8").await;
        let created = agg.create_invoice(invoice_input()).await.unwrap();

        let invoice = agg
            .add_service(&created.invoice_number, service_input(&tax.id, "100", "10"))
            .await
            .unwrap();

        assert_eq!(invoice.version, 1);
        assert_eq!(invoice.services.len(), 1);
        let line = &invoice.services[0];
        assert_eq!(line.tax_name, "GST");
        assert_eq!(line.tax_rate, dec("8"));
        assert_eq!(line.discounted_price, dec("90"));
        assert_eq!(line.discount_amount, dec("10"));
        assert_eq!(line.tax_amount, dec("7.2"));
        assert_eq!(line.final_price, dec("97"));
        assert_eq!(invoice.total_amount, dec("97"));
        assert_totals_match_services(&invoice);
    }

    #[tokio::test]
    async fn tax_snapshot_survives_later_tax_changes() {
        let (agg, store) = aggregator();
        let tax = seed_tax(&store, "GST", "8").await;
        let created = agg.create_invoice(invoice_input()).await.unwrap();
        agg.add_service(&created.invoice_number, service_input(&tax.id, "100", "0"))
            .await
            .unwrap();

        store
            .update_tax(
                &tax.id,
                &crate::models::TaxChanges {
                    rate: Some(dec("20")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let invoice = agg
            .add_service(&created.invoice_number, service_input(&tax.id, "100", "0"))
            .await
            .unwrap();

        assert_eq!(invoice.services[0].tax_rate, dec("8"));
        assert_eq!(invoice.services[1].tax_rate, dec("20"));
    }

    #[tokio::test]
    async fn remove_service_restores_previous_totals() {
        let (agg, store) = aggregator();
        let gst = seed_tax(&store, "GST", "8").await;
        let exempt = seed_tax(&store, "Exempt", "0").await;
        let created = agg.create_invoice(invoice_input()).await.unwrap();

        let after_first = agg
            .add_service(&created.invoice_number, service_input(&gst.id, "100", "10"))
            .await
            .unwrap();
        let after_second = agg
            .add_service(&created.invoice_number, service_input(&exempt.id, "50", "0"))
            .await
            .unwrap();
        assert_eq!(after_second.total_amount, dec("147"));

        let first_id = after_first.services[0].id.clone();
        let after_remove = agg
            .remove_service(&created.invoice_number, &first_id)
            .await
            .unwrap();

        assert_eq!(after_remove.total_amount, dec("50"));
        assert_eq!(after_remove.total_discount_amount, Decimal::ZERO);
        assert_eq!(after_remove.total_tax_amount, Decimal::ZERO);
        assert_totals_match_services(&after_remove);

        let second_id = after_remove.services[0].id.clone();
        let emptied = agg
            .remove_service(&created.invoice_number, &second_id)
            .await
            .unwrap();
        assert_eq!(emptied.total_amount, Decimal::ZERO);
        assert!(emptied.services.is_empty());
    }

    #[tokio::test]
    async fn failed_remove_leaves_invoice_unchanged() {
        let (agg, store) = aggregator();
        let tax = seed_tax(&store, "GST", "8").await;
        let created = agg.create_invoice(invoice_input()).await.unwrap();
        agg.add_service(&created.invoice_number, service_input(&tax.id, "100", "10"))
            .await
            .unwrap();

        let before = agg.get_invoice(&created.invoice_number).await.unwrap();
        let result = agg
            .remove_service(&created.invoice_number, "no-such-service")
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let after = agg.get_invoice(&created.invoice_number).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn failed_add_leaves_invoice_unchanged() {
        let (agg, store) = aggregator();
        let tax = seed_tax(&store, "GST", "8").await;
        let created = agg.create_invoice(invoice_input()).await.unwrap();
        agg.add_service(&created.invoice_number, service_input(&tax.id, "100", "0"))
            .await
            .unwrap();

        let before = agg.get_invoice(&created.invoice_number).await.unwrap();
        let result = agg
            .add_service(
                &created.invoice_number,
                service_input("no-such-tax", "100", "0"),
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let after = agg.get_invoice(&created.invoice_number).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn update_invoice_bumps_version_and_keeps_totals() {
        let (agg, store) = aggregator();
        let tax = seed_tax(&store, "GST", "8").await;
        let created = agg.create_invoice(invoice_input()).await.unwrap();
        let with_service = agg
            .add_service(&created.invoice_number, service_input(&tax.id, "100", "10"))
            .await
            .unwrap();

        let updated = agg
            .update_invoice(
                &created.invoice_number,
                InvoiceChanges {
                    customer_name: Some("Northwind".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.customer_name, "Northwind");
        assert_eq!(updated.version, with_service.version + 1);
        assert_eq!(updated.total_amount, with_service.total_amount);
        assert_eq!(updated.services, with_service.services);
    }

    #[tokio::test]
    async fn concurrent_adds_serialize_through_version_checks() {
        let (agg, store) = aggregator();
        let tax = seed_tax(&store, "GST", "0").await;
        let created = agg.create_invoice(invoice_input()).await.unwrap();

        let (a, b) = tokio::join!(
            agg.add_service(&created.invoice_number, service_input(&tax.id, "100", "0")),
            agg.add_service(&created.invoice_number, service_input(&tax.id, "200", "0")),
        );
        a.unwrap();
        b.unwrap();

        let invoice = agg.get_invoice(&created.invoice_number).await.unwrap();
        assert_eq!(invoice.services.len(), 2);
        assert_eq!(invoice.total_amount, dec("300"));
        assert_eq!(invoice.version, 2);
        assert_totals_match_services(&invoice);
    }

    #[tokio::test]
    async fn delete_invoice_then_get_is_not_found() {
        let (agg, _) = aggregator();
        let created = agg.create_invoice(invoice_input()).await.unwrap();
        agg.delete_invoice(&created.invoice_number).await.unwrap();

        let result = agg.get_invoice(&created.invoice_number).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = agg.delete_invoice(&created.invoice_number).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
