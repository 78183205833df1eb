//! MongoDB-backed implementation of [`InvoiceStore`].

use crate::models::{Invoice, Tax, TaxChanges};
use crate::services::metrics::{DB_QUERY_DURATION, STORE_CONFLICTS_TOTAL};
use crate::services::store::{InvoicePage, InvoiceStore};
use async_trait::async_trait;
use billing_core::error::AppError;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Client as MongoClient, Collection, Database, IndexModel};
use tracing::instrument;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    /// Connect to MongoDB and select the service database.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);

        tracing::info!(database = database, "Connected to MongoDB");

        Ok(Self { client, db })
    }

    /// Create the indexes the service queries rely on. Safe to call on
    /// every startup; existing indexes are left alone.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        let created_idx = IndexModel::builder()
            .keys(doc! { "created_utc": -1 })
            .options(
                IndexOptions::builder()
                    .name("created_utc_idx".to_string())
                    .build(),
            )
            .build();

        self.invoices()
            .create_index(created_idx, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create invoice indexes: {}", e);
                AppError::from(e)
            })?;

        tracing::info!("MongoDB indexes initialized");
        Ok(())
    }

    fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }

    fn taxes(&self) -> Collection<Tax> {
        self.db.collection("taxes")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(write_err))
            if write_err.code == 11000
    )
}

#[async_trait]
impl InvoiceStore for MongoStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, tax), fields(tax_id = %tax.id))]
    async fn insert_tax(&self, tax: &Tax) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_tax"])
            .start_timer();

        self.taxes().insert_one(tax, None).await?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_tax(&self, tax_id: &str) -> Result<Option<Tax>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_tax"])
            .start_timer();

        let tax = self.taxes().find_one(doc! { "_id": tax_id }, None).await?;

        timer.observe_duration();
        Ok(tax)
    }

    #[instrument(skip(self))]
    async fn list_taxes(&self) -> Result<Vec<Tax>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_taxes"])
            .start_timer();

        let options = FindOptions::builder()
            .sort(doc! { "created_utc": -1 })
            .build();
        let mut cursor = self.taxes().find(doc! {}, options).await?;
        let mut taxes = Vec::new();
        while let Some(tax) = cursor.try_next().await? {
            taxes.push(tax);
        }

        timer.observe_duration();
        Ok(taxes)
    }

    #[instrument(skip(self, changes))]
    async fn update_tax(
        &self,
        tax_id: &str,
        changes: &TaxChanges,
    ) -> Result<Option<Tax>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_tax"])
            .start_timer();

        let mut set = doc! { "updated_utc": BsonDateTime::now() };
        if let Some(name) = &changes.name {
            set.insert("name", name);
        }
        if let Some(rate) = &changes.rate {
            // Decimal fields are stored as strings, matching serde
            set.insert("rate", rate.to_string());
        }
        if let Some(disabled) = changes.disabled {
            set.insert("disabled", disabled);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let tax = self
            .taxes()
            .find_one_and_update(doc! { "_id": tax_id }, doc! { "$set": set }, options)
            .await?;

        timer.observe_duration();
        Ok(tax)
    }

    #[instrument(skip(self))]
    async fn delete_tax(&self, tax_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_tax"])
            .start_timer();

        let result = self.taxes().delete_one(doc! { "_id": tax_id }, None).await?;

        timer.observe_duration();
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self, invoice), fields(invoice_number = %invoice.invoice_number))]
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        self.invoices().insert_one(invoice, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice '{}' already exists",
                    invoice.invoice_number
                ))
            } else {
                tracing::error!("Failed to insert invoice: {}", e);
                AppError::from(e)
            }
        })?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_invoice(&self, invoice_number: &str) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = self
            .invoices()
            .find_one(doc! { "_id": invoice_number }, None)
            .await?;

        timer.observe_duration();
        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn list_invoices(&self, page: InvoicePage) -> Result<(Vec<Invoice>, u64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let filter = doc! {};
        let total = self
            .invoices()
            .count_documents(filter.clone(), None)
            .await?;

        let skip = page.page.saturating_sub(1) * page.page_size;
        let options = FindOptions::builder()
            .sort(doc! { "created_utc": -1 })
            .skip(skip)
            .limit(page.page_size as i64)
            .build();

        let mut cursor = self.invoices().find(filter, options).await?;
        let mut invoices = Vec::new();
        while let Some(invoice) = cursor.try_next().await? {
            invoices.push(invoice);
        }

        timer.observe_duration();
        Ok((invoices, total))
    }

    #[instrument(skip(self, invoice), fields(invoice_number = %invoice.invoice_number))]
    async fn replace_invoice(
        &self,
        expected_version: i64,
        invoice: &Invoice,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_invoice"])
            .start_timer();

        let filter = doc! {
            "_id": &invoice.invoice_number,
            "version": expected_version,
        };
        let replaced = self
            .invoices()
            .find_one_and_replace(filter, invoice, None)
            .await?;

        timer.observe_duration();

        match replaced {
            Some(_) => Ok(()),
            None => {
                // Distinguish a lost version race from a deleted invoice
                let exists = self
                    .invoices()
                    .count_documents(doc! { "_id": &invoice.invoice_number }, None)
                    .await?
                    > 0;
                if exists {
                    STORE_CONFLICTS_TOTAL.inc();
                    Err(AppError::Conflict(anyhow::anyhow!(
                        "Invoice '{}' was modified concurrently",
                        invoice.invoice_number
                    )))
                } else {
                    Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")))
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_invoice(&self, invoice_number: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = self
            .invoices()
            .delete_one(doc! { "_id": invoice_number }, None)
            .await?;

        timer.observe_duration();
        Ok(result.deleted_count > 0)
    }
}
