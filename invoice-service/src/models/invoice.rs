use super::service::{NewService, Service};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an invoice is expected to be paid. The wire strings are a closed
/// set; anything else is rejected at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    DebitCard,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Other => "Other",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invoice document with embedded service lines and running totals.
///
/// The three totals are kept equal to the sums over `services` at all
/// times: every mutation goes through [`Invoice::add_service`] or
/// [`Invoice::remove_service`], which adjust the totals in the same step.
/// `version` counts committed writes and backs the conditional replace in
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub invoice_number: String,
    pub customer_name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub invoice_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    pub reference_number: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub total_discount_amount: Decimal,
    #[serde(default)]
    pub total_tax_amount: Decimal,
    #[serde(default)]
    pub version: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    /// Build an empty invoice from the header input. Service lines are
    /// valued and attached by the aggregator afterwards.
    pub fn new(input: &NewInvoice) -> Self {
        let now = Utc::now();
        Self {
            invoice_number: input
                .invoice_number
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            customer_name: input.customer_name.clone(),
            invoice_date: input.invoice_date.unwrap_or(now),
            due_date: input.due_date.unwrap_or(now),
            reference_number: input.reference_number.clone(),
            payment_method: input.payment_method,
            services: Vec::new(),
            total_amount: Decimal::ZERO,
            total_discount_amount: Decimal::ZERO,
            total_tax_amount: Decimal::ZERO,
            version: 0,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Attach a valued service line, folding its amounts into the totals.
    pub fn add_service(&mut self, service: Service) {
        self.total_amount += service.final_price;
        self.total_discount_amount += service.discount_amount;
        self.total_tax_amount += service.tax_amount;
        self.services.push(service);
    }

    /// Detach a service line by id, subtracting exactly the amounts it
    /// contributed. Returns the removed line, or `None` if the id is not
    /// on this invoice.
    pub fn remove_service(&mut self, service_id: &str) -> Option<Service> {
        let index = self.services.iter().position(|s| s.id == service_id)?;
        let service = self.services.remove(index);
        self.total_amount -= service.final_price;
        self.total_discount_amount -= service.discount_amount;
        self.total_tax_amount -= service.tax_amount;
        Some(service)
    }

    /// Apply a header update. Services and totals are deliberately out of
    /// reach here; they only change through add/remove.
    pub fn apply_changes(&mut self, changes: &InvoiceChanges) {
        if let Some(name) = &changes.customer_name {
            self.customer_name = name.clone();
        }
        if let Some(date) = changes.invoice_date {
            self.invoice_date = date;
        }
        if let Some(date) = changes.due_date {
            self.due_date = date;
        }
        if let Some(reference) = &changes.reference_number {
            self.reference_number = Some(reference.clone());
        }
        if let Some(method) = changes.payment_method {
            self.payment_method = method;
        }
    }

    /// Rebuild the three totals from the embedded services. The running
    /// totals make this redundant in normal operation; it exists as the
    /// repair path for documents written by older code.
    pub fn recompute_totals(&mut self) {
        self.total_amount = self.services.iter().map(|s| s.final_price).sum();
        self.total_discount_amount = self.services.iter().map(|s| s.discount_amount).sum();
        self.total_tax_amount = self.services.iter().map(|s| s.tax_amount).sum();
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: Option<String>,
    pub customer_name: String,
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
    pub payment_method: PaymentMethod,
    pub services: Vec<NewService>,
}

/// Partial update for invoice header fields.
#[derive(Debug, Clone, Default)]
pub struct InvoiceChanges {
    pub customer_name: Option<String>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}
