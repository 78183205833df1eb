use super::{non_negative, not_blank, percentage_in_range};
use crate::models::{Invoice, NewInvoice, NewService, PaymentMethod, Service};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    /// Client-chosen invoice number; generated when absent.
    #[validate(custom(function = "not_blank", message = "Invoice number cannot be blank"))]
    pub invoice_number: Option<String>,
    #[validate(custom(function = "not_blank", message = "Customer name cannot be blank"))]
    pub customer_name: String,
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    #[validate(nested)]
    pub services: Vec<CreateServiceRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(custom(function = "not_blank", message = "Service type cannot be blank"))]
    pub service_type: String,
    #[validate(custom(function = "non_negative", message = "Selling price cannot be negative"))]
    pub selling_price: Decimal,
    #[serde(default)]
    #[validate(custom(
        function = "percentage_in_range",
        message = "Discount percentage must be between 0 and 100"
    ))]
    pub discount_percentage: Decimal,
    #[validate(custom(function = "not_blank", message = "Tax id cannot be blank"))]
    pub tax_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(custom(function = "not_blank", message = "Customer name cannot be blank"))]
    pub customer_name: Option<String>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub reference_number: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceListParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl CreateInvoiceRequest {
    /// Convert into the domain input, trimming the free-text fields.
    pub fn into_new_invoice(self) -> NewInvoice {
        NewInvoice {
            invoice_number: self.invoice_number.map(|n| n.trim().to_string()),
            customer_name: self.customer_name.trim().to_string(),
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            reference_number: self.reference_number.map(|r| r.trim().to_string()),
            payment_method: self.payment_method,
            services: self
                .services
                .into_iter()
                .map(CreateServiceRequest::into_new_service)
                .collect(),
        }
    }
}

impl CreateServiceRequest {
    pub fn into_new_service(self) -> NewService {
        NewService {
            service_type: self.service_type.trim().to_string(),
            selling_price: self.selling_price,
            discount_percentage: self.discount_percentage,
            tax_id: self.tax_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub id: String,
    pub service_type: String,
    pub selling_price: Decimal,
    pub discount_percentage: Decimal,
    pub tax_id: String,
    pub tax_name: String,
    pub tax_rate: Decimal,
    pub discounted_price: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub final_price: Decimal,
}

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: service.id,
            service_type: service.service_type,
            selling_price: service.selling_price,
            discount_percentage: service.discount_percentage,
            tax_id: service.tax_id,
            tax_name: service.tax_name,
            tax_rate: service.tax_rate,
            discounted_price: service.discounted_price,
            discount_amount: service.discount_amount,
            tax_amount: service.tax_amount,
            final_price: service.final_price,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub invoice_number: String,
    pub customer_name: String,
    pub invoice_date: String,
    pub due_date: String,
    pub reference_number: Option<String>,
    pub payment_method: PaymentMethod,
    pub services: Vec<ServiceResponse>,
    pub total_amount: Decimal,
    pub total_discount_amount: Decimal,
    pub total_tax_amount: Decimal,
    pub version: i64,
    pub created_utc: String,
    pub updated_utc: String,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            services: invoice
                .services
                .into_iter()
                .map(ServiceResponse::from)
                .collect(),
            invoice_number: invoice.invoice_number,
            customer_name: invoice.customer_name,
            invoice_date: invoice.invoice_date.to_rfc3339(),
            due_date: invoice.due_date.to_rfc3339(),
            reference_number: invoice.reference_number,
            payment_method: invoice.payment_method,
            total_amount: invoice.total_amount,
            total_discount_amount: invoice.total_discount_amount,
            total_tax_amount: invoice.total_tax_amount,
            version: invoice.version,
            created_utc: invoice.created_utc.to_rfc3339(),
            updated_utc: invoice.updated_utc.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

/// One line of the printable document view.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentLine {
    pub service_type: String,
    pub selling_price: Decimal,
    pub discount_percentage: Decimal,
    pub discount_amount: Decimal,
    pub tax_name: String,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub final_price: Decimal,
}

impl From<Service> for DocumentLine {
    fn from(service: Service) -> Self {
        Self {
            service_type: service.service_type,
            selling_price: service.selling_price,
            discount_percentage: service.discount_percentage,
            discount_amount: service.discount_amount,
            tax_name: service.tax_name,
            tax_rate: service.tax_rate,
            tax_amount: service.tax_amount,
            final_price: service.final_price,
        }
    }
}

/// Self-contained projection of an invoice for document rendering. Every
/// line already carries its tax snapshot, so no further lookups are
/// needed to print it.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceDocumentResponse {
    pub invoice_number: String,
    pub customer_name: String,
    pub invoice_date: String,
    pub due_date: String,
    pub reference_number: Option<String>,
    pub payment_method: PaymentMethod,
    pub lines: Vec<DocumentLine>,
    pub total_amount: Decimal,
    pub total_discount_amount: Decimal,
    pub total_tax_amount: Decimal,
    pub generated_utc: String,
}

impl From<Invoice> for InvoiceDocumentResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            lines: invoice
                .services
                .into_iter()
                .map(DocumentLine::from)
                .collect(),
            invoice_number: invoice.invoice_number,
            customer_name: invoice.customer_name,
            invoice_date: invoice.invoice_date.to_rfc3339(),
            due_date: invoice.due_date.to_rfc3339(),
            reference_number: invoice.reference_number,
            payment_method: invoice.payment_method,
            total_amount: invoice.total_amount,
            total_discount_amount: invoice.total_discount_amount,
            total_tax_amount: invoice.total_tax_amount,
            generated_utc: Utc::now().to_rfc3339(),
        }
    }
}
