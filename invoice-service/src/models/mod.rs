//! Domain models for invoice-service.

mod invoice;
mod service;
mod tax;

pub use invoice::{Invoice, InvoiceChanges, NewInvoice, PaymentMethod};
pub use service::{NewService, Service};
pub use tax::{Tax, TaxChanges};
