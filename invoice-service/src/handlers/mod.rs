pub mod health;
pub mod invoices;
pub mod taxes;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use invoices::{
    add_service, create_invoice, delete_invoice, get_invoice, invoice_document, list_invoices,
    remove_service, update_invoice,
};
pub use taxes::{create_tax, delete_tax, get_tax, list_taxes, update_tax};
