pub mod aggregator;
pub mod memory;
pub mod metrics;
pub mod mongo;
pub mod store;

pub use aggregator::InvoiceAggregator;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use mongo::MongoStore;
pub use store::{InvoicePage, InvoiceStore};
