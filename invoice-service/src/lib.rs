//! Invoice and tax management service.
//!
//! Invoices embed their service lines; each line carries a snapshot of the
//! tax it was valued with, and the invoice keeps running totals that are
//! updated in the same write as the lines themselves.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod services;
pub mod startup;
