use crate::dtos::{
    CreateInvoiceRequest, CreateServiceRequest, InvoiceDocumentResponse, InvoiceListParams,
    InvoiceListResponse, InvoiceResponse, UpdateInvoiceRequest,
};
use crate::models::InvoiceChanges;
use crate::services::InvoicePage;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use billing_core::error::AppError;
use billing_core::extract::AppJson;
use validator::Validate;

#[tracing::instrument(skip(state, request))]
pub async fn create_invoice(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    request.validate()?;

    // Totals are derived server-side; anything the caller sent for them
    // never reaches the model.
    let invoice = state
        .aggregator
        .create_invoice(request.into_new_invoice())
        .await?;

    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}

#[tracing::instrument(skip(state))]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoiceListParams>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);

    let (invoices, total) = state
        .aggregator
        .list_invoices(InvoicePage { page, page_size })
        .await?;

    let total_pages = (total as f64 / page_size as f64).ceil() as u64;

    Ok(Json(InvoiceListResponse {
        invoices: invoices.into_iter().map(InvoiceResponse::from).collect(),
        total,
        page,
        page_size,
        total_pages,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.aggregator.get_invoice(&invoice_number).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
    AppJson(request): AppJson<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    request.validate()?;

    let changes = InvoiceChanges {
        customer_name: request.customer_name.map(|n| n.trim().to_string()),
        invoice_date: request.invoice_date,
        due_date: request.due_date,
        reference_number: request.reference_number.map(|r| r.trim().to_string()),
        payment_method: request.payment_method,
    };
    let invoice = state
        .aggregator
        .update_invoice(&invoice_number, changes)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> Result<StatusCode, AppError> {
    state.aggregator.delete_invoice(&invoice_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, request))]
pub async fn add_service(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
    AppJson(request): AppJson<CreateServiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    request.validate()?;

    let invoice = state
        .aggregator
        .add_service(&invoice_number, request.into_new_service())
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

#[tracing::instrument(skip(state))]
pub async fn remove_service(
    State(state): State<AppState>,
    Path((invoice_number, service_id)): Path<(String, String)>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .aggregator
        .remove_service(&invoice_number, &service_id)
        .await?;

    Ok(Json(InvoiceResponse::from(invoice)))
}

/// Printable projection of an invoice. Line data comes entirely from the
/// embedded snapshots, so this works even for taxes edited or deleted
/// after the lines were added.
#[tracing::instrument(skip(state))]
pub async fn invoice_document(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> Result<Json<InvoiceDocumentResponse>, AppError> {
    let invoice = state.aggregator.get_invoice(&invoice_number).await?;
    Ok(Json(InvoiceDocumentResponse::from(invoice)))
}
