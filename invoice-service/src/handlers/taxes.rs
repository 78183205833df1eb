use crate::dtos::{CreateTaxRequest, TaxResponse, UpdateTaxRequest};
use crate::models::{Tax, TaxChanges};
use crate::services::InvoiceStore;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use billing_core::error::AppError;
use billing_core::extract::AppJson;
use validator::Validate;

#[tracing::instrument(skip(state, request))]
pub async fn create_tax(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateTaxRequest>,
) -> Result<(StatusCode, Json<TaxResponse>), AppError> {
    request.validate()?;

    let tax = Tax::new(
        request.name.trim().to_string(),
        request.rate,
        request.disabled,
    );
    state.store.insert_tax(&tax).await?;

    tracing::info!(tax_id = %tax.id, name = %tax.name, "Tax created");

    Ok((StatusCode::CREATED, Json(TaxResponse::from(tax))))
}

#[tracing::instrument(skip(state))]
pub async fn list_taxes(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaxResponse>>, AppError> {
    let taxes = state.store.list_taxes().await?;
    Ok(Json(taxes.into_iter().map(TaxResponse::from).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn get_tax(
    State(state): State<AppState>,
    Path(tax_id): Path<String>,
) -> Result<Json<TaxResponse>, AppError> {
    let tax = state
        .store
        .get_tax(&tax_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tax not found")))?;
    Ok(Json(TaxResponse::from(tax)))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_tax(
    State(state): State<AppState>,
    Path(tax_id): Path<String>,
    AppJson(request): AppJson<UpdateTaxRequest>,
) -> Result<Json<TaxResponse>, AppError> {
    request.validate()?;

    let changes = TaxChanges {
        name: request.name.map(|n| n.trim().to_string()),
        rate: request.rate,
        disabled: request.disabled,
    };
    let tax = state
        .store
        .update_tax(&tax_id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tax not found")))?;

    tracing::info!(tax_id = %tax_id, "Tax updated");

    Ok(Json(TaxResponse::from(tax)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_tax(
    State(state): State<AppState>,
    Path(tax_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = state.store.delete_tax(&tax_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Tax not found")));
    }

    tracing::info!(tax_id = %tax_id, "Tax deleted");

    Ok(StatusCode::NO_CONTENT)
}
