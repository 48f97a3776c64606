// src/handlers/billing.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, company::CompanyContext},
    models::billing::{Billing, BillingFilter, CreateBillingPayload},
};

#[utoipa::path(
    post,
    path = "/api/btg/billings",
    tag = "BTG Billings",
    request_body = CreateBillingPayload,
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 201, description = "Cobrança emitida no BTG", body = Billing),
        (status = 409, description = "A parcela já possui cobrança em aberto"),
        (status = 502, description = "BTG recusou ou não respondeu")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_billing(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    company: CompanyContext,
    Json(payload): Json<CreateBillingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    tracing::debug!("Operador {} emitindo cobrança para a empresa {}", user.0.id, company.0);
    let billing = app_state.billing_service.create(company.0, &payload).await?;

    Ok((StatusCode::CREATED, Json(billing)))
}

#[utoipa::path(
    get,
    path = "/api/btg/billings",
    tag = "BTG Billings",
    params(
        BillingFilter,
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Cobranças da empresa", body = Vec<Billing>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_billings(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Query(filter): Query<BillingFilter>,
) -> Result<impl IntoResponse, AppError> {
    let billings = app_state.billing_service.list(company.0, &filter).await?;
    Ok((StatusCode::OK, Json(billings)))
}

#[utoipa::path(
    get,
    path = "/api/btg/billings/{id}",
    tag = "BTG Billings",
    params(
        ("id" = Uuid, Path, description = "ID da Cobrança"),
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Cobrança", body = Billing),
        (status = 404, description = "Cobrança não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_billing(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let billing = app_state.billing_service.get(company.0, id).await?;
    Ok((StatusCode::OK, Json(billing)))
}

#[utoipa::path(
    post,
    path = "/api/btg/billings/{id}/cancel",
    tag = "BTG Billings",
    params(
        ("id" = Uuid, Path, description = "ID da Cobrança"),
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Cobrança cancelada", body = Billing),
        (status = 409, description = "Status não permite cancelamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_billing(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let billing = app_state.billing_service.cancel(company.0, id).await?;
    Ok((StatusCode::OK, Json(billing)))
}
