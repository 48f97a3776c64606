// src/handlers/payments.rs

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
    models::payment::{CreatePaymentPayload, Payment, PaymentFilter},
};

#[utoipa::path(
    post,
    path = "/api/btg/payments",
    tag = "BTG Payments",
    request_body = CreatePaymentPayload,
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 201, description = "Pagamento criado (aguardando aprovação)", body = Payment)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_payment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let payment = app_state.payment_service.create(company.0, payload).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/api/btg/payments",
    tag = "BTG Payments",
    params(
        PaymentFilter,
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Pagamentos da empresa", body = Vec<Payment>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Query(filter): Query<PaymentFilter>,
) -> Result<impl IntoResponse, AppError> {
    let payments = app_state.payment_service.list(company.0, &filter).await?;
    Ok((StatusCode::OK, Json(payments)))
}

#[utoipa::path(
    get,
    path = "/api/btg/payments/{id}",
    tag = "BTG Payments",
    params(
        ("id" = Uuid, Path, description = "ID do Pagamento"),
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Pagamento", body = Payment),
        (status = 404, description = "Pagamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state.payment_service.get(company.0, id).await?;
    Ok((StatusCode::OK, Json(payment)))
}

// O aprovador é o operador autenticado
#[utoipa::path(
    post,
    path = "/api/btg/payments/{id}/approve",
    tag = "BTG Payments",
    params(
        ("id" = Uuid, Path, description = "ID do Pagamento"),
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Pagamento aprovado", body = Payment),
        (status = 409, description = "Pagamento não está pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_payment(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    company: CompanyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state
        .payment_service
        .approve(company.0, id, user.0.id)
        .await?;

    Ok((StatusCode::OK, Json(payment)))
}

#[utoipa::path(
    post,
    path = "/api/btg/payments/{id}/execute",
    tag = "BTG Payments",
    params(
        ("id" = Uuid, Path, description = "ID do Pagamento"),
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Pagamento enviado ao BTG (EXECUTED ou EXECUTING)", body = Payment),
        (status = 409, description = "Pagamento não está aprovado ou já está em execução"),
        (status = 502, description = "BTG recusou; pagamento marcado como FAILED")
    ),
    security(("api_jwt" = []))
)]
pub async fn execute_payment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state.payment_service.execute(company.0, id).await?;
    Ok((StatusCode::OK, Json(payment)))
}

#[utoipa::path(
    post,
    path = "/api/btg/payments/{id}/cancel",
    tag = "BTG Payments",
    params(
        ("id" = Uuid, Path, description = "ID do Pagamento"),
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Pagamento cancelado", body = Payment),
        (status = 409, description = "Pagamento já executado ou cancelado"),
        (status = 502, description = "BTG recusou o cancelamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_payment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state.payment_service.cancel(company.0, id).await?;
    Ok((StatusCode::OK, Json(payment)))
}

// Traz o status atual do BTG
#[utoipa::path(
    post,
    path = "/api/btg/payments/{id}/sync",
    tag = "BTG Payments",
    params(
        ("id" = Uuid, Path, description = "ID do Pagamento"),
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Pagamento com o status do BTG aplicado", body = Payment),
        (status = 400, description = "Pagamento ainda não foi enviado ao BTG")
    ),
    security(("api_jwt" = []))
)]
pub async fn sync_payment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let payment = app_state.payment_service.sync(company.0, id).await?;
    Ok((StatusCode::OK, Json(payment)))
}
