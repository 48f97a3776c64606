// src/handlers/accounts.rs
//
// Consultas de conta repassadas do BTG sem reinterpretação.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, company::CompanyContext},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatementQuery {
    #[param(value_type = String, format = Date, example = "2026-10-01")]
    pub start_date: NaiveDate,
    #[param(value_type = String, format = Date, example = "2026-10-31")]
    pub end_date: NaiveDate,
}

#[utoipa::path(
    get,
    path = "/api/btg/accounts/balance",
    tag = "BTG Accounts",
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 200, description = "Saldo da conta no BTG", body = serde_json::Value)
    ),
    security(("api_jwt" = []))
)]
pub async fn balance(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
) -> Result<impl IntoResponse, AppError> {
    let balance = app_state.integration_service.balance(company.0).await?;
    Ok((StatusCode::OK, Json(balance)))
}

#[utoipa::path(
    get,
    path = "/api/btg/companies",
    tag = "BTG Accounts",
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 200, description = "Empresas acessíveis pelo token no BTG", body = Vec<serde_json::Value>)
    ),
    security(("api_jwt" = []))
)]
pub async fn companies(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
) -> Result<impl IntoResponse, AppError> {
    let companies = app_state.integration_service.companies(company.0).await?;
    Ok((StatusCode::OK, Json(companies)))
}

#[utoipa::path(
    get,
    path = "/api/btg/accounts/statements",
    tag = "BTG Accounts",
    params(
        StatementQuery,
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "Extrato do período", body = serde_json::Value)
    ),
    security(("api_jwt" = []))
)]
pub async fn statements(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Query(query): Query<StatementQuery>,
) -> Result<impl IntoResponse, AppError> {
    let statements = app_state
        .integration_service
        .statements(company.0, query.start_date, query.end_date)
        .await?;

    Ok((StatusCode::OK, Json(statements)))
}
