// src/handlers/integration.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, company::CompanyContext},
    models::integration::{IntegrationConfig, UpsertIntegrationConfig},
};

// GET /api/btg/config
#[utoipa::path(
    get,
    path = "/api/btg/config",
    tag = "BTG Config",
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 200, description = "Configuração da integração", body = IntegrationConfig),
        (status = 412, description = "Integração ainda não configurada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_config(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
) -> Result<impl IntoResponse, AppError> {
    let config = app_state.integration_service.get_config(company.0).await?;
    Ok((StatusCode::OK, Json(config)))
}

// PUT /api/btg/config
#[utoipa::path(
    put,
    path = "/api/btg/config",
    tag = "BTG Config",
    request_body = UpsertIntegrationConfig,
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 200, description = "Configuração gravada", body = IntegrationConfig)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_config(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Json(payload): Json<UpsertIntegrationConfig>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let config = app_state
        .integration_service
        .upsert_config(company.0, &payload)
        .await?;

    Ok((StatusCode::OK, Json(config)))
}
