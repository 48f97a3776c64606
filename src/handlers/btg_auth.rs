// src/handlers/btg_auth.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, company::CompanyContext},
    models::integration::TokenStatus,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuthorizeUrlQuery {
    pub redirect_uri: String,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizeUrlResponse {
    pub url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthCallbackPayload {
    #[validate(length(min = 1, message = "O código de autorização é obrigatório."))]
    pub code: String,

    #[validate(url(message = "URL inválida"))]
    #[schema(example = "https://app.wgeasy.com.br/financeiro/btg/callback")]
    pub redirect_uri: String,
}

#[utoipa::path(
    get,
    path = "/api/btg/auth/authorize-url",
    tag = "BTG Auth",
    params(
        AuthorizeUrlQuery,
        ("x-company-id" = Uuid, Header, description = "ID da Empresa")
    ),
    responses(
        (status = 200, description = "URL de consentimento do BTG", body = AuthorizeUrlResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn authorize_url(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Query(query): Query<AuthorizeUrlQuery>,
) -> Result<impl IntoResponse, AppError> {
    // Sem `state` explícito, usamos a empresa para amarrar o callback
    let state = query.state.unwrap_or_else(|| company.0.to_string());
    let url = app_state
        .token_service
        .authorization_url(&query.redirect_uri, &state)?;

    Ok((StatusCode::OK, Json(AuthorizeUrlResponse { url })))
}

#[utoipa::path(
    post,
    path = "/api/btg/auth/callback",
    tag = "BTG Auth",
    request_body = AuthCallbackPayload,
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 201, description = "Empresa conectada ao BTG", body = TokenStatus),
        (status = 401, description = "Código rejeitado pelo BTG")
    ),
    security(("api_jwt" = []))
)]
pub async fn callback(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
    Json(payload): Json<AuthCallbackPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let status = app_state
        .token_service
        .exchange_code(company.0, &payload.code, &payload.redirect_uri)
        .await?;

    Ok((StatusCode::CREATED, Json(status)))
}

#[utoipa::path(
    get,
    path = "/api/btg/auth/status",
    tag = "BTG Auth",
    params(("x-company-id" = Uuid, Header, description = "ID da Empresa")),
    responses(
        (status = 200, description = "Situação do token (sem os segredos)", body = TokenStatus),
        (status = 404, description = "Empresa ainda não conectada")
    ),
    security(("api_jwt" = []))
)]
pub async fn token_status(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    company: CompanyContext,
) -> Result<impl IntoResponse, AppError> {
    let status = app_state.token_service.status(company.0).await?;
    Ok((StatusCode::OK, Json(status)))
}
