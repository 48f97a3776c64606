// src/middleware/company.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::auth::User};

// Empresa (tenant) em nome da qual o operador age
pub const COMPANY_ID_HEADER: &str = "x-company-id";

#[derive(Debug, Clone, Copy)]
pub struct CompanyContext(pub Uuid);

impl<S> FromRequestParts<S> for CompanyContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(COMPANY_ID_HEADER)
            .ok_or_else(|| AppError::BadRequest("O cabeçalho X-Company-ID é obrigatório.".into()))?;

        let raw = value.to_str().map_err(|_| {
            AppError::BadRequest("Cabeçalho X-Company-ID contém caracteres inválidos.".into())
        })?;

        let company_id = Uuid::parse_str(raw)
            .map_err(|_| AppError::BadRequest("Cabeçalho X-Company-ID inválido (não é um UUID).".into()))?;

        // Inserido pelo auth_guard
        let user = parts.extensions.get::<User>().ok_or(AppError::InvalidToken)?;

        let app_state = AppState::from_ref(state);
        if !app_state.memberships.is_member(user.id, company_id).await? {
            tracing::warn!("🚫 Operador {} sem vínculo com a empresa {}", user.id, company_id);
            return Err(AppError::Forbidden(
                "Operador sem acesso a esta empresa.".to_string(),
            ));
        }

        Ok(CompanyContext(company_id))
    }
}
