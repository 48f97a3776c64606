// src/handlers/webhooks.rs

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::webhook::{WebhookEvent, WebhookEventFilter},
    services::webhook_service::SweepReport,
};

pub const SIGNATURE_HEADER: &str = "x-btg-signature";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    pub event_id: Uuid,
    pub processed: bool,
}

// Rota pública chamada pelo BTG. Responde 200 assim que o evento está gravado;
// falhas de conciliação ficam no log e são reprocessadas pela varredura.
#[utoipa::path(
    post,
    path = "/api/btg/webhooks",
    tag = "BTG Webhooks",
    request_body(content = serde_json::Value, description = "Evento do BTG, gravado sem interpretação"),
    params(("x-btg-signature" = Option<String>, Header, description = "HMAC-SHA256 (hex) do corpo")),
    responses(
        (status = 200, description = "Evento gravado", body = WebhookAck),
        (status = 401, description = "Assinatura inválida")
    )
)]
pub async fn receive_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    app_state.webhook_service.verify_signature(&body, signature)?;

    let event = app_state.webhook_service.ingest(&body).await?;
    let ack = WebhookAck {
        received: true,
        event_id: event.id,
        processed: event.processed,
    };

    Ok((StatusCode::OK, Json(ack)))
}

#[utoipa::path(
    get,
    path = "/api/btg/webhooks/events",
    tag = "BTG Webhooks",
    params(WebhookEventFilter),
    responses(
        (status = 200, description = "Log de webhooks (mais recentes primeiro)", body = Vec<WebhookEvent>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_events(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<WebhookEventFilter>,
) -> Result<impl IntoResponse, AppError> {
    let events = app_state.webhook_service.list(&filter).await?;
    Ok((StatusCode::OK, Json(events)))
}

#[utoipa::path(
    post,
    path = "/api/btg/webhooks/sweep",
    tag = "BTG Webhooks",
    responses(
        (status = 200, description = "Resultado do reprocessamento", body = SweepReport)
    ),
    security(("api_jwt" = []))
)]
pub async fn sweep(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!("🧹 Varredura de webhooks disparada por {}", user.0.id);
    let report = app_state.webhook_service.sweep().await?;
    Ok((StatusCode::OK, Json(report)))
}

#[utoipa::path(
    post,
    path = "/api/btg/webhooks/events/{id}/reprocess",
    tag = "BTG Webhooks",
    params(("id" = Uuid, Path, description = "ID do Evento")),
    responses(
        (status = 200, description = "Evento conciliado", body = WebhookEvent),
        (status = 422, description = "Evento continua sem conciliação")
    ),
    security(("api_jwt" = []))
)]
pub async fn reprocess_event(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event = app_state.webhook_service.reprocess(id).await?;
    Ok((StatusCode::OK, Json(event)))
}
