// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn router(app_state: AppState) -> Router {
    // Rotas de operador (JWT do Supabase)
    let auth_routes = Router::new()
        .route("/authorize-url", get(handlers::btg_auth::authorize_url))
        .route("/callback", post(handlers::btg_auth::callback))
        .route("/status", get(handlers::btg_auth::token_status));

    let account_routes = Router::new()
        .route("/balance", get(handlers::accounts::balance))
        .route("/statements", get(handlers::accounts::statements));

    let billing_routes = Router::new()
        .route(
            "/",
            post(handlers::billing::create_billing).get(handlers::billing::list_billings),
        )
        .route("/{id}", get(handlers::billing::get_billing))
        .route("/{id}/cancel", post(handlers::billing::cancel_billing));

    let payment_routes = Router::new()
        .route(
            "/",
            post(handlers::payments::create_payment).get(handlers::payments::list_payments),
        )
        .route("/{id}", get(handlers::payments::get_payment))
        .route("/{id}/approve", post(handlers::payments::approve_payment))
        .route("/{id}/execute", post(handlers::payments::execute_payment))
        .route("/{id}/cancel", post(handlers::payments::cancel_payment))
        .route("/{id}/sync", post(handlers::payments::sync_payment));

    let operator_routes = Router::new()
        .route(
            "/config",
            get(handlers::integration::get_config).put(handlers::integration::update_config),
        )
        .route("/companies", get(handlers::accounts::companies))
        .route("/webhooks/events", get(handlers::webhooks::list_events))
        .route("/webhooks/events/{id}/reprocess", post(handlers::webhooks::reprocess_event))
        .route("/webhooks/sweep", post(handlers::webhooks::sweep))
        .nest("/auth", auth_routes)
        .nest("/accounts", account_routes)
        .nest("/billings", billing_routes)
        .nest("/payments", payment_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Chamado pelo BTG: sem JWT, protegido pela assinatura
    let public_routes = Router::new().route("/webhooks", post(handlers::webhooks::receive_webhook));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/btg", operator_routes.merge(public_routes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
