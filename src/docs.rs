// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- BTG Auth ---
        handlers::btg_auth::authorize_url,
        handlers::btg_auth::callback,
        handlers::btg_auth::token_status,

        // --- Config ---
        handlers::integration::get_config,
        handlers::integration::update_config,

        // --- Accounts ---
        handlers::accounts::companies,
        handlers::accounts::balance,
        handlers::accounts::statements,

        // --- Billings ---
        handlers::billing::create_billing,
        handlers::billing::list_billings,
        handlers::billing::get_billing,
        handlers::billing::cancel_billing,

        // --- Payments ---
        handlers::payments::create_payment,
        handlers::payments::list_payments,
        handlers::payments::get_payment,
        handlers::payments::approve_payment,
        handlers::payments::execute_payment,
        handlers::payments::cancel_payment,
        handlers::payments::sync_payment,

        // --- Webhooks ---
        handlers::webhooks::receive_webhook,
        handlers::webhooks::list_events,
        handlers::webhooks::reprocess_event,
        handlers::webhooks::sweep,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::integration::TokenStatus,
            handlers::btg_auth::AuthorizeUrlResponse,
            handlers::btg_auth::AuthCallbackPayload,

            // --- Config ---
            models::integration::IntegrationConfig,
            models::integration::UpsertIntegrationConfig,

            // --- Billings ---
            models::billing::BillingKind,
            models::billing::BillingStatus,
            models::billing::Billing,
            models::billing::Payer,
            models::billing::PayerAddress,
            models::billing::LateFine,
            models::billing::DailyInterest,
            models::billing::CreateBillingPayload,

            // --- Payments ---
            models::payment::PaymentKind,
            models::payment::PaymentStatus,
            models::payment::PixKeyType,
            models::payment::AccountType,
            models::payment::PayeeBankDetails,
            models::payment::Payment,
            models::payment::CreatePaymentPayload,

            // --- Webhooks ---
            models::webhook::WebhookEvent,
            handlers::webhooks::WebhookAck,
            services::webhook_service::SweepReport,
        )
    ),
    tags(
        (name = "BTG Auth", description = "Conexão OAuth2 da empresa com o BTG"),
        (name = "BTG Config", description = "Configuração da integração"),
        (name = "BTG Accounts", description = "Saldo e extrato"),
        (name = "BTG Billings", description = "Cobranças (boleto e PIX)"),
        (name = "BTG Payments", description = "Pagamentos a fornecedores"),
        (name = "BTG Webhooks", description = "Eventos recebidos do BTG e conciliação")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
