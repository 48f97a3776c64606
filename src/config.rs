// src/config.rs

use std::{env, str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::PgPool;

use crate::{
    db::{
        BillingRepository, BillingStore, IntegrationRepository, IntegrationStore,
        MembershipRepository, MembershipStore, PaymentRepository, PaymentStore, TokenRepository,
        TokenStore, WebhookLogStore, WebhookRepository,
    },
    services::{
        auth::AuthService, billing_service::BillingService, btg_client::BankGateway,
        integration_service::IntegrationService, payment_service::PaymentService,
        token_service::TokenService, webhook_service::WebhookService,
    },
};

const DEFAULT_API_URL: &str = "https://api.empresas.btgpactual.com";
const DEFAULT_SANDBOX_URL: &str = "https://api.sandbox.empresas.btgpactual.com";
const DEFAULT_AUTH_URL: &str = "https://id.btgpactual.com";
const DEFAULT_SCOPES: &str = "openid profile payments transfers bank-slips pix accounts statements";

#[derive(Debug, Clone)]
pub struct BtgSettings {
    pub client_id: String,
    pub client_secret: String,
    pub api_url: String,
    pub auth_url: String,
    // Vazio = validação de assinatura desligada
    pub webhook_secret: Option<String>,
    pub scopes: Vec<String>,
    pub http_timeout_secs: u64,
    pub token_safety_margin_secs: i64,
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub sweep_interval_secs: u64,
    pub max_attempts: i32,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub supabase_jwt_secret: String,
    pub bind_addr: String,
    pub btg: BtgSettings,
    pub webhook: WebhookSettings,
}

impl Settings {
    // Lê o .env (se existir) e as variáveis de ambiente
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let use_sandbox = env::var("BTG_USE_SANDBOX").map(|v| v == "true").unwrap_or(false);
        let api_url = if use_sandbox {
            optional("BTG_SANDBOX_URL").unwrap_or_else(|| DEFAULT_SANDBOX_URL.to_string())
        } else {
            optional("BTG_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string())
        };

        let btg = BtgSettings {
            client_id: required("BTG_CLIENT_ID")?,
            client_secret: required("BTG_CLIENT_SECRET")?,
            api_url,
            auth_url: optional("BTG_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            webhook_secret: optional("BTG_WEBHOOK_SECRET"),
            scopes: DEFAULT_SCOPES.split_whitespace().map(String::from).collect(),
            http_timeout_secs: parsed("BTG_HTTP_TIMEOUT_SECS", 30)?,
            token_safety_margin_secs: parsed("BTG_TOKEN_SAFETY_MARGIN_SECS", 60)?,
        };

        let webhook = WebhookSettings {
            sweep_interval_secs: parsed("WEBHOOK_SWEEP_INTERVAL_SECS", 300)?,
            max_attempts: parsed("WEBHOOK_MAX_ATTEMPTS", 10)?,
        };

        if use_sandbox {
            tracing::info!("🧪 BTG em modo sandbox: {}", btg.api_url);
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            btg,
            webhook,
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{name} deve ser definida"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} inválida ({raw}): {e}")),
        None => Ok(default),
    }
}

// Stores usados pelos services. Em produção, os repositórios Postgres.
#[derive(Clone)]
pub struct Stores {
    pub tokens: Arc<dyn TokenStore>,
    pub integrations: Arc<dyn IntegrationStore>,
    pub billings: Arc<dyn BillingStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub webhooks: Arc<dyn WebhookLogStore>,
    pub memberships: Arc<dyn MembershipStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            tokens: Arc::new(TokenRepository::new(pool.clone())),
            integrations: Arc::new(IntegrationRepository::new(pool.clone())),
            billings: Arc::new(BillingRepository::new(pool.clone())),
            payments: Arc::new(PaymentRepository::new(pool.clone())),
            webhooks: Arc::new(WebhookRepository::new(pool.clone())),
            memberships: Arc::new(MembershipRepository::new(pool)),
        }
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub token_service: TokenService,
    pub integration_service: IntegrationService,
    pub billing_service: BillingService,
    pub payment_service: PaymentService,
    pub webhook_service: WebhookService,
    // Vínculo operador ↔ empresa, consultado pelo extrator `CompanyContext`
    pub memberships: Arc<dyn MembershipStore>,
}

impl AppState {
    // --- Monta o gráfico de dependências ---
    pub fn new(settings: &Settings, stores: Stores, gateway: Arc<dyn BankGateway>) -> Self {
        let auth_service = AuthService::new(settings.supabase_jwt_secret.clone());

        let token_service = TokenService::new(
            stores.tokens.clone(),
            gateway.clone(),
            settings.btg.token_safety_margin_secs,
        );

        let integration_service = IntegrationService::new(
            stores.integrations.clone(),
            token_service.clone(),
            gateway.clone(),
        );

        let billing_service = BillingService::new(
            stores.billings.clone(),
            integration_service.clone(),
            token_service.clone(),
            gateway.clone(),
        );

        let payment_service = PaymentService::new(
            stores.payments.clone(),
            integration_service.clone(),
            token_service.clone(),
            gateway,
        );

        let webhook_service = WebhookService::new(
            stores.webhooks,
            stores.billings,
            stores.payments,
            settings.btg.webhook_secret.clone(),
            settings.webhook.max_attempts,
        );

        Self {
            auth_service,
            token_service,
            integration_service,
            billing_service,
            payment_service,
            webhook_service,
            memberships: stores.memberships,
        }
    }
}
