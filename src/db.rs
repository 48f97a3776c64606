// src/db.rs
//
// Cada tabela do BTG tem um repositório (sqlx/Postgres) atrás de um trait,
// para que os services rodem contra stores em memória nos testes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        billing::{Billing, BillingFilter, BillingStatus, BillingTransition, IssuedBilling, NewBilling},
        integration::{AccessToken, IntegrationConfig, UpsertIntegrationConfig},
        payment::{NewPayment, Payment, PaymentFilter, PaymentStatus, PaymentTransition},
        webhook::{WebhookEvent, WebhookEventFilter},
    },
};

pub mod billing_repo;
pub mod integration_repo;
pub mod membership_repo;
pub mod payment_repo;
pub mod token_repo;
pub mod webhook_repo;

pub use billing_repo::BillingRepository;
pub use integration_repo::IntegrationRepository;
pub use membership_repo::MembershipRepository;
pub use payment_repo::PaymentRepository;
pub use token_repo::TokenRepository;
pub use webhook_repo::WebhookRepository;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn find_by_company(&self, company_id: Uuid) -> Result<Option<AccessToken>, AppError>;

    /// Sobrescreve o token da empresa (uma linha por empresa).
    async fn upsert(&self, token: &AccessToken) -> Result<AccessToken, AppError>;
}

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    async fn find_by_company(&self, company_id: Uuid) -> Result<Option<IntegrationConfig>, AppError>;

    async fn upsert(
        &self,
        company_id: Uuid,
        input: &UpsertIntegrationConfig,
    ) -> Result<IntegrationConfig, AppError>;

    async fn touch_synced(&self, company_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Grava a reserva (status CREATED, sem externalId).
    /// Falha com `DuplicateBilling` se a parcela já tem cobrança em aberto.
    async fn reserve(&self, new: &NewBilling) -> Result<Billing, AppError>;

    async fn attach_issuance(&self, id: Uuid, issued: &IssuedBilling) -> Result<Billing, AppError>;

    /// Libera a reserva quando a emissão no banco falhou.
    async fn release_reservation(&self, id: Uuid) -> Result<(), AppError>;

    async fn find_by_id(&self, company_id: Uuid, id: Uuid) -> Result<Option<Billing>, AppError>;

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Billing>, AppError>;

    async fn find_open_by_installment(
        &self,
        company_id: Uuid,
        installment_id: Uuid,
    ) -> Result<Option<Billing>, AppError>;

    async fn list(&self, company_id: Uuid, filter: &BillingFilter) -> Result<Vec<Billing>, AppError>;

    /// UPDATE condicional: só aplica se o status atual ainda for `expected`.
    /// `None` significa que outro escritor chegou antes.
    async fn transition(
        &self,
        id: Uuid,
        expected: BillingStatus,
        change: &BillingTransition,
    ) -> Result<Option<Billing>, AppError>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, new: &NewPayment) -> Result<Payment, AppError>;

    async fn find_by_id(&self, company_id: Uuid, id: Uuid) -> Result<Option<Payment>, AppError>;

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, AppError>;

    async fn list(&self, company_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError>;

    async fn transition(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        change: &PaymentTransition,
    ) -> Result<Option<Payment>, AppError>;

    /// Grava a referência do BTG sem mexer no status. Não sobrescreve um
    /// `external_id` já gravado.
    async fn attach_reference(
        &self,
        id: Uuid,
        external_id: &str,
        receipt_url: Option<&str>,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// O operador pode agir em nome da empresa?
    async fn is_member(&self, user_id: Uuid, company_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait WebhookLogStore: Send + Sync {
    /// Anexa o evento bruto (processed = false).
    async fn append(&self, event_name: &str, payload: &serde_json::Value) -> Result<WebhookEvent, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, AppError>;

    /// Vira `processed` de false para true. Retorna false se já estava processado.
    async fn mark_processed(&self, id: Uuid) -> Result<bool, AppError>;

    /// Registra o erro e conta a tentativa; o evento continua pendente.
    async fn record_failure(&self, id: Uuid, message: &str) -> Result<(), AppError>;

    async fn list(&self, filter: &WebhookEventFilter) -> Result<Vec<WebhookEvent>, AppError>;

    /// Pendentes com menos de `max_attempts` tentativas, mais antigos primeiro.
    async fn list_retryable(&self, max_attempts: i32, limit: i64) -> Result<Vec<WebhookEvent>, AppError>;
}
