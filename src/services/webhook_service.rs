// src/services/webhook_service.rs
//
// Recebe os webhooks do BTG, grava no log e concilia com cobranças e
// pagamentos pela tabela fixa de eventos.

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BillingStore, PaymentStore, WebhookLogStore},
    models::{
        billing::{BillingStatus, BillingTransition},
        payment::{PaymentStatus, PaymentTransition},
        webhook::{event_name_of, WebhookAction, WebhookEnvelope, WebhookEvent, WebhookEventFilter},
    },
};

type HmacSha256 = Hmac<Sha256>;

pub const NO_MATCHING_RECORD: &str = "no matching record";

// Eventos por rodada de reprocessamento
const SWEEP_BATCH: i64 = 100;

/// Resultado da conciliação de um evento.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Applied,
    // Alvo igual ao status atual: nada a escrever
    Replayed,
    Rejected(String),
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub scanned: usize,
    pub processed: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct WebhookService {
    log: Arc<dyn WebhookLogStore>,
    billings: Arc<dyn BillingStore>,
    payments: Arc<dyn PaymentStore>,
    secret: Option<String>,
    max_attempts: i32,
}

impl WebhookService {
    pub fn new(
        log: Arc<dyn WebhookLogStore>,
        billings: Arc<dyn BillingStore>,
        payments: Arc<dyn PaymentStore>,
        secret: Option<String>,
        max_attempts: i32,
    ) -> Self {
        Self {
            log,
            billings,
            payments,
            secret: secret.filter(|s| !s.is_empty()),
            max_attempts,
        }
    }

    /// HMAC-SHA256 (hex) do corpo bruto. Sem segredo configurado, não valida.
    pub fn verify_signature(&self, body: &[u8], signature: Option<&str>) -> Result<(), AppError> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };

        let provided = signature
            .map(|s| s.trim().trim_start_matches("sha256="))
            .and_then(|s| hex::decode(s).ok())
            .ok_or(AppError::InvalidWebhookSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e.to_string())))?;
        mac.update(body);
        mac.verify_slice(&provided)
            .map_err(|_| AppError::InvalidWebhookSignature)
    }

    /// Grava o corpo recebido e tenta conciliar. Erros de conciliação ficam
    /// registrados no evento; só falha se não conseguir gravar.
    pub async fn ingest(&self, body: &[u8]) -> Result<WebhookEvent, AppError> {
        // Corpo que nem é JSON também é guardado, como string
        let payload = serde_json::from_slice::<serde_json::Value>(body)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()));
        let event_name = event_name_of(&payload).unwrap_or("unknown").to_string();

        let event = self.log.append(&event_name, &payload).await?;
        tracing::info!("📨 Webhook {} recebido ({})", event.id, event.event_name);

        if let Err(e) = self.process(&event).await {
            tracing::error!("🔥 Erro ao processar webhook {}: {:?}", event.id, e);
        }

        // O evento já está gravado: a releitura é só para devolver o estado final
        match self.log.find_by_id(event.id).await {
            Ok(Some(current)) => Ok(current),
            Ok(None) => Ok(event),
            Err(e) => {
                tracing::warn!("⚠️ Não foi possível reler o webhook {}: {:?}", event.id, e);
                Ok(event)
            }
        }
    }

    pub async fn process(&self, event: &WebhookEvent) -> Result<Reconciliation, AppError> {
        let outcome = self.reconcile(&event.payload).await?;

        match &outcome {
            Reconciliation::Applied | Reconciliation::Replayed => {
                self.log.mark_processed(event.id).await?;
            }
            Reconciliation::Rejected(reason) => {
                tracing::warn!("⚠️ Webhook {} não aplicado: {}", event.id, reason);
                self.log.record_failure(event.id, reason).await?;
            }
        }
        Ok(outcome)
    }

    async fn reconcile(&self, payload: &serde_json::Value) -> Result<Reconciliation, AppError> {
        let envelope = match serde_json::from_value::<WebhookEnvelope>(payload.clone()) {
            Ok(envelope) => envelope,
            Err(e) => return Ok(Reconciliation::Rejected(format!("malformed payload: {e}"))),
        };

        let Some(action) = WebhookAction::for_event(&envelope.event) else {
            return Ok(Reconciliation::Rejected(format!("unknown event {}", envelope.event)));
        };
        let Some(reference) = envelope.data.reference() else {
            return Ok(Reconciliation::Rejected("malformed payload: missing data.id".to_string()));
        };

        match action {
            WebhookAction::Billing(target) => {
                self.apply_to_billing(&envelope, reference, payload, target).await
            }
            WebhookAction::Payment(target) => {
                self.apply_to_payment(&envelope, reference, payload, target).await
            }
            WebhookAction::PaymentAuthorized => {
                self.authorize_payment(&envelope, reference, payload).await
            }
        }
    }

    async fn apply_to_billing(
        &self,
        envelope: &WebhookEnvelope,
        reference: &str,
        payload: &serde_json::Value,
        target: BillingStatus,
    ) -> Result<Reconciliation, AppError> {
        let Some(billing) = self.billings.find_by_external_id(reference).await? else {
            return Ok(Reconciliation::Rejected(NO_MATCHING_RECORD.to_string()));
        };

        if billing.status == target {
            return Ok(Reconciliation::Replayed);
        }
        if !billing.status.can_transition_to(target) {
            return Ok(Reconciliation::Rejected(
                AppError::invalid_transition(billing.status, target).to_string(),
            ));
        }

        let mut change = BillingTransition {
            webhook_data: Some(payload.clone()),
            ..BillingTransition::to(target)
        };
        if target == BillingStatus::Paid {
            change.paid_at = envelope.settlement_time();
            change.paid_amount = envelope.settled_amount();
        }

        match self.billings.transition(billing.id, billing.status, &change).await? {
            Some(updated) => {
                tracing::info!("💰 Cobrança {} → {}", updated.id, updated.status);
                Ok(Reconciliation::Applied)
            }
            None => Ok(Reconciliation::Rejected(format!(
                "concurrent update on billing {}",
                billing.id
            ))),
        }
    }

    async fn apply_to_payment(
        &self,
        envelope: &WebhookEnvelope,
        reference: &str,
        payload: &serde_json::Value,
        target: PaymentStatus,
    ) -> Result<Reconciliation, AppError> {
        let Some(payment) = self.payments.find_by_external_id(reference).await? else {
            return Ok(Reconciliation::Rejected(NO_MATCHING_RECORD.to_string()));
        };

        if payment.status == target {
            return Ok(Reconciliation::Replayed);
        }
        if !payment.status.can_transition_to(target) {
            return Ok(Reconciliation::Rejected(
                AppError::invalid_transition(payment.status, target).to_string(),
            ));
        }

        let mut change = PaymentTransition {
            webhook_data: Some(payload.clone()),
            ..PaymentTransition::to(target)
        };
        match target {
            PaymentStatus::Executed => {
                change.executed_at = envelope.settlement_time();
                change.receipt_url = envelope.data.receipt_url.clone();
            }
            PaymentStatus::Failed => {
                change.failure_reason = envelope
                    .data
                    .failure_reason
                    .clone()
                    .or_else(|| Some(envelope.event.clone()));
            }
            _ => {}
        }

        match self.payments.transition(payment.id, payment.status, &change).await? {
            Some(updated) => {
                tracing::info!("🏦 Pagamento {} → {}", updated.id, updated.status);
                Ok(Reconciliation::Applied)
            }
            None => Ok(Reconciliation::Rejected(format!(
                "concurrent update on payment {}",
                payment.id
            ))),
        }
    }

    /// Autorização do pagamento no internet banking do BTG. Carimba quem e
    /// quando aprovou; um pagamento ainda PENDING passa a APPROVED.
    async fn authorize_payment(
        &self,
        envelope: &WebhookEnvelope,
        reference: &str,
        payload: &serde_json::Value,
    ) -> Result<Reconciliation, AppError> {
        let Some(payment) = self.payments.find_by_external_id(reference).await? else {
            return Ok(Reconciliation::Rejected(NO_MATCHING_RECORD.to_string()));
        };

        if payment.bank_approved_at.is_some() {
            return Ok(Reconciliation::Replayed);
        }

        let target = match payment.status {
            PaymentStatus::Pending => PaymentStatus::Approved,
            PaymentStatus::Cancelled => {
                return Ok(Reconciliation::Rejected(
                    AppError::invalid_transition(payment.status, PaymentStatus::Approved).to_string(),
                ));
            }
            status => status,
        };

        let approved_at = envelope
            .data
            .approved_at
            .or(envelope.timestamp)
            .unwrap_or_else(Utc::now);
        let change = PaymentTransition {
            bank_approved_at: Some(approved_at),
            bank_approved_by: envelope.data.approved_by.clone(),
            approved_at: (payment.status == PaymentStatus::Pending).then_some(approved_at),
            webhook_data: Some(payload.clone()),
            ..PaymentTransition::to(target)
        };

        match self.payments.transition(payment.id, payment.status, &change).await? {
            Some(updated) => {
                tracing::info!(
                    "🔏 Pagamento {} autorizado no BTG ({})",
                    updated.id,
                    updated.bank_approved_by.as_deref().unwrap_or("aprovador não informado")
                );
                Ok(Reconciliation::Applied)
            }
            None => Ok(Reconciliation::Rejected(format!(
                "concurrent update on payment {}",
                payment.id
            ))),
        }
    }

    /// Reprocessa pendentes com menos de `max_attempts` tentativas.
    pub async fn sweep(&self) -> Result<SweepReport, AppError> {
        let pending = self.log.list_retryable(self.max_attempts, SWEEP_BATCH).await?;
        let mut report = SweepReport {
            scanned: pending.len(),
            ..Default::default()
        };

        for event in &pending {
            match self.process(event).await {
                Ok(Reconciliation::Applied | Reconciliation::Replayed) => report.processed += 1,
                Ok(Reconciliation::Rejected(_)) => report.failed += 1,
                Err(e) => {
                    tracing::error!("🔥 Erro ao reprocessar webhook {}: {:?}", event.id, e);
                    report.failed += 1;
                }
            }
        }

        if report.scanned > 0 {
            tracing::info!(
                "🧹 Varredura de webhooks: {} lidos, {} processados, {} pendentes",
                report.scanned,
                report.processed,
                report.failed
            );
        }
        Ok(report)
    }

    pub async fn list(&self, filter: &WebhookEventFilter) -> Result<Vec<WebhookEvent>, AppError> {
        self.log.list(filter).await
    }

    /// Reprocessa um evento a pedido do operador. Aqui a rejeição volta
    /// como erro, já que não há BTG esperando resposta.
    pub async fn reprocess(&self, id: Uuid) -> Result<WebhookEvent, AppError> {
        let event = self
            .log
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Evento {id}")))?;

        if event.processed {
            return Ok(event);
        }

        if let Reconciliation::Rejected(reason) = self.process(&event).await? {
            return Err(AppError::WebhookProcessing(reason));
        }

        self.log
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Evento {id}")))
    }
}
