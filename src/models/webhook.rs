// src/models/webhook.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{billing::BillingStatus, payment::PaymentStatus};

// Linha do log append-only `btg_webhook_logs`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub id: Uuid,

    #[schema(example = "bank-slips.paid")]
    pub event_name: String,

    // Corpo recebido, sem interpretação
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,

    pub processed: bool,

    #[schema(example = "no matching record")]
    pub error_message: Option<String>,

    pub attempts: i32,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WebhookEventFilter {
    pub processed: Option<bool>,
    pub limit: Option<i64>,
}

// --- Payload do BTG ---

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    // O BTG manda `id`; alguns eventos só trazem `externalId`
    pub id: Option<String>,
    pub external_id: Option<String>,
    pub amount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub settled_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub receipt_url: Option<String>,
    #[serde(alias = "reason")]
    pub failure_reason: Option<String>,

    // payments.approval-authorized
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(alias = "approver")]
    pub approved_by: Option<String>,
}

impl WebhookData {
    /// Referência do BTG: `id`, senão `externalId`. Vazio conta como ausente.
    pub fn reference(&self) -> Option<&str> {
        self.id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| self.external_id.as_deref().filter(|id| !id.trim().is_empty()))
    }
}

impl WebhookEnvelope {
    /// Momento da liquidação: o do payload, senão o timestamp do evento.
    pub fn settlement_time(&self) -> Option<DateTime<Utc>> {
        self.data
            .settled_at
            .or(self.data.paid_at)
            .or(self.data.executed_at)
            .or(self.timestamp)
    }

    pub fn settled_amount(&self) -> Option<Decimal> {
        self.data.paid_amount.or(self.data.amount)
    }
}

// Nome do evento extraído sem exigir o payload completo
pub fn event_name_of(payload: &serde_json::Value) -> Option<&str> {
    payload.get("event").and_then(|v| v.as_str())
}

/// O que um evento pede: mover uma cobrança ou um pagamento para um status,
/// ou registrar a autorização do pagamento no banco.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAction {
    Billing(BillingStatus),
    Payment(PaymentStatus),
    PaymentAuthorized,
}

impl WebhookAction {
    // Tabela fixa de eventos. Inclui os nomes do BTG e os aliases em português.
    pub fn for_event(event: &str) -> Option<Self> {
        let action = match event {
            "bank-slips.created" | "bank-slips.registered" | "cobranca.registrada" => {
                WebhookAction::Billing(BillingStatus::Registered)
            }
            "bank-slips.paid" | "instant-collections.paid" | "cobranca.pago" => {
                WebhookAction::Billing(BillingStatus::Paid)
            }
            "bank-slips.expired" | "cobranca.vencida" => {
                WebhookAction::Billing(BillingStatus::Expired)
            }
            "bank-slips.canceled" | "cobranca.cancelado" | "cancelado" => {
                WebhookAction::Billing(BillingStatus::Cancelled)
            }
            "bank-slips.failed" | "cobranca.falhou" => WebhookAction::Billing(BillingStatus::Failed),
            "payments.approval-authorized" | "pagamento.autorizado" => {
                WebhookAction::PaymentAuthorized
            }
            "payments.confirmed"
            | "payments.processed"
            | "transfers.success"
            | "transfers.confirmed"
            | "pagamento.executado" => WebhookAction::Payment(PaymentStatus::Executed),
            "payments.failed" | "transfers.failed" | "pagamento.falhou" => {
                WebhookAction::Payment(PaymentStatus::Failed)
            }
            "payments.canceled"
            | "payments.approval-cancelled"
            | "transfers.canceled"
            | "pagamento.cancelado" => WebhookAction::Payment(PaymentStatus::Cancelled),
            _ => return None,
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_btg_and_local_event_names() {
        assert_eq!(
            WebhookAction::for_event("cobranca.pago"),
            Some(WebhookAction::Billing(BillingStatus::Paid))
        );
        assert_eq!(
            WebhookAction::for_event("instant-collections.paid"),
            Some(WebhookAction::Billing(BillingStatus::Paid))
        );
        assert_eq!(
            WebhookAction::for_event("cancelado"),
            Some(WebhookAction::Billing(BillingStatus::Cancelled))
        );
        assert_eq!(
            WebhookAction::for_event("transfers.success"),
            Some(WebhookAction::Payment(PaymentStatus::Executed))
        );
        assert_eq!(
            WebhookAction::for_event("bank-slips.failed"),
            Some(WebhookAction::Billing(BillingStatus::Failed))
        );
        assert_eq!(
            WebhookAction::for_event("payments.approval-authorized"),
            Some(WebhookAction::PaymentAuthorized)
        );
        assert_eq!(WebhookAction::for_event("automatic-pix.canceled"), None);
    }

    #[test]
    fn envelope_accepts_external_id_alias() {
        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "cobranca.pago",
            "timestamp": "2026-10-01T12:00:00Z",
            "data": { "externalId": "BOL123", "amount": 1500.00 }
        }))
        .unwrap();

        assert_eq!(envelope.data.reference(), Some("BOL123"));
        assert_eq!(envelope.settled_amount(), Some(Decimal::new(150000, 2)));
        assert_eq!(
            envelope.settlement_time().unwrap().to_rfc3339(),
            "2026-10-01T12:00:00+00:00"
        );
    }

    #[test]
    fn data_with_both_id_and_external_id_prefers_id() {
        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "bank-slips.paid",
            "data": { "id": "BOL1", "externalId": "BOL2" }
        }))
        .unwrap();
        assert_eq!(envelope.data.reference(), Some("BOL1"));

        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "bank-slips.paid",
            "data": { "id": "", "externalId": "BOL2" }
        }))
        .unwrap();
        assert_eq!(envelope.data.reference(), Some("BOL2"));

        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "bank-slips.paid",
            "data": { "amount": 10 }
        }))
        .unwrap();
        assert_eq!(envelope.data.reference(), None);
    }

    #[test]
    fn settlement_prefers_payload_time_and_paid_amount() {
        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "bank-slips.paid",
            "timestamp": "2026-10-02T08:00:00Z",
            "data": {
                "id": "BOL9",
                "amount": 100.0,
                "paidAmount": 102.5,
                "settledAt": "2026-10-01T23:59:00Z"
            }
        }))
        .unwrap();

        assert_eq!(envelope.settled_amount(), Some(Decimal::new(10250, 2)));
        assert_eq!(
            envelope.settlement_time().unwrap().to_rfc3339(),
            "2026-10-01T23:59:00+00:00"
        );
    }

    #[test]
    fn event_name_is_read_from_raw_json() {
        assert_eq!(event_name_of(&json!({"event": "payments.failed"})), Some("payments.failed"));
        assert_eq!(event_name_of(&json!({"evento": 1})), None);
    }
}
