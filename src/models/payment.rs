// src/models/payment.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validation::{positive_amount, required_error};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    PixKey,    // PIX por chave
    PixQrCode, // PIX copia e cola
    Ted,       // Transferência TED
    Bankslip,  // Pagamento de boleto
}

impl PaymentKind {
    // Nome do tipo na API do BTG
    pub fn btg_type(self) -> &'static str {
        match self {
            PaymentKind::PixKey => "PIX_KEY",
            PaymentKind::PixQrCode => "PIX_QR_CODE",
            PaymentKind::Ted => "TED",
            PaymentKind::Bankslip => "BANKSLIP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,   // Aguardando aprovação
    Approved,  // Aprovado
    Executing, // Enviado ao banco, aguardando confirmação
    Executed,  // Executado no banco
    Failed,    // Falhou (revisão manual)
    Cancelled, // Cancelado
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Executing => "EXECUTING",
            PaymentStatus::Executed => "EXECUTED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    /// PENDING → APPROVED → EXECUTING → EXECUTED. EXECUTING marca a chamada
    /// ao banco em andamento (ou aceita e ainda não liquidada); dali o
    /// cancelamento só vale depois de cancelado no BTG.
    /// FAILED → EXECUTED cobre a confirmação do banco para uma transferência
    /// cuja chamada local falhou.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Cancelled)
                | (Approved, Executing | Executed | Failed | Cancelled)
                | (Executing, Executed | Failed | Cancelled)
                | (Failed, Executed)
        )
    }

    /// Traduz o status devolvido pelo BTG na criação ou consulta.
    /// Status desconhecido ou ausente fica em EXECUTING até o webhook.
    pub fn from_bank_status(status: Option<&str>) -> PaymentStatus {
        let Some(status) = status else {
            return PaymentStatus::Executing;
        };
        match status.trim().to_ascii_uppercase().as_str() {
            "EXECUTED" | "CONFIRMED" | "COMPLETED" | "PROCESSED" | "SUCCESS" | "PAID" => {
                PaymentStatus::Executed
            }
            "FAILED" | "REJECTED" | "ERROR" => PaymentStatus::Failed,
            "CANCELED" | "CANCELLED" => PaymentStatus::Cancelled,
            _ => PaymentStatus::Executing,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Evp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
}

// Dados bancários do favorecido (JSONB). Cada tipo usa um subconjunto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayeeBankDetails {
    // TED
    #[schema(example = "208")]
    pub bank_code: Option<String>,
    #[schema(example = "0001")]
    pub branch_code: Option<String>,
    #[schema(example = "123456-7")]
    pub account_number: Option<String>,
    pub account_type: Option<AccountType>,

    // PIX_KEY
    #[schema(example = "financeiro@fornecedor.com.br")]
    pub pix_key: Option<String>,
    pub pix_key_type: Option<PixKeyType>,

    // PIX_QR_CODE
    pub emv: Option<String>,

    // BANKSLIP
    pub digitable_line: Option<String>,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,

    #[schema(ignore)]
    pub company_id: Uuid,

    pub expense_id: Option<Uuid>,

    pub kind: PaymentKind,
    pub status: PaymentStatus,

    // Atribuído pelo BTG na execução
    pub external_id: Option<String>,

    #[schema(example = "3200.00")]
    pub amount: Decimal,

    #[schema(example = "Compra de cimento - Requisição 118")]
    pub description: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2026-11-05")]
    pub scheduled_date: Option<NaiveDate>,

    // Aprovação
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,

    // Autorização no internet banking do BTG (webhook)
    pub bank_approved_at: Option<DateTime<Utc>>,
    pub bank_approved_by: Option<String>,

    // Execução
    pub executed_at: Option<DateTime<Utc>>,
    pub receipt_url: Option<String>,
    pub failure_reason: Option<String>,

    // Favorecido
    #[schema(example = "Depósito de Materiais Silva")]
    pub payee_name: String,
    #[schema(example = "12345678000199")]
    pub payee_document: String,
    #[schema(value_type = PayeeBankDetails)]
    pub payee_bank_details: Json<PayeeBankDetails>,

    #[schema(value_type = Option<Object>)]
    pub webhook_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_payment_payload"))]
pub struct CreatePaymentPayload {
    pub expense_id: Option<Uuid>,

    #[schema(example = "TED")]
    pub kind: PaymentKind,

    #[validate(custom(function = "positive_amount"))]
    #[schema(example = "3200.00")]
    pub amount: Decimal,

    #[validate(length(max = 140))]
    pub description: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2026-11-05")]
    pub scheduled_date: Option<NaiveDate>,

    #[validate(length(min = 1, max = 200, message = "required"))]
    pub payee_name: String,

    #[validate(length(min = 11, max = 14, message = "CPF ou CNPJ inválido"))]
    pub payee_document: String,

    #[serde(default)]
    pub payee_bank_details: PayeeBankDetails,
}

fn validate_payment_payload(payload: &CreatePaymentPayload) -> Result<(), ValidationError> {
    let details = &payload.payee_bank_details;
    let complete = match payload.kind {
        PaymentKind::PixKey => details.pix_key.is_some() && details.pix_key_type.is_some(),
        PaymentKind::PixQrCode => details.emv.is_some(),
        PaymentKind::Ted => {
            details.bank_code.is_some()
                && details.branch_code.is_some()
                && details.account_number.is_some()
                && details.account_type.is_some()
        }
        PaymentKind::Bankslip => details.digitable_line.is_some(),
    };

    if complete {
        Ok(())
    } else {
        Err(required_error(
            "incomplete_payee_details",
            "Dados bancários do favorecido incompletos para o tipo de pagamento.",
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaymentFilter {
    pub expense_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub company_id: Uuid,
    pub expense_id: Option<Uuid>,
    pub kind: PaymentKind,
    pub amount: Decimal,
    pub description: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub payee_name: String,
    pub payee_document: String,
    pub payee_bank_details: PayeeBankDetails,
}

// Campos `None` mantêm o valor atual da linha
#[derive(Debug, Clone)]
pub struct PaymentTransition {
    pub status: PaymentStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub bank_approved_at: Option<DateTime<Utc>>,
    pub bank_approved_by: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
    pub external_id: Option<String>,
    pub receipt_url: Option<String>,
    pub failure_reason: Option<String>,
    pub webhook_data: Option<serde_json::Value>,
}

impl PaymentTransition {
    pub fn to(status: PaymentStatus) -> Self {
        Self {
            status,
            approved_by: None,
            approved_at: None,
            bank_approved_at: None,
            bank_approved_by: None,
            executed_at: None,
            external_id: None,
            receipt_url: None,
            failure_reason: None,
            webhook_data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    #[test]
    fn execution_requires_approval() {
        assert!(!Pending.can_transition_to(Executed));
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Executed));
        assert!(Approved.can_transition_to(Failed));
        assert!(Approved.can_transition_to(Executing));
        assert!(Executing.can_transition_to(Executed));
        assert!(Executing.can_transition_to(Failed));
        assert!(!Executing.can_transition_to(Approved));
    }

    #[test]
    fn bank_status_maps_to_local_status() {
        assert_eq!(PaymentStatus::from_bank_status(Some("CONFIRMED")), Executed);
        assert_eq!(PaymentStatus::from_bank_status(Some("executed")), Executed);
        assert_eq!(PaymentStatus::from_bank_status(Some("REJECTED")), Failed);
        assert_eq!(PaymentStatus::from_bank_status(Some("CANCELED")), Cancelled);
        assert_eq!(PaymentStatus::from_bank_status(Some("PROCESSING")), Executing);
        assert_eq!(PaymentStatus::from_bank_status(None), Executing);
    }

    #[test]
    fn cancel_only_before_execution() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Executed.can_transition_to(Cancelled));
        assert!(!Failed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Approved));
    }

    fn ted_payload(details: PayeeBankDetails) -> CreatePaymentPayload {
        CreatePaymentPayload {
            expense_id: None,
            kind: PaymentKind::Ted,
            amount: Decimal::new(320000, 2),
            description: None,
            scheduled_date: None,
            payee_name: "Fornecedor".into(),
            payee_document: "12345678000199".into(),
            payee_bank_details: details,
        }
    }

    #[test]
    fn ted_requires_full_account() {
        let partial = PayeeBankDetails {
            bank_code: Some("208".into()),
            ..Default::default()
        };
        assert!(ted_payload(partial).validate().is_err());

        let full = PayeeBankDetails {
            bank_code: Some("208".into()),
            branch_code: Some("0001".into()),
            account_number: Some("123456-7".into()),
            account_type: Some(AccountType::Checking),
            ..Default::default()
        };
        assert!(ted_payload(full).validate().is_ok());
    }

    #[test]
    fn kind_maps_to_btg_type() {
        assert_eq!(PaymentKind::PixQrCode.btg_type(), "PIX_QR_CODE");
        assert_eq!(
            serde_json::to_value(PaymentKind::Bankslip).unwrap(),
            serde_json::json!("BANKSLIP")
        );
    }
}
