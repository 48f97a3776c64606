// src/models/billing.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::validation::{positive_amount, required_error};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "billing_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingKind {
    Boleto,
    Pix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "billing_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingStatus {
    Created,    // Emitida
    Registered, // Registrada no banco
    Paid,       // Paga
    Expired,    // Vencida
    Failed,     // Recusada pelo banco
    Cancelled,  // Cancelada
}

impl BillingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BillingStatus::Created => "CREATED",
            BillingStatus::Registered => "REGISTERED",
            BillingStatus::Paid => "PAID",
            BillingStatus::Expired => "EXPIRED",
            BillingStatus::Failed => "FAILED",
            BillingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Tabela de transições. Só avança; CANCELLED é terminal e alcançável de
    /// qualquer estado não terminal. PAID e FAILED também são terminais.
    pub fn can_transition_to(self, next: BillingStatus) -> bool {
        use BillingStatus::*;
        matches!(
            (self, next),
            (Created, Registered | Paid | Expired | Failed | Cancelled)
                | (Registered, Paid | Expired | Failed | Cancelled)
                | (Expired, Paid | Cancelled)
        )
    }

    /// Enquanto existir cobrança nesses estados, a parcela não recebe outra.
    pub fn blocks_new_billing(self) -> bool {
        matches!(
            self,
            BillingStatus::Created | BillingStatus::Registered | BillingStatus::Paid
        )
    }
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    pub id: Uuid,

    #[schema(ignore)]
    pub company_id: Uuid,

    // Vínculos
    pub contract_id: Option<Uuid>,
    pub installment_id: Option<Uuid>,

    pub kind: BillingKind,
    pub status: BillingStatus,

    // Atribuído pelo BTG; nulo só enquanto a emissão está em andamento
    #[schema(example = "BOL123")]
    pub external_id: Option<String>,

    #[schema(example = "1500.00")]
    pub amount: Decimal,

    #[schema(value_type = Option<String>, format = Date, example = "2026-11-10")]
    pub due_date: Option<NaiveDate>,

    // Artefatos de pagamento
    pub digitable_line: Option<String>,
    pub barcode: Option<String>,
    pub emv: Option<String>,
    pub qr_code_image: Option<String>,

    // Liquidação (preenchida pelo webhook)
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_amount: Option<Decimal>,

    #[schema(value_type = Option<Object>)]
    pub webhook_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Construtora Exemplo Ltda")]
    pub name: String,

    #[validate(length(min = 11, max = 14, message = "CPF ou CNPJ inválido"))]
    #[schema(example = "12345678000199")]
    pub document: String,

    // Só boleto; impresso no documento
    #[validate(nested)]
    pub address: Option<PayerAddress>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayerAddress {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Rua das Obras")]
    pub street: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "120")]
    pub number: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "São Paulo")]
    pub city: String,
    #[validate(length(equal = 2, message = "UF com 2 letras"))]
    #[schema(example = "SP")]
    pub state: String,
    #[validate(length(equal = 8, message = "CEP com 8 dígitos"))]
    #[schema(example = "01310100")]
    pub zip_code: String,
}

// Multa após o vencimento (boleto)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LateFine {
    #[validate(custom(function = "positive_amount"))]
    #[schema(example = "2.00")]
    pub percentage: Decimal,
    #[validate(range(max = 365))]
    #[schema(example = 1)]
    pub days_after_due: u32,
}

// Juros de mora ao dia (boleto)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyInterest {
    #[validate(custom(function = "positive_amount"))]
    #[schema(example = "0.033")]
    pub daily_percentage: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_billing_payload"))]
pub struct CreateBillingPayload {
    pub contract_id: Option<Uuid>,
    pub installment_id: Option<Uuid>,

    #[schema(example = "BOLETO")]
    pub kind: BillingKind,

    #[validate(custom(function = "positive_amount"))]
    #[schema(example = "1500.00")]
    pub amount: Decimal,

    // Obrigatório para boleto
    #[schema(value_type = Option<String>, format = Date, example = "2026-11-10")]
    pub due_date: Option<NaiveDate>,

    #[validate(nested)]
    pub payer: Option<Payer>,

    #[validate(length(max = 140))]
    #[schema(example = "Parcela 3/12 - Contrato Reforma Apto 42")]
    pub description: Option<String>,

    // Só PIX: validade do QR Code
    #[validate(range(min = 1, max = 43200))]
    #[schema(example = 60)]
    pub expiration_minutes: Option<u32>,

    // Só boleto: encargos após o vencimento
    #[validate(nested)]
    pub fine: Option<LateFine>,
    #[validate(nested)]
    pub interest: Option<DailyInterest>,
}

fn validate_billing_payload(payload: &CreateBillingPayload) -> Result<(), ValidationError> {
    if payload.contract_id.is_none() && payload.installment_id.is_none() {
        return Err(required_error(
            "missing_reference",
            "Informe o contrato ou a parcela da cobrança.",
        ));
    }
    if payload.kind == BillingKind::Boleto {
        if payload.due_date.is_none() {
            return Err(required_error(
                "missing_due_date",
                "Boletos exigem data de vencimento.",
            ));
        }
        if payload.payer.is_none() {
            return Err(required_error("missing_payer", "Boletos exigem os dados do pagador."));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BillingFilter {
    pub contract_id: Option<Uuid>,
    pub installment_id: Option<Uuid>,
    pub status: Option<BillingStatus>,
}

// Reserva local gravada antes da chamada ao banco
#[derive(Debug, Clone)]
pub struct NewBilling {
    pub company_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub installment_id: Option<Uuid>,
    pub kind: BillingKind,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
}

// O que o BTG devolveu na emissão
#[derive(Debug, Clone, Default)]
pub struct IssuedBilling {
    pub external_id: String,
    pub digitable_line: Option<String>,
    pub barcode: Option<String>,
    pub emv: Option<String>,
    pub qr_code_image: Option<String>,
}

// Mudança de status condicionada ao estado anterior
#[derive(Debug, Clone)]
pub struct BillingTransition {
    pub status: BillingStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_amount: Option<Decimal>,
    pub webhook_data: Option<serde_json::Value>,
}

impl BillingTransition {
    pub fn to(status: BillingStatus) -> Self {
        Self {
            status,
            paid_at: None,
            paid_amount: None,
            webhook_data: None,
        }
    }
}
