// src/test_utils.rs
//
// Stores em memória e um gateway BTG roteirizado para os testes de services
// e rotas.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::{AppState, BtgSettings, Settings, Stores, WebhookSettings},
    db::{BillingStore, IntegrationStore, MembershipStore, PaymentStore, TokenStore, WebhookLogStore},
    models::{
        billing::{Billing, BillingFilter, BillingStatus, BillingTransition, IssuedBilling, NewBilling},
        integration::{AccessToken, IntegrationConfig, UpsertIntegrationConfig},
        payment::{NewPayment, Payment, PaymentFilter, PaymentStatus, PaymentTransition},
        webhook::{WebhookEvent, WebhookEventFilter},
    },
    services::btg_client::{
        BankGateway, BankSlipRequest, BankSlipResponse, GatewayError, PaymentRequest, PaymentResponse,
        PixCollectionRequest, PixCollectionResponse, TokenGrant,
    },
};

pub const JWT_SECRET: &str = "test-jwt-secret-test-jwt-secret-1234";
// Operador vinculado à empresa do `TestContext`
pub const OPERATOR_ID: Uuid = Uuid::from_u128(0x5e1f_0000_0000_4000_8000_0000_0000_0001);
pub const PIX_EMV: &str = "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-4266554400005204000053039865802BR5913WG EASY LTDA6009SAO PAULO62070503***6304ABCD";

// --- Tokens ---

#[derive(Default)]
pub struct MemoryTokenStore {
    rows: Mutex<HashMap<Uuid, AccessToken>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find_by_company(&self, company_id: Uuid) -> Result<Option<AccessToken>, AppError> {
        Ok(self.rows.lock().unwrap().get(&company_id).cloned())
    }

    async fn upsert(&self, token: &AccessToken) -> Result<AccessToken, AppError> {
        self.rows.lock().unwrap().insert(token.company_id, token.clone());
        Ok(token.clone())
    }
}

// --- Configuração ---

#[derive(Default)]
pub struct MemoryIntegrationStore {
    rows: Mutex<HashMap<Uuid, IntegrationConfig>>,
}

#[async_trait]
impl IntegrationStore for MemoryIntegrationStore {
    async fn find_by_company(&self, company_id: Uuid) -> Result<Option<IntegrationConfig>, AppError> {
        Ok(self.rows.lock().unwrap().get(&company_id).cloned())
    }

    async fn upsert(
        &self,
        company_id: Uuid,
        input: &UpsertIntegrationConfig,
    ) -> Result<IntegrationConfig, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let last_synced_at = rows.get(&company_id).and_then(|c| c.last_synced_at);
        let config = IntegrationConfig {
            company_id,
            btg_company_id: input.btg_company_id.clone(),
            btg_account_id: input.btg_account_id.clone(),
            webhook_url: input.webhook_url.clone(),
            active: input.active,
            last_synced_at,
        };
        rows.insert(company_id, config.clone());
        Ok(config)
    }

    async fn touch_synced(&self, company_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(config) = self.rows.lock().unwrap().get_mut(&company_id) {
            config.last_synced_at = Some(at);
        }
        Ok(())
    }
}

// --- Cobranças ---

#[derive(Default)]
pub struct MemoryBillingStore {
    rows: Mutex<Vec<Billing>>,
    failing_release: AtomicBool,
}

impl MemoryBillingStore {
    /// Faz `release_reservation` falhar (banco fora do ar no meio da emissão).
    pub fn fail_release(&self) {
        self.failing_release.store(true, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<Billing> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get(&self, id: Uuid) -> Billing {
        self.all().into_iter().find(|b| b.id == id).unwrap()
    }

    // Substitui a linha de mesmo id
    pub fn put(&self, billing: Billing) {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|b| b.id != billing.id);
        rows.push(billing);
    }

    // Insere uma cobrança já emitida, no status pedido
    pub fn seed(&self, company_id: Uuid, external_id: &str, status: BillingStatus) -> Billing {
        let now = Utc::now();
        let billing = Billing {
            id: Uuid::new_v4(),
            company_id,
            contract_id: Some(Uuid::new_v4()),
            installment_id: Some(Uuid::new_v4()),
            kind: crate::models::billing::BillingKind::Boleto,
            status,
            external_id: Some(external_id.to_string()),
            amount: rust_decimal::Decimal::new(150000, 2),
            due_date: NaiveDate::from_ymd_opt(2026, 11, 10),
            digitable_line: Some("23790.00000 00000.000000 00000.000000 0 00000000150000".into()),
            barcode: None,
            emv: None,
            qr_code_image: None,
            paid_at: None,
            paid_amount: None,
            webhook_data: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(billing.clone());
        billing
    }
}

#[async_trait]
impl BillingStore for MemoryBillingStore {
    async fn reserve(&self, new: &NewBilling) -> Result<Billing, AppError> {
        let mut rows = self.rows.lock().unwrap();

        if let Some(installment_id) = new.installment_id {
            // Mesmo escopo do índice parcial: empresa + parcela
            let taken = rows.iter().any(|b| {
                b.company_id == new.company_id
                    && b.installment_id == Some(installment_id)
                    && b.status.blocks_new_billing()
            });
            if taken {
                return Err(AppError::DuplicateBilling(installment_id));
            }
        }

        let now = Utc::now();
        let billing = Billing {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            contract_id: new.contract_id,
            installment_id: new.installment_id,
            kind: new.kind,
            status: BillingStatus::Created,
            external_id: None,
            amount: new.amount,
            due_date: new.due_date,
            digitable_line: None,
            barcode: None,
            emv: None,
            qr_code_image: None,
            paid_at: None,
            paid_amount: None,
            webhook_data: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(billing.clone());
        Ok(billing)
    }

    async fn attach_issuance(&self, id: Uuid, issued: &IssuedBilling) -> Result<Billing, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let billing = rows
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::ResourceNotFound("Cobrança".into()))?;

        billing.external_id = Some(issued.external_id.clone());
        billing.digitable_line = issued.digitable_line.clone();
        billing.barcode = issued.barcode.clone();
        billing.emv = issued.emv.clone();
        billing.qr_code_image = issued.qr_code_image.clone();
        billing.updated_at = Utc::now();
        Ok(billing.clone())
    }

    async fn release_reservation(&self, id: Uuid) -> Result<(), AppError> {
        if self.failing_release.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(anyhow::anyhow!("conexão perdida")));
        }
        self.rows
            .lock()
            .unwrap()
            .retain(|b| !(b.id == id && b.external_id.is_none()));
        Ok(())
    }

    async fn find_by_id(&self, company_id: Uuid, id: Uuid) -> Result<Option<Billing>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .find(|b| b.id == id && b.company_id == company_id))
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Billing>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .find(|b| b.external_id.as_deref() == Some(external_id)))
    }

    async fn find_open_by_installment(
        &self,
        company_id: Uuid,
        installment_id: Uuid,
    ) -> Result<Option<Billing>, AppError> {
        let open = self.all().into_iter().find(|b| {
            b.company_id == company_id
                && b.installment_id == Some(installment_id)
                && b.status.blocks_new_billing()
        });
        // Cede a vez depois da leitura: criações concorrentes passam juntas
        // pela checagem e só a reserva decide
        tokio::task::yield_now().await;
        Ok(open)
    }

    async fn list(&self, company_id: Uuid, filter: &BillingFilter) -> Result<Vec<Billing>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|b| b.company_id == company_id)
            .filter(|b| filter.contract_id.is_none() || b.contract_id == filter.contract_id)
            .filter(|b| filter.installment_id.is_none() || b.installment_id == filter.installment_id)
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: BillingStatus,
        change: &BillingTransition,
    ) -> Result<Option<Billing>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(billing) = rows.iter_mut().find(|b| b.id == id && b.status == expected) else {
            return Ok(None);
        };

        billing.status = change.status;
        billing.paid_at = change.paid_at.or(billing.paid_at);
        billing.paid_amount = change.paid_amount.or(billing.paid_amount);
        billing.webhook_data = change.webhook_data.clone().or(billing.webhook_data.take());
        billing.updated_at = Utc::now();
        Ok(Some(billing.clone()))
    }
}

// --- Pagamentos ---

#[derive(Default)]
pub struct MemoryPaymentStore {
    rows: Mutex<Vec<Payment>>,
}

impl MemoryPaymentStore {
    pub fn get(&self, id: Uuid) -> Payment {
        self.rows.lock().unwrap().iter().find(|p| p.id == id).cloned().unwrap()
    }

    // Força um pagamento para um status e externalId (cenários de webhook)
    pub fn force(&self, id: Uuid, status: PaymentStatus, external_id: Option<&str>) {
        let mut rows = self.rows.lock().unwrap();
        let payment = rows.iter_mut().find(|p| p.id == id).unwrap();
        payment.status = status;
        payment.external_id = external_id.map(String::from);
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert(&self, new: &NewPayment) -> Result<Payment, AppError> {
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            expense_id: new.expense_id,
            kind: new.kind,
            status: PaymentStatus::Pending,
            external_id: None,
            amount: new.amount,
            description: new.description.clone(),
            scheduled_date: new.scheduled_date,
            approved_at: None,
            approved_by: None,
            bank_approved_at: None,
            bank_approved_by: None,
            executed_at: None,
            receipt_url: None,
            failure_reason: None,
            payee_name: new.payee_name.clone(),
            payee_document: new.payee_document.clone(),
            payee_bank_details: Json(new.payee_bank_details.clone()),
            webhook_data: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(payment.clone());
        Ok(payment)
    }

    async fn find_by_id(&self, company_id: Uuid, id: Uuid) -> Result<Option<Payment>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id && p.company_id == company_id)
            .cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn list(&self, company_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.company_id == company_id)
            .filter(|p| filter.expense_id.is_none() || p.expense_id == filter.expense_id)
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        change: &PaymentTransition,
    ) -> Result<Option<Payment>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(payment) = rows.iter_mut().find(|p| p.id == id && p.status == expected) else {
            return Ok(None);
        };

        payment.status = change.status;
        payment.approved_by = change.approved_by.or(payment.approved_by);
        payment.approved_at = change.approved_at.or(payment.approved_at);
        payment.executed_at = change.executed_at.or(payment.executed_at);
        payment.external_id = change.external_id.clone().or(payment.external_id.take());
        payment.receipt_url = change.receipt_url.clone().or(payment.receipt_url.take());
        payment.failure_reason = change.failure_reason.clone().or(payment.failure_reason.take());
        payment.webhook_data = change.webhook_data.clone().or(payment.webhook_data.take());
        payment.bank_approved_at = change.bank_approved_at.or(payment.bank_approved_at);
        payment.bank_approved_by = change.bank_approved_by.clone().or(payment.bank_approved_by.take());
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }

    async fn attach_reference(
        &self,
        id: Uuid,
        external_id: &str,
        receipt_url: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(payment) = self.rows.lock().unwrap().iter_mut().find(|p| p.id == id) {
            payment.external_id.get_or_insert_with(|| external_id.to_string());
            if let Some(url) = receipt_url {
                payment.receipt_url = Some(url.to_string());
            }
        }
        Ok(())
    }
}

// --- Webhooks ---

#[derive(Default)]
pub struct MemoryWebhookStore {
    rows: Mutex<Vec<WebhookEvent>>,
    failing_lookup: AtomicBool,
}

impl MemoryWebhookStore {
    /// Faz `find_by_id` falhar; as demais operações continuam normais.
    pub fn fail_lookup(&self) {
        self.failing_lookup.store(true, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<WebhookEvent> {
        self.rows.lock().unwrap().clone()
    }

    pub fn get(&self, id: Uuid) -> WebhookEvent {
        self.all().into_iter().find(|e| e.id == id).unwrap()
    }
}

#[async_trait]
impl WebhookLogStore for MemoryWebhookStore {
    async fn append(&self, event_name: &str, payload: &serde_json::Value) -> Result<WebhookEvent, AppError> {
        let event = WebhookEvent {
            id: Uuid::new_v4(),
            event_name: event_name.to_string(),
            payload: payload.clone(),
            processed: false,
            error_message: None,
            attempts: 0,
            received_at: Utc::now(),
            processed_at: None,
        };
        self.rows.lock().unwrap().push(event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, AppError> {
        if self.failing_lookup.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError(anyhow::anyhow!("timeout na leitura")));
        }
        Ok(self.all().into_iter().find(|e| e.id == id))
    }

    async fn mark_processed(&self, id: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|e| e.id == id && !e.processed) {
            Some(event) => {
                event.processed = true;
                event.error_message = None;
                event.processed_at = Some(Utc::now());
                event.attempts += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_failure(&self, id: Uuid, message: &str) -> Result<(), AppError> {
        if let Some(event) = self
            .rows
            .lock()
            .unwrap()
            .iter_mut()
            .find(|e| e.id == id && !e.processed)
        {
            event.error_message = Some(message.to_string());
            event.attempts += 1;
        }
        Ok(())
    }

    async fn list(&self, filter: &WebhookEventFilter) -> Result<Vec<WebhookEvent>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|e| filter.processed.is_none_or(|p| e.processed == p))
            .collect())
    }

    async fn list_retryable(&self, max_attempts: i32, limit: i64) -> Result<Vec<WebhookEvent>, AppError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|e| !e.processed && e.attempts < max_attempts)
            .take(limit as usize)
            .collect())
    }
}

// --- Vínculos operador ↔ empresa ---

#[derive(Default)]
pub struct MemoryMembershipStore {
    rows: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl MemoryMembershipStore {
    pub fn grant(&self, user_id: Uuid, company_id: Uuid) {
        self.rows.lock().unwrap().insert((user_id, company_id));
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn is_member(&self, user_id: Uuid, company_id: Uuid) -> Result<bool, AppError> {
        Ok(self.rows.lock().unwrap().contains(&(user_id, company_id)))
    }
}

// --- Gateway roteirizado ---

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    // Status devolvido em create_payment/get_payment; `None` = CONFIRMED
    payment_status: Mutex<Option<Option<String>>>,
    // Roda dentro de create_payment, depois de ceder a vez
    on_create_payment: Mutex<Option<Hook>>,
    // Último corpo enviado em create_bank_slip
    last_bank_slip: Mutex<Option<serde_json::Value>>,
}

impl FakeGateway {
    /// Status que o BTG devolve para pagamentos (`None` = ausente).
    pub fn payment_status(&self, status: Option<&str>) {
        *self.payment_status.lock().unwrap() = Some(status.map(String::from));
    }

    pub fn on_create_payment(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_create_payment.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn last_bank_slip(&self) -> Option<serde_json::Value> {
        self.last_bank_slip.lock().unwrap().clone()
    }

    fn current_payment_status(&self) -> Option<String> {
        self.payment_status
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Some("CONFIRMED".into()))
    }

    /// Faz a operação `op` responder com erro 500.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    fn record(&self, op: &'static str) -> Result<usize, GatewayError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(op);
        if self.failing.lock().unwrap().contains(op) {
            return Err(GatewayError::Status {
                status: 500,
                body: format!("{op} indisponível"),
            });
        }
        Ok(calls.len())
    }

    fn grant(access_token: &str, refresh_token: Option<&str>) -> TokenGrant {
        TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(String::from),
            token_type: "Bearer".into(),
            expires_in: 3600,
            scope: Some("payments bank-slips".into()),
        }
    }
}

#[async_trait]
impl BankGateway for FakeGateway {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, GatewayError> {
        Ok(format!(
            "https://id.example/oauth/authorize?redirect_uri={redirect_uri}&state={state}"
        ))
    }

    async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<TokenGrant, GatewayError> {
        self.record("exchange_code")?;
        Ok(Self::grant("access-from-code", Some("refresh-from-code")))
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenGrant, GatewayError> {
        self.record("refresh_token")?;
        Ok(Self::grant("access-refreshed", None))
    }

    async fn client_credentials(&self) -> Result<TokenGrant, GatewayError> {
        self.record("client_credentials")?;
        Ok(Self::grant("access-client", None))
    }

    async fn list_companies(&self, _token: &AccessToken) -> Result<Vec<serde_json::Value>, GatewayError> {
        self.record("list_companies")?;
        Ok(vec![serde_json::json!({ "id": "btg-company-1", "name": "WG Easy Ltda" })])
    }

    async fn create_bank_slip(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        request: &BankSlipRequest,
    ) -> Result<BankSlipResponse, GatewayError> {
        tokio::task::yield_now().await;
        *self.last_bank_slip.lock().unwrap() = serde_json::to_value(request).ok();
        let n = self.record("create_bank_slip")?;
        Ok(BankSlipResponse {
            id: format!("BOL{n}"),
            barcode: Some("23790000000000000000000000000000000000000000".into()),
            digitable_line: Some("23790.00000 00000.000000 00000.000000 0 00000000150000".into()),
            emv: None,
        })
    }

    async fn cancel_bank_slip(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        _external_id: &str,
    ) -> Result<(), GatewayError> {
        self.record("cancel_bank_slip")?;
        Ok(())
    }

    async fn create_pix_collection(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        _request: &PixCollectionRequest,
    ) -> Result<PixCollectionResponse, GatewayError> {
        let n = self.record("create_pix_collection")?;
        Ok(PixCollectionResponse {
            id: format!("PIX{n}"),
            emv: PIX_EMV.into(),
            qr_code_base64: None,
        })
    }

    async fn create_payment(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        _request: &PaymentRequest,
    ) -> Result<PaymentResponse, GatewayError> {
        tokio::task::yield_now().await;
        let hook = self.on_create_payment.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        self.record("create_payment")?;
        let n = self.calls("create_payment");
        Ok(PaymentResponse {
            id: format!("PAY{n}"),
            status: self.current_payment_status(),
            receipt_url: Some(format!("https://btg.example/receipts/PAY{n}")),
        })
    }

    async fn get_payment(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        external_id: &str,
    ) -> Result<PaymentResponse, GatewayError> {
        self.record("get_payment")?;
        Ok(PaymentResponse {
            id: external_id.to_string(),
            status: self.current_payment_status(),
            receipt_url: Some(format!("https://btg.example/receipts/{external_id}")),
        })
    }

    async fn cancel_payment(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        _external_id: &str,
    ) -> Result<(), GatewayError> {
        self.record("cancel_payment")?;
        Ok(())
    }

    async fn balance(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        _account_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        self.record("balance")?;
        Ok(serde_json::json!({ "available": 10250.75, "blocked": 0 }))
    }

    async fn statements(
        &self,
        _token: &AccessToken,
        _btg_company_id: &str,
        _account_id: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<serde_json::Value, GatewayError> {
        self.record("statements")?;
        Ok(serde_json::json!({ "statements": [] }))
    }
}

// --- Contexto completo ---

pub fn test_settings(webhook_secret: Option<&str>) -> Settings {
    Settings {
        database_url: "postgres://localhost/test".into(),
        supabase_jwt_secret: JWT_SECRET.into(),
        bind_addr: "127.0.0.1:0".into(),
        btg: BtgSettings {
            client_id: "wg-client".into(),
            client_secret: "s3cret".into(),
            api_url: "https://api.example".into(),
            auth_url: "https://id.example".into(),
            webhook_secret: webhook_secret.map(String::from),
            scopes: vec!["payments".into()],
            http_timeout_secs: 5,
            token_safety_margin_secs: 60,
        },
        webhook: WebhookSettings {
            sweep_interval_secs: 300,
            max_attempts: 3,
        },
    }
}

pub struct TestContext {
    pub tokens: Arc<MemoryTokenStore>,
    pub integrations: Arc<MemoryIntegrationStore>,
    pub billings: Arc<MemoryBillingStore>,
    pub payments: Arc<MemoryPaymentStore>,
    pub webhooks: Arc<MemoryWebhookStore>,
    pub memberships: Arc<MemoryMembershipStore>,
    pub gateway: Arc<FakeGateway>,
    pub state: AppState,
    pub company_id: Uuid,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_secret(None)
    }

    pub fn with_secret(webhook_secret: Option<&str>) -> Self {
        let tokens = Arc::new(MemoryTokenStore::default());
        let integrations = Arc::new(MemoryIntegrationStore::default());
        let billings = Arc::new(MemoryBillingStore::default());
        let payments = Arc::new(MemoryPaymentStore::default());
        let webhooks = Arc::new(MemoryWebhookStore::default());
        let memberships = Arc::new(MemoryMembershipStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let company_id = Uuid::new_v4();
        memberships.grant(OPERATOR_ID, company_id);

        let stores = Stores {
            tokens: tokens.clone(),
            integrations: integrations.clone(),
            billings: billings.clone(),
            payments: payments.clone(),
            webhooks: webhooks.clone(),
            memberships: memberships.clone(),
        };
        let state = AppState::new(&test_settings(webhook_secret), stores, gateway.clone());

        Self {
            tokens,
            integrations,
            billings,
            payments,
            webhooks,
            memberships,
            gateway,
            state,
            company_id,
        }
    }

    /// Empresa com integração ativa e um token válido por uma hora.
    pub async fn connected(self) -> Self {
        self.integrations
            .upsert(
                self.company_id,
                &UpsertIntegrationConfig {
                    btg_company_id: "btg-company-1".into(),
                    btg_account_id: Some("acc-1".into()),
                    webhook_url: None,
                    active: true,
                },
            )
            .await
            .unwrap();
        self.store_token(Duration::hours(1), Some("refresh-1")).await;
        self
    }

    pub async fn store_token(&self, expires_in: Duration, refresh_token: Option<&str>) {
        self.tokens
            .upsert(&AccessToken {
                company_id: self.company_id,
                access_token: "access-stored".into(),
                refresh_token: refresh_token.map(String::from),
                token_type: "Bearer".into(),
                expires_at: Utc::now() + expires_in,
                scopes: vec!["payments".into()],
            })
            .await
            .unwrap();
    }
}
