// src/services/payment_service.rs
//
// Pagamentos a fornecedores: criação, aprovação, execução no BTG,
// consulta e cancelamento. Toda mudança de status é condicionada ao status lido.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PaymentStore,
    models::payment::{
        CreatePaymentPayload, NewPayment, Payment, PaymentFilter, PaymentStatus, PaymentTransition,
    },
    services::{
        btg_client::{BankGateway, PaymentRequest, PaymentResponse},
        integration_service::IntegrationService,
        token_service::TokenService,
    },
};

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    integration: IntegrationService,
    tokens: TokenService,
    gateway: Arc<dyn BankGateway>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        integration: IntegrationService,
        tokens: TokenService,
        gateway: Arc<dyn BankGateway>,
    ) -> Self {
        Self {
            store,
            integration,
            tokens,
            gateway,
        }
    }

    // Só grava como PENDING; nada vai ao banco antes da aprovação
    pub async fn create(&self, company_id: Uuid, payload: CreatePaymentPayload) -> Result<Payment, AppError> {
        let payment = self
            .store
            .insert(&NewPayment {
                company_id,
                expense_id: payload.expense_id,
                kind: payload.kind,
                amount: payload.amount,
                description: payload.description,
                scheduled_date: payload.scheduled_date,
                payee_name: payload.payee_name,
                payee_document: payload.payee_document,
                payee_bank_details: payload.payee_bank_details,
            })
            .await?;

        tracing::info!("💸 Pagamento {} criado ({} {})", payment.id, payment.kind.btg_type(), payment.amount);
        Ok(payment)
    }

    pub async fn approve(&self, company_id: Uuid, id: Uuid, approver_id: Uuid) -> Result<Payment, AppError> {
        let payment = self.get(company_id, id).await?;
        if payment.status != PaymentStatus::Pending {
            return Err(AppError::invalid_transition(payment.status, PaymentStatus::Approved));
        }

        let change = PaymentTransition {
            approved_by: Some(approver_id),
            approved_at: Some(Utc::now()),
            ..PaymentTransition::to(PaymentStatus::Approved)
        };
        let approved = self.apply(company_id, &payment, &change).await?;

        tracing::info!("✅ Pagamento {} aprovado por {}", approved.id, approver_id);
        Ok(approved)
    }

    /// Executa no BTG. Exige APPROVED.
    ///
    /// O pagamento passa para EXECUTING antes da chamada; só um executor
    /// vence esse UPDATE. A resposta do banco decide o status final:
    /// confirmado vira EXECUTED, recusado vira FAILED e em processamento
    /// fica em EXECUTING até o webhook. Erro remoto deixa FAILED com o
    /// motivo, para revisão manual; não há retry.
    pub async fn execute(&self, company_id: Uuid, id: Uuid) -> Result<Payment, AppError> {
        let payment = self.get(company_id, id).await?;
        if payment.status != PaymentStatus::Approved {
            return Err(AppError::invalid_transition(payment.status, PaymentStatus::Executed));
        }

        let config = self.integration.require_active(company_id).await?;
        let request = PaymentRequest::build(
            payment.kind,
            payment.amount,
            payment.description.clone(),
            payment.scheduled_date,
            &payment.payee_name,
            &payment.payee_document,
            &payment.payee_bank_details,
        )
        .ok_or_else(|| {
            AppError::BadRequest("Dados bancários do favorecido incompletos para o tipo de pagamento".into())
        })?;

        let claimed = match self
            .store
            .transition(payment.id, PaymentStatus::Approved, &PaymentTransition::to(PaymentStatus::Executing))
            .await?
        {
            Some(claimed) => claimed,
            None => {
                let current = self.get(company_id, payment.id).await?;
                return Err(AppError::invalid_transition(current.status, PaymentStatus::Executed));
            }
        };

        let token = match self.tokens.get_valid_token(company_id).await {
            Ok(token) => token,
            Err(e) => {
                // Nada foi ao banco: devolve para APPROVED
                self.release_claim(&claimed).await;
                return Err(e);
            }
        };

        match self
            .gateway
            .create_payment(&token, &config.btg_company_id, &request)
            .await
        {
            Ok(response) => self.record_bank_response(company_id, &claimed, response).await,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!("⚠️ Pagamento {} falhou no BTG: {}", claimed.id, reason);

                let change = PaymentTransition {
                    failure_reason: Some(reason.clone()),
                    ..PaymentTransition::to(PaymentStatus::Failed)
                };
                self.apply(company_id, &claimed, &change).await?;
                Err(AppError::PaymentExecution(reason))
            }
        }
    }

    async fn release_claim(&self, claimed: &Payment) {
        let revert = PaymentTransition::to(PaymentStatus::Approved);
        if let Err(e) = self.store.transition(claimed.id, PaymentStatus::Executing, &revert).await {
            tracing::error!("🚨 Pagamento {} ficou em EXECUTING sem chamada ao BTG: {}", claimed.id, e);
        }
    }

    // O banco já aceitou: a referência tem que ser gravada mesmo que o
    // status local tenha mudado durante a chamada.
    async fn record_bank_response(
        &self,
        company_id: Uuid,
        claimed: &Payment,
        response: PaymentResponse,
    ) -> Result<Payment, AppError> {
        let target = PaymentStatus::from_bank_status(response.status.as_deref());
        tracing::debug!("BTG aceitou o pagamento {} (status {:?})", response.id, response.status);

        let mut change = PaymentTransition {
            external_id: Some(response.id.clone()),
            receipt_url: response.receipt_url.clone(),
            ..PaymentTransition::to(target)
        };
        let rejection = match target {
            PaymentStatus::Executed => {
                change.executed_at = Some(Utc::now());
                None
            }
            PaymentStatus::Failed => {
                let reason = format!(
                    "BTG recusou o pagamento {} (status {})",
                    response.id,
                    response.status.as_deref().unwrap_or("desconhecido")
                );
                change.failure_reason = Some(reason.clone());
                Some(reason)
            }
            _ => None,
        };

        match self.store.transition(claimed.id, PaymentStatus::Executing, &change).await {
            Ok(Some(updated)) => {
                match updated.status {
                    PaymentStatus::Executing => tracing::info!(
                        "⏳ Pagamento {} enviado ao BTG como {}; aguardando confirmação",
                        updated.id,
                        response.id
                    ),
                    status => tracing::info!(
                        "🏦 Pagamento {} registrado no BTG como {} ({})",
                        updated.id,
                        response.id,
                        status
                    ),
                }
                match rejection {
                    Some(reason) => Err(AppError::PaymentExecution(reason)),
                    None => Ok(updated),
                }
            }
            Ok(None) => {
                self.keep_reference(claimed.id, &response).await?;
                let current = self.get(company_id, claimed.id).await?;
                tracing::error!(
                    "🚨 Pagamento {} aceito no BTG como {} mas está {} localmente; revisar",
                    claimed.id,
                    response.id,
                    current.status
                );
                Err(AppError::invalid_transition(current.status, target))
            }
            Err(e) => {
                self.keep_reference(claimed.id, &response).await?;
                Err(e)
            }
        }
    }

    async fn keep_reference(&self, id: Uuid, response: &PaymentResponse) -> Result<(), AppError> {
        self.store
            .attach_reference(id, &response.id, response.receipt_url.as_deref())
            .await
            .inspect_err(|e| {
                tracing::error!("🚨 Referência BTG {} do pagamento {} não foi gravada: {}", response.id, id, e)
            })
    }

    /// Cancela. PENDING e APPROVED são só locais. EXECUTING com referência
    /// é cancelado no BTG antes; sem referência a chamada ainda está em curso.
    pub async fn cancel(&self, company_id: Uuid, id: Uuid) -> Result<Payment, AppError> {
        let payment = self.get(company_id, id).await?;

        match payment.status {
            PaymentStatus::Pending | PaymentStatus::Approved => {}
            PaymentStatus::Executing => {
                let Some(external_id) = payment.external_id.as_deref() else {
                    return Err(AppError::invalid_transition(payment.status, PaymentStatus::Cancelled));
                };

                let config = self.integration.require_active(company_id).await?;
                let token = self.tokens.get_valid_token(company_id).await?;
                self.gateway
                    .cancel_payment(&token, &config.btg_company_id, external_id)
                    .await
                    .map_err(|e| AppError::PaymentExecution(e.to_string()))?;
                tracing::info!("🏦 Pagamento {} cancelado no BTG", external_id);
            }
            status => return Err(AppError::invalid_transition(status, PaymentStatus::Cancelled)),
        }

        let cancelled = self
            .apply(company_id, &payment, &PaymentTransition::to(PaymentStatus::Cancelled))
            .await?;
        tracing::info!("❌ Pagamento {} cancelado", cancelled.id);
        Ok(cancelled)
    }

    /// Consulta o pagamento no BTG e aplica o status remoto quando a
    /// transição é válida. Status igual ou não permitido só é registrado no log.
    pub async fn sync(&self, company_id: Uuid, id: Uuid) -> Result<Payment, AppError> {
        let payment = self.get(company_id, id).await?;
        let Some(external_id) = payment.external_id.clone() else {
            return Err(AppError::BadRequest(
                "Pagamento ainda não foi enviado ao BTG".into(),
            ));
        };

        let config = self.integration.require_active(company_id).await?;
        let token = self.tokens.get_valid_token(company_id).await?;
        let remote = self
            .gateway
            .get_payment(&token, &config.btg_company_id, &external_id)
            .await
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("consulta de pagamento BTG: {e}")))?;

        let target = PaymentStatus::from_bank_status(remote.status.as_deref());
        if target == payment.status || !payment.status.can_transition_to(target) {
            tracing::debug!(
                "Pagamento {} no BTG: {:?}; local continua {}",
                payment.id,
                remote.status,
                payment.status
            );
            return Ok(payment);
        }

        let change = PaymentTransition {
            receipt_url: remote.receipt_url,
            executed_at: (target == PaymentStatus::Executed).then(Utc::now),
            failure_reason: (target == PaymentStatus::Failed)
                .then(|| format!("BTG informou status {}", remote.status.as_deref().unwrap_or("desconhecido"))),
            ..PaymentTransition::to(target)
        };
        let updated = self.apply(company_id, &payment, &change).await?;
        tracing::info!("🔄 Pagamento {} sincronizado com o BTG: {}", updated.id, updated.status);
        Ok(updated)
    }

    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Payment, AppError> {
        self.store
            .find_by_id(company_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Pagamento {id}")))
    }

    pub async fn list(&self, company_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError> {
        self.store.list(company_id, filter).await
    }

    // UPDATE condicional; se outro escritor venceu, reporta o status atual
    async fn apply(
        &self,
        company_id: Uuid,
        payment: &Payment,
        change: &PaymentTransition,
    ) -> Result<Payment, AppError> {
        match self.store.transition(payment.id, payment.status, change).await? {
            Some(updated) => Ok(updated),
            None => {
                let current = self.get(company_id, payment.id).await?;
                Err(AppError::invalid_transition(current.status, change.status))
            }
        }
    }
}
