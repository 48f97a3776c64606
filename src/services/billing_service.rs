// src/services/billing_service.rs
//
// Emissão e cancelamento de cobranças (boleto e PIX).

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, qr_code::render_emv_png_base64},
    db::BillingStore,
    models::{
        billing::{
            Billing, BillingFilter, BillingKind, BillingStatus, BillingTransition, CreateBillingPayload,
            IssuedBilling, NewBilling,
        },
        integration::IntegrationConfig,
    },
    services::{
        btg_client::{
            BankGateway, BankSlipRequest, PixCollectionRequest, PixPayer, SlipAddress, SlipFine,
            SlipInterest, SlipPayer,
        },
        integration_service::IntegrationService,
        token_service::TokenService,
    },
};

// Validade padrão do QR Code PIX
const DEFAULT_PIX_EXPIRATION_MINUTES: u32 = 60;

#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn BillingStore>,
    integration: IntegrationService,
    tokens: TokenService,
    gateway: Arc<dyn BankGateway>,
}

impl BillingService {
    pub fn new(
        store: Arc<dyn BillingStore>,
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

    /// Reserva a linha local, emite no BTG e grava os artefatos.
    /// Se a emissão falha, a reserva é liberada e nada fica pendurado.
    pub async fn create(&self, company_id: Uuid, payload: &CreateBillingPayload) -> Result<Billing, AppError> {
        let config = self.integration.require_active(company_id).await?;

        if let Some(installment_id) = payload.installment_id {
            let open = self
                .store
                .find_open_by_installment(company_id, installment_id)
                .await?
                .filter(|b| b.status.blocks_new_billing());
            if let Some(open) = open {
                tracing::warn!(
                    "🚫 Parcela {} já tem a cobrança {} ({})",
                    installment_id,
                    open.id,
                    open.status
                );
                return Err(AppError::DuplicateBilling(installment_id));
            }
        }

        // O índice parcial barra a corrida entre a checagem acima e esta reserva
        let reserved = self
            .store
            .reserve(&NewBilling {
                company_id,
                contract_id: payload.contract_id,
                installment_id: payload.installment_id,
                kind: payload.kind,
                amount: payload.amount,
                due_date: payload.due_date,
            })
            .await?;

        match self.issue(company_id, &config, payload).await {
            Ok(issued) => {
                let billing = self.store.attach_issuance(reserved.id, &issued).await?;
                tracing::info!(
                    "🧾 Cobrança {} emitida no BTG como {}",
                    billing.id,
                    issued.external_id
                );
                Ok(billing)
            }
            Err(e) => {
                // O erro da emissão é o que importa para quem chamou
                if let Err(release) = self.store.release_reservation(reserved.id).await {
                    tracing::error!(
                        "🚨 Reserva {} não foi liberada após falha na emissão: {}",
                        reserved.id,
                        release
                    );
                }
                Err(e)
            }
        }
    }

    async fn issue(
        &self,
        company_id: Uuid,
        config: &IntegrationConfig,
        payload: &CreateBillingPayload,
    ) -> Result<IssuedBilling, AppError> {
        let token = self.tokens.get_valid_token(company_id).await?;

        match payload.kind {
            BillingKind::Boleto => {
                let (Some(due_date), Some(payer)) = (payload.due_date, payload.payer.as_ref()) else {
                    return Err(AppError::BadRequest(
                        "Boletos exigem vencimento e pagador".into(),
                    ));
                };

                let request = BankSlipRequest {
                    amount: payload.amount,
                    due_date,
                    payer: SlipPayer {
                        name: payer.name.clone(),
                        document_number: payer.document.clone(),
                        address: payer.address.as_ref().map(|a| SlipAddress {
                            street: a.street.clone(),
                            number: a.number.clone(),
                            city: a.city.clone(),
                            state: a.state.clone(),
                            zip_code: a.zip_code.clone(),
                        }),
                    },
                    description: payload.description.clone(),
                    fine: payload.fine.as_ref().map(|f| SlipFine {
                        percentage: f.percentage,
                        days_after_due: f.days_after_due,
                    }),
                    interest: payload.interest.as_ref().map(|i| SlipInterest {
                        daily_percentage: i.daily_percentage,
                    }),
                    enable_pix_payment: true,
                };

                let slip = self
                    .gateway
                    .create_bank_slip(&token, &config.btg_company_id, &request)
                    .await
                    .map_err(|e| AppError::BillingIssuance(e.to_string()))?;

                let qr_code_image = slip.emv.as_deref().and_then(render_qr);
                Ok(IssuedBilling {
                    external_id: slip.id,
                    digitable_line: slip.digitable_line,
                    barcode: slip.barcode,
                    emv: slip.emv,
                    qr_code_image,
                })
            }
            BillingKind::Pix => {
                let request = PixCollectionRequest {
                    amount: payload.amount,
                    expiration_in_minutes: payload
                        .expiration_minutes
                        .unwrap_or(DEFAULT_PIX_EXPIRATION_MINUTES),
                    description: payload.description.clone(),
                    payer: payload.payer.as_ref().map(|p| PixPayer {
                        name: p.name.clone(),
                        document: p.document.clone(),
                    }),
                };

                let collection = self
                    .gateway
                    .create_pix_collection(&token, &config.btg_company_id, &request)
                    .await
                    .map_err(|e| AppError::BillingIssuance(e.to_string()))?;

                let qr_code_image = collection
                    .qr_code_base64
                    .or_else(|| render_qr(&collection.emv));
                Ok(IssuedBilling {
                    external_id: collection.id,
                    digitable_line: None,
                    barcode: None,
                    emv: Some(collection.emv),
                    qr_code_image,
                })
            }
        }
    }

    /// Cancela a cobrança. Boletos são baixados no BTG antes da mudança local.
    pub async fn cancel(&self, company_id: Uuid, id: Uuid) -> Result<Billing, AppError> {
        let billing = self.get(company_id, id).await?;
        if !billing.status.can_transition_to(BillingStatus::Cancelled) {
            return Err(AppError::invalid_transition(billing.status, BillingStatus::Cancelled));
        }

        if let (BillingKind::Boleto, Some(external_id)) = (billing.kind, billing.external_id.as_deref()) {
            let config = self.integration.require_active(company_id).await?;
            let token = self.tokens.get_valid_token(company_id).await?;
            self.gateway
                .cancel_bank_slip(&token, &config.btg_company_id, external_id)
                .await
                .map_err(|e| AppError::BillingIssuance(e.to_string()))?;
        }

        let change = BillingTransition::to(BillingStatus::Cancelled);
        match self.store.transition(billing.id, billing.status, &change).await? {
            Some(cancelled) => {
                tracing::info!("❌ Cobrança {} cancelada", cancelled.id);
                Ok(cancelled)
            }
            None => {
                // Um webhook mudou o status entre a leitura e o UPDATE
                let current = self.get(company_id, id).await?;
                Err(AppError::invalid_transition(current.status, BillingStatus::Cancelled))
            }
        }
    }

    pub async fn get(&self, company_id: Uuid, id: Uuid) -> Result<Billing, AppError> {
        self.store
            .find_by_id(company_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Cobrança {id}")))
    }

    pub async fn list(&self, company_id: Uuid, filter: &BillingFilter) -> Result<Vec<Billing>, AppError> {
        self.store.list(company_id, filter).await
    }
}

// QR Code gerado localmente; falha aqui não invalida uma cobrança já emitida
fn render_qr(emv: &str) -> Option<String> {
    render_emv_png_base64(emv)
        .map_err(|e| tracing::warn!("⚠️ Não foi possível gerar o QR Code: {}", e))
        .ok()
}
