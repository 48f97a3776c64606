// src/services/integration_service.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::IntegrationStore,
    models::integration::{IntegrationConfig, UpsertIntegrationConfig},
    services::{btg_client::BankGateway, token_service::TokenService},
};

#[derive(Clone)]
pub struct IntegrationService {
    store: Arc<dyn IntegrationStore>,
    tokens: TokenService,
    gateway: Arc<dyn BankGateway>,
}

impl IntegrationService {
    pub fn new(store: Arc<dyn IntegrationStore>, tokens: TokenService, gateway: Arc<dyn BankGateway>) -> Self {
        Self { store, tokens, gateway }
    }

    pub async fn get_config(&self, company_id: Uuid) -> Result<IntegrationConfig, AppError> {
        self.store
            .find_by_company(company_id)
            .await?
            .ok_or(AppError::IntegrationNotConfigured(company_id))
    }

    pub async fn upsert_config(
        &self,
        company_id: Uuid,
        input: &UpsertIntegrationConfig,
    ) -> Result<IntegrationConfig, AppError> {
        let config = self.store.upsert(company_id, input).await?;
        tracing::info!(
            "⚙️ Integração BTG da empresa {} atualizada (ativa: {})",
            company_id,
            config.active
        );
        Ok(config)
    }

    /// Configuração ativa, exigida por qualquer chamada ao banco.
    pub async fn require_active(&self, company_id: Uuid) -> Result<IntegrationConfig, AppError> {
        match self.store.find_by_company(company_id).await? {
            Some(config) if config.active => Ok(config),
            _ => Err(AppError::IntegrationNotConfigured(company_id)),
        }
    }

    /// Empresas visíveis para o token da empresa. Serve para descobrir o
    /// `btgCompanyId` antes de salvar a configuração, então não exige config ativa.
    pub async fn companies(&self, company_id: Uuid) -> Result<Vec<serde_json::Value>, AppError> {
        let token = self.tokens.get_valid_token(company_id).await?;

        self.gateway
            .list_companies(&token)
            .await
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("empresas BTG: {e}")))
    }

    pub async fn balance(&self, company_id: Uuid) -> Result<serde_json::Value, AppError> {
        let config = self.require_active(company_id).await?;
        let account_id = account_of(&config)?;
        let token = self.tokens.get_valid_token(company_id).await?;

        self.gateway
            .balance(&token, &config.btg_company_id, account_id)
            .await
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("saldo BTG: {e}")))
    }

    // Extrato do período. Uma consulta bem-sucedida marca `last_synced_at`.
    pub async fn statements(
        &self,
        company_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<serde_json::Value, AppError> {
        if start_date > end_date {
            return Err(AppError::BadRequest(
                "startDate deve ser anterior ou igual a endDate".into(),
            ));
        }

        let config = self.require_active(company_id).await?;
        let account_id = account_of(&config)?;
        let token = self.tokens.get_valid_token(company_id).await?;

        let statements = self
            .gateway
            .statements(&token, &config.btg_company_id, account_id, start_date, end_date)
            .await
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("extrato BTG: {e}")))?;

        self.store.touch_synced(company_id, Utc::now()).await?;
        Ok(statements)
    }
}

fn account_of(config: &IntegrationConfig) -> Result<&str, AppError> {
    config
        .btg_account_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Conta BTG não informada na configuração".into()))
}
