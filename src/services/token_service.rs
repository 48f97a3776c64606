// src/services/token_service.rs
//
// Ciclo de vida do token OAuth2 do BTG: cache em memória, margem de
// segurança antes da expiração e refresh serializado.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TokenStore,
    models::integration::{AccessToken, TokenStatus},
    services::btg_client::{BankGateway, TokenGrant},
};

// Teto para o `expires_in` informado pelo BTG (um ano)
const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Instante de expiração a partir do `expires_in` do grant. Valores fora
/// de `0..=MAX_TOKEN_LIFETIME_SECS` são limitados à faixa.
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    let lifetime = Duration::seconds(expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS));
    now.checked_add_signed(lifetime).unwrap_or(now)
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn TokenStore>,
    gateway: Arc<dyn BankGateway>,
    cache: Arc<RwLock<HashMap<Uuid, AccessToken>>>,
    // Um refresh por vez neste processo
    refresh_lock: Arc<Mutex<()>>,
    safety_margin: Duration,
}

impl TokenService {
    pub fn new(store: Arc<dyn TokenStore>, gateway: Arc<dyn BankGateway>, safety_margin_secs: i64) -> Self {
        Self {
            store,
            gateway,
            cache: Arc::new(RwLock::new(HashMap::new())),
            refresh_lock: Arc::new(Mutex::new(())),
            safety_margin: Duration::seconds(safety_margin_secs),
        }
    }

    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, AppError> {
        self.gateway
            .authorization_url(redirect_uri, state)
            .map_err(|e| AppError::BadRequest(e.to_string()))
    }

    /// Troca o `code` do consentimento por tokens e grava para a empresa.
    pub async fn exchange_code(
        &self,
        company_id: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenStatus, AppError> {
        let grant = self
            .gateway
            .exchange_code(code, redirect_uri)
            .await
            .map_err(|e| AppError::AuthExpired(e.to_string()))?;

        let token = self.persist(company_id, grant, None).await?;
        tracing::info!("🔐 Empresa {} conectada ao BTG", company_id);
        Ok(TokenStatus::from(&token))
    }

    pub async fn status(&self, company_id: Uuid) -> Result<TokenStatus, AppError> {
        self.store
            .find_by_company(company_id)
            .await?
            .map(|token| TokenStatus::from(&token))
            .ok_or_else(|| AppError::ResourceNotFound("Token BTG".into()))
    }

    /// Devolve um token com folga maior que a margem de segurança,
    /// renovando se preciso. Falha no refresh vira `AuthExpired`, sem retry.
    pub async fn get_valid_token(&self, company_id: Uuid) -> Result<AccessToken, AppError> {
        if let Some(token) = self.cached(company_id).await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Outro pedido pode ter renovado enquanto esperávamos o lock
        if let Some(token) = self.cached(company_id).await {
            return Ok(token);
        }

        let stored = self.store.find_by_company(company_id).await?;
        if let Some(token) = &stored {
            if token.is_valid_at(Utc::now(), self.safety_margin) {
                self.cache.write().await.insert(company_id, token.clone());
                return Ok(token.clone());
            }
        }

        let previous_refresh = stored.and_then(|t| t.refresh_token);
        let grant = match previous_refresh.as_deref() {
            Some(refresh_token) => {
                tracing::info!("🔄 Renovando token BTG da empresa {}", company_id);
                self.gateway.refresh_token(refresh_token).await
            }
            None => {
                tracing::info!("🔑 Sem refresh token; client_credentials para a empresa {}", company_id);
                self.gateway.client_credentials().await
            }
        }
        .map_err(|e| {
            tracing::warn!("⚠️ Falha ao renovar token BTG da empresa {}: {}", company_id, e);
            AppError::AuthExpired(e.to_string())
        })?;

        self.persist(company_id, grant, previous_refresh).await
    }

    async fn cached(&self, company_id: Uuid) -> Option<AccessToken> {
        let cache = self.cache.read().await;
        cache
            .get(&company_id)
            .filter(|t| t.is_valid_at(Utc::now(), self.safety_margin))
            .cloned()
    }

    // Sobrescreve a linha da empresa. Resposta sem refresh_token mantém o anterior.
    async fn persist(
        &self,
        company_id: Uuid,
        grant: TokenGrant,
        previous_refresh: Option<String>,
    ) -> Result<AccessToken, AppError> {
        let token = AccessToken {
            company_id,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.or(previous_refresh),
            token_type: grant.token_type,
            expires_at: expiry_after(Utc::now(), grant.expires_in),
            scopes: grant
                .scope
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
        };

        let saved = self.store.upsert(&token).await?;
        self.cache.write().await.insert(company_id, saved.clone());
        Ok(saved)
    }
}
