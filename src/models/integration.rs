// src/models/integration.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Token OAuth2 do BTG ---

// Um token ativo por empresa. O refresh sobrescreve a linha (não versiona).
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub company_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
}

impl AccessToken {
    /// Válido se ainda falta mais que `margin` para expirar.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin > now
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

// O que expomos na API: nunca os tokens em si
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub company_id: Uuid,
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub has_refresh_token: bool,
}

impl From<&AccessToken> for TokenStatus {
    fn from(token: &AccessToken) -> Self {
        Self {
            company_id: token.company_id,
            token_type: token.token_type.clone(),
            expires_at: token.expires_at,
            scopes: token.scopes.clone(),
            has_refresh_token: token.refresh_token.is_some(),
        }
    }
}

// --- Configuração da integração (singleton por empresa) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConfig {
    pub company_id: Uuid,

    #[schema(example = "f2b6d1c0-btg-company")]
    pub btg_company_id: String,

    #[schema(example = "0001-123456")]
    pub btg_account_id: Option<String>,

    #[schema(example = "https://api.wgeasy.com.br/api/btg/webhooks")]
    pub webhook_url: Option<String>,

    #[schema(example = true)]
    pub active: bool,

    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertIntegrationConfig {
    #[validate(length(min = 1, max = 100, message = "required"))]
    #[schema(example = "f2b6d1c0-btg-company")]
    pub btg_company_id: String,

    #[validate(length(min = 1, max = 100))]
    pub btg_account_id: Option<String>,

    #[validate(url(message = "URL inválida"))]
    pub webhook_url: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
