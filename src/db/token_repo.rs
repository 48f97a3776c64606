// src/db/token_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::TokenStore, models::integration::AccessToken};

// Responsável pela tabela 'btg_tokens'
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn find_by_company(&self, company_id: Uuid) -> Result<Option<AccessToken>, AppError> {
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT company_id, access_token, refresh_token, token_type, expires_at, scopes
            FROM btg_tokens
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn upsert(&self, token: &AccessToken) -> Result<AccessToken, AppError> {
        // Tokens expirados nunca são apagados; a linha da empresa é sobrescrita.
        let saved = sqlx::query_as::<_, AccessToken>(
            r#"
            INSERT INTO btg_tokens (company_id, access_token, refresh_token, token_type, expires_at, scopes)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (company_id)
            DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                token_type = EXCLUDED.token_type,
                expires_at = EXCLUDED.expires_at,
                scopes = EXCLUDED.scopes
            RETURNING company_id, access_token, refresh_token, token_type, expires_at, scopes
            "#,
        )
        .bind(token.company_id)
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.token_type)
        .bind(token.expires_at)
        .bind(&token.scopes)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }
}
