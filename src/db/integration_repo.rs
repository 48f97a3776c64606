// src/db/integration_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::IntegrationStore,
    models::integration::{IntegrationConfig, UpsertIntegrationConfig},
};

#[derive(Clone)]
pub struct IntegrationRepository {
    pool: PgPool,
}

impl IntegrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationStore for IntegrationRepository {
    async fn find_by_company(&self, company_id: Uuid) -> Result<Option<IntegrationConfig>, AppError> {
        let config = sqlx::query_as::<_, IntegrationConfig>(
            "SELECT * FROM btg_config WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    async fn upsert(
        &self,
        company_id: Uuid,
        input: &UpsertIntegrationConfig,
    ) -> Result<IntegrationConfig, AppError> {
        // UPSERT (Insert or Update): singleton por empresa
        let config = sqlx::query_as::<_, IntegrationConfig>(
            r#"
            INSERT INTO btg_config (company_id, btg_company_id, btg_account_id, webhook_url, active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (company_id)
            DO UPDATE SET
                btg_company_id = EXCLUDED.btg_company_id,
                btg_account_id = EXCLUDED.btg_account_id,
                webhook_url = EXCLUDED.webhook_url,
                active = EXCLUDED.active
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(&input.btg_company_id)
        .bind(&input.btg_account_id)
        .bind(&input.webhook_url)
        .bind(input.active)
        .fetch_one(&self.pool)
        .await?;

        Ok(config)
    }

    async fn touch_synced(&self, company_id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE btg_config SET last_synced_at = $2 WHERE company_id = $1")
            .bind(company_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
