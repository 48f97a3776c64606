// src/db/webhook_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::WebhookLogStore,
    models::webhook::{WebhookEvent, WebhookEventFilter},
};

const DEFAULT_LIST_LIMIT: i64 = 100;

// Log append-only 'btg_webhook_logs'
#[derive(Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookLogStore for WebhookRepository {
    async fn append(&self, event_name: &str, payload: &serde_json::Value) -> Result<WebhookEvent, AppError> {
        let event = sqlx::query_as::<_, WebhookEvent>(
            r#"
            INSERT INTO btg_webhook_logs (event_name, payload, processed)
            VALUES ($1, $2, FALSE)
            RETURNING *
            "#,
        )
        .bind(event_name)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, AppError> {
        let event = sqlx::query_as::<_, WebhookEvent>("SELECT * FROM btg_webhook_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    async fn mark_processed(&self, id: Uuid) -> Result<bool, AppError> {
        // Vira uma única vez: a condição em `processed` impede a segunda escrita
        let result = sqlx::query(
            r#"
            UPDATE btg_webhook_logs
            SET processed = TRUE, error_message = NULL, processed_at = NOW(), attempts = attempts + 1
            WHERE id = $1 AND processed = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failure(&self, id: Uuid, message: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE btg_webhook_logs
            SET error_message = $2, attempts = attempts + 1
            WHERE id = $1 AND processed = FALSE
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, filter: &WebhookEventFilter) -> Result<Vec<WebhookEvent>, AppError> {
        let events = sqlx::query_as::<_, WebhookEvent>(
            r#"
            SELECT * FROM btg_webhook_logs
            WHERE ($1::boolean IS NULL OR processed = $1)
            ORDER BY received_at DESC
            LIMIT $2
            "#,
        )
        .bind(filter.processed)
        .bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn list_retryable(&self, max_attempts: i32, limit: i64) -> Result<Vec<WebhookEvent>, AppError> {
        let events = sqlx::query_as::<_, WebhookEvent>(
            r#"
            SELECT * FROM btg_webhook_logs
            WHERE processed = FALSE AND attempts < $1
            ORDER BY received_at ASC
            LIMIT $2
            "#,
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
