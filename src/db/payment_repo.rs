// src/db/payment_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PaymentStore,
    models::payment::{NewPayment, Payment, PaymentFilter, PaymentStatus, PaymentTransition},
};

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn insert(&self, new: &NewPayment) -> Result<Payment, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO btg_pagamentos (
                company_id, expense_id, kind, amount, description, scheduled_date,
                payee_name, payee_document, payee_bank_details, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'PENDING')
            RETURNING *
            "#,
        )
        .bind(new.company_id)
        .bind(new.expense_id)
        .bind(new.kind)
        .bind(new.amount)
        .bind(&new.description)
        .bind(new.scheduled_date)
        .bind(&new.payee_name)
        .bind(&new.payee_document)
        .bind(Json(&new.payee_bank_details))
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn find_by_id(&self, company_id: Uuid, id: Uuid) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM btg_pagamentos WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM btg_pagamentos WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn list(&self, company_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM btg_pagamentos
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR expense_id = $2)
              AND ($3::payment_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(filter.expense_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        change: &PaymentTransition,
    ) -> Result<Option<Payment>, AppError> {
        // Condicional no status anterior: duas abas aprovando ao mesmo tempo,
        // só uma vence.
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE btg_pagamentos
            SET status = $3,
                approved_by = COALESCE($4, approved_by),
                approved_at = COALESCE($5, approved_at),
                executed_at = COALESCE($6, executed_at),
                external_id = COALESCE($7, external_id),
                receipt_url = COALESCE($8, receipt_url),
                failure_reason = COALESCE($9, failure_reason),
                webhook_data = COALESCE($10, webhook_data),
                bank_approved_at = COALESCE($11, bank_approved_at),
                bank_approved_by = COALESCE($12, bank_approved_by)
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(change.status)
        .bind(change.approved_by)
        .bind(change.approved_at)
        .bind(change.executed_at)
        .bind(&change.external_id)
        .bind(&change.receipt_url)
        .bind(&change.failure_reason)
        .bind(&change.webhook_data)
        .bind(change.bank_approved_at)
        .bind(&change.bank_approved_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn attach_reference(
        &self,
        id: Uuid,
        external_id: &str,
        receipt_url: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE btg_pagamentos
            SET external_id = COALESCE(external_id, $2),
                receipt_url = COALESCE($3, receipt_url)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(external_id)
        .bind(receipt_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
