// src/db/billing_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::BillingStore,
    models::billing::{Billing, BillingFilter, BillingStatus, BillingTransition, IssuedBilling, NewBilling},
};

// Índice parcial que garante uma cobrança em aberto por parcela
const OPEN_INSTALLMENT_INDEX: &str = "uq_btg_cobrancas_parcela_aberta";

#[derive(Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for BillingRepository {
    async fn reserve(&self, new: &NewBilling) -> Result<Billing, AppError> {
        sqlx::query_as::<_, Billing>(
            r#"
            INSERT INTO btg_cobrancas (company_id, contract_id, installment_id, kind, amount, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'CREATED')
            RETURNING *
            "#,
        )
        .bind(new.company_id)
        .bind(new.contract_id)
        .bind(new.installment_id)
        .bind(new.kind)
        .bind(new.amount)
        .bind(new.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Dois pedidos concorrentes para a mesma parcela: o índice barra o segundo
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some(OPEN_INSTALLMENT_INDEX) {
                    if let Some(installment_id) = new.installment_id {
                        return AppError::DuplicateBilling(installment_id);
                    }
                }
            }
            AppError::DatabaseError(e)
        })
    }

    async fn attach_issuance(&self, id: Uuid, issued: &IssuedBilling) -> Result<Billing, AppError> {
        let billing = sqlx::query_as::<_, Billing>(
            r#"
            UPDATE btg_cobrancas
            SET external_id = $2,
                digitable_line = $3,
                barcode = $4,
                emv = $5,
                qr_code_image = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&issued.external_id)
        .bind(&issued.digitable_line)
        .bind(&issued.barcode)
        .bind(&issued.emv)
        .bind(&issued.qr_code_image)
        .fetch_one(&self.pool)
        .await?;

        Ok(billing)
    }

    async fn release_reservation(&self, id: Uuid) -> Result<(), AppError> {
        // Só apaga se nunca chegou a ter externalId
        sqlx::query("DELETE FROM btg_cobrancas WHERE id = $1 AND external_id IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_by_id(&self, company_id: Uuid, id: Uuid) -> Result<Option<Billing>, AppError> {
        let billing = sqlx::query_as::<_, Billing>(
            "SELECT * FROM btg_cobrancas WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(billing)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Billing>, AppError> {
        let billing = sqlx::query_as::<_, Billing>("SELECT * FROM btg_cobrancas WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(billing)
    }

    async fn find_open_by_installment(
        &self,
        company_id: Uuid,
        installment_id: Uuid,
    ) -> Result<Option<Billing>, AppError> {
        let billing = sqlx::query_as::<_, Billing>(
            r#"
            SELECT * FROM btg_cobrancas
            WHERE company_id = $1
              AND installment_id = $2
              AND status IN ('CREATED', 'REGISTERED', 'PAID')
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .bind(installment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(billing)
    }

    async fn list(&self, company_id: Uuid, filter: &BillingFilter) -> Result<Vec<Billing>, AppError> {
        let billings = sqlx::query_as::<_, Billing>(
            r#"
            SELECT * FROM btg_cobrancas
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR contract_id = $2)
              AND ($3::uuid IS NULL OR installment_id = $3)
              AND ($4::billing_status IS NULL OR status = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(filter.contract_id)
        .bind(filter.installment_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(billings)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: BillingStatus,
        change: &BillingTransition,
    ) -> Result<Option<Billing>, AppError> {
        let billing = sqlx::query_as::<_, Billing>(
            r#"
            UPDATE btg_cobrancas
            SET status = $3,
                paid_at = COALESCE($4, paid_at),
                paid_amount = COALESCE($5, paid_amount),
                webhook_data = COALESCE($6, webhook_data)
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(change.status)
        .bind(change.paid_at)
        .bind(change.paid_amount)
        .bind(&change.webhook_data)
        .fetch_optional(&self.pool)
        .await?;

        Ok(billing)
    }
}
