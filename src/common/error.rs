use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

// Erro único da aplicação. Cada variante vira um status HTTP + corpo JSON.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    // --- Integração BTG ---

    #[error("Autorização do BTG expirada: {0}")]
    AuthExpired(String),

    #[error("Integração BTG não configurada para a empresa {0}")]
    IntegrationNotConfigured(Uuid),

    #[error("A parcela {0} já possui uma cobrança em aberto")]
    DuplicateBilling(Uuid),

    #[error("illegal transition {from}→{to}")]
    InvalidTransition { from: String, to: String },

    #[error("Falha na operação de cobrança no BTG: {0}")]
    BillingIssuance(String),

    #[error("Falha ao executar pagamento no BTG: {0}")]
    PaymentExecution(String),

    #[error("Falha ao processar webhook: {0}")]
    WebhookProcessing(String),

    #[error("Assinatura do webhook inválida")]
    InvalidWebhookSignature,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        AppError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    // Código estável para o frontend decidir qual toast mostrar
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden(_) => "forbidden",
            AppError::ResourceNotFound(_) => "not_found",
            AppError::AuthExpired(_) => "btg_auth_expired",
            AppError::IntegrationNotConfigured(_) => "btg_not_configured",
            AppError::DuplicateBilling(_) => "duplicate_billing",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::BillingIssuance(_) => "billing_issuance_failed",
            AppError::PaymentExecution(_) => "payment_execution_failed",
            AppError::WebhookProcessing(_) => "webhook_processing_failed",
            AppError::InvalidWebhookSignature => "invalid_webhook_signature",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match &self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "code": code,
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::ResourceNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::AuthExpired(_) => (
                StatusCode::UNAUTHORIZED,
                "A autorização do BTG expirou. Refaça a conexão com o banco.".to_string(),
            ),
            AppError::IntegrationNotConfigured(_) => {
                (StatusCode::PRECONDITION_FAILED, self.to_string())
            }
            AppError::DuplicateBilling(_) | AppError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::BillingIssuance(_) | AppError::PaymentExecution(_) => {
                tracing::warn!("⚠️ Falha na chamada ao BTG: {}", self);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::WebhookProcessing(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::InvalidWebhookSignature => (StatusCode::UNAUTHORIZED, self.to_string()),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O detalhe fica só no log.
            e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message, "code": code }));
        (status, body).into_response()
    }
}
