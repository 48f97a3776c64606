// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Operador autenticado pelo Supabase Auth. Não existe tabela local de usuários.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "financeiro@wgeasy.com.br")]
    pub email: Option<String>,
    #[schema(example = "authenticated")]
    pub role: Option<String>,
}

// Estrutura de dados ("claims") dentro do JWT do Supabase
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub email: Option<String>,
    pub role: Option<String>,
}

impl From<Claims> for User {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}
