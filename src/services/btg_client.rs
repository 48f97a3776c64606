// src/services/btg_client.rs
//
// Cliente HTTP da API BTG Pactual Empresas: OAuth2, boletos, PIX cobrança,
// pagamentos e consultas de conta. Não faz retry; quem chama decide.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header::AUTHORIZATION, RequestBuilder, Url};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::BtgSettings,
    models::{
        integration::AccessToken,
        payment::{AccountType, PaymentKind, PayeeBankDetails, PixKeyType},
    },
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("falha de rede ao chamar o BTG: {0}")]
    Http(#[from] reqwest::Error),

    #[error("BTG respondeu {status}: {body}")]
    Status { status: u16, body: String },

    #[error("resposta inválida do BTG: {0}")]
    Decode(String),

    #[error("configuração inválida do cliente BTG: {0}")]
    Config(String),
}

// --- Tipos da API ---

#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipPayer {
    pub name: String,
    pub document_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<SlipAddress>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipAddress {
    pub street: String,
    pub number: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipFine {
    pub percentage: Decimal,
    pub days_after_due: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipInterest {
    pub daily_percentage: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSlipRequest {
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub payer: SlipPayer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fine: Option<SlipFine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest: Option<SlipInterest>,
    pub enable_pix_payment: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankSlipResponse {
    pub id: String,
    pub barcode: Option<String>,
    pub digitable_line: Option<String>,
    pub emv: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PixPayer {
    pub name: String,
    pub document: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixCollectionRequest {
    pub amount: Decimal,
    pub expiration_in_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<PixPayer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixCollectionResponse {
    pub id: String,
    pub emv: String,
    pub qr_code_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub name: String,
    pub document: String,
    pub bank_code: Option<String>,
    pub branch_code: Option<String>,
    pub account_number: Option<String>,
    pub account_type: Option<AccountType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentDetails {
    PixKey {
        #[serde(rename = "pixKey")]
        pix_key: String,
        #[serde(rename = "pixKeyType")]
        pix_key_type: PixKeyType,
    },
    PixQrCode {
        emv: String,
    },
    Ted {
        beneficiary: Beneficiary,
    },
    Bankslip {
        #[serde(rename = "digitableLine")]
        digitable_line: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    pub details: PaymentDetails,
}

impl PaymentRequest {
    /// Monta o corpo do BTG a partir do tipo e dos dados do favorecido.
    /// `None` quando faltam dados obrigatórios para o tipo.
    pub fn build(
        kind: PaymentKind,
        amount: Decimal,
        description: Option<String>,
        scheduled_date: Option<NaiveDate>,
        payee_name: &str,
        payee_document: &str,
        details: &PayeeBankDetails,
    ) -> Option<Self> {
        let details = match kind {
            PaymentKind::PixKey => PaymentDetails::PixKey {
                pix_key: details.pix_key.clone()?,
                pix_key_type: details.pix_key_type?,
            },
            PaymentKind::PixQrCode => PaymentDetails::PixQrCode {
                emv: details.emv.clone()?,
            },
            PaymentKind::Ted => PaymentDetails::Ted {
                beneficiary: Beneficiary {
                    name: payee_name.to_string(),
                    document: payee_document.to_string(),
                    bank_code: details.bank_code.clone(),
                    branch_code: details.branch_code.clone(),
                    account_number: details.account_number.clone(),
                    account_type: details.account_type,
                },
            },
            PaymentKind::Bankslip => PaymentDetails::Bankslip {
                digitable_line: details.digitable_line.clone()?,
            },
        };

        Some(Self {
            kind: kind.btg_type(),
            amount,
            description,
            scheduled_date,
            details,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub status: Option<String>,
    pub receipt_url: Option<String>,
}

// GET /v1/companies responde `{ "companies": [...] }` ou o array direto
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CompaniesResponse {
    Wrapped { companies: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl CompaniesResponse {
    fn into_vec(self) -> Vec<serde_json::Value> {
        match self {
            CompaniesResponse::Wrapped { companies } => companies,
            CompaniesResponse::Bare(companies) => companies,
        }
    }
}

// --- Gateway ---

#[async_trait]
pub trait BankGateway: Send + Sync {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, GatewayError>;

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, GatewayError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, GatewayError>;

    async fn client_credentials(&self) -> Result<TokenGrant, GatewayError>;

    /// Empresas às quais o token dá acesso no BTG.
    async fn list_companies(&self, token: &AccessToken) -> Result<Vec<serde_json::Value>, GatewayError>;

    async fn create_bank_slip(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        request: &BankSlipRequest,
    ) -> Result<BankSlipResponse, GatewayError>;

    async fn cancel_bank_slip(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        external_id: &str,
    ) -> Result<(), GatewayError>;

    async fn create_pix_collection(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        request: &PixCollectionRequest,
    ) -> Result<PixCollectionResponse, GatewayError>;

    async fn create_payment(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, GatewayError>;

    async fn get_payment(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        external_id: &str,
    ) -> Result<PaymentResponse, GatewayError>;

    async fn cancel_payment(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        external_id: &str,
    ) -> Result<(), GatewayError>;

    async fn balance(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        account_id: &str,
    ) -> Result<serde_json::Value, GatewayError>;

    async fn statements(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<serde_json::Value, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct BtgClient {
    http: reqwest::Client,
    api_url: String,
    auth_url: String,
    client_id: String,
    client_secret: String,
    scopes: String,
}

impl BtgClient {
    pub fn new(settings: &BtgSettings) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            auth_url: settings.auth_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            scopes: settings.scopes.join(" "),
        })
    }

    fn company_url(&self, btg_company_id: &str, path: &str) -> String {
        format!("{}/v1/companies/{}{}", self.api_url, btg_company_id, path)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, GatewayError> {
        let request = self
            .http
            .post(format!("{}/oauth/token", self.auth_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form);

        send_json(request).await
    }
}

// Envia e decodifica; status != 2xx vira `GatewayError::Status` com o corpo.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, GatewayError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "BTG retornou erro");
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
}

async fn send_empty(request: RequestBuilder) -> Result<(), GatewayError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

#[async_trait]
impl BankGateway for BtgClient {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, GatewayError> {
        let url = Url::parse_with_params(
            &format!("{}/oauth/authorize", self.auth_url),
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", self.scopes.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, GatewayError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, GatewayError> {
        self.token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .await
    }

    async fn client_credentials(&self) -> Result<TokenGrant, GatewayError> {
        let scopes = self.scopes.clone();
        self.token_request(&[("grant_type", "client_credentials"), ("scope", scopes.as_str())])
            .await
    }

    async fn list_companies(&self, token: &AccessToken) -> Result<Vec<serde_json::Value>, GatewayError> {
        let builder = self
            .http
            .get(format!("{}/v1/companies", self.api_url))
            .header(AUTHORIZATION, token.authorization_header());

        let response: CompaniesResponse = send_json(builder).await?;
        Ok(response.into_vec())
    }

    async fn create_bank_slip(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        request: &BankSlipRequest,
    ) -> Result<BankSlipResponse, GatewayError> {
        let builder = self
            .http
            .post(self.company_url(btg_company_id, "/bank-slips"))
            .header(AUTHORIZATION, token.authorization_header())
            .json(request);

        send_json(builder).await
    }

    async fn cancel_bank_slip(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        external_id: &str,
    ) -> Result<(), GatewayError> {
        let builder = self
            .http
            .delete(self.company_url(btg_company_id, &format!("/bank-slips/{external_id}")))
            .header(AUTHORIZATION, token.authorization_header());

        send_empty(builder).await
    }

    async fn create_pix_collection(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        request: &PixCollectionRequest,
    ) -> Result<PixCollectionResponse, GatewayError> {
        let builder = self
            .http
            .post(self.company_url(btg_company_id, "/pix-cash-in/instant-collections"))
            .header(AUTHORIZATION, token.authorization_header())
            .json(request);

        send_json(builder).await
    }

    async fn create_payment(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, GatewayError> {
        let builder = self
            .http
            .post(self.company_url(btg_company_id, "/payments"))
            .header(AUTHORIZATION, token.authorization_header())
            .json(request);

        send_json(builder).await
    }

    async fn get_payment(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        external_id: &str,
    ) -> Result<PaymentResponse, GatewayError> {
        let builder = self
            .http
            .get(self.company_url(btg_company_id, &format!("/payments/{external_id}")))
            .header(AUTHORIZATION, token.authorization_header());

        send_json(builder).await
    }

    async fn cancel_payment(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        external_id: &str,
    ) -> Result<(), GatewayError> {
        let builder = self
            .http
            .delete(self.company_url(btg_company_id, &format!("/payments/{external_id}")))
            .header(AUTHORIZATION, token.authorization_header());

        send_empty(builder).await
    }

    async fn balance(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        account_id: &str,
    ) -> Result<serde_json::Value, GatewayError> {
        let builder = self
            .http
            .get(self.company_url(btg_company_id, &format!("/accounts/{account_id}/balance")))
            .header(AUTHORIZATION, token.authorization_header());

        send_json(builder).await
    }

    async fn statements(
        &self,
        token: &AccessToken,
        btg_company_id: &str,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<serde_json::Value, GatewayError> {
        let builder = self
            .http
            .get(self.company_url(btg_company_id, &format!("/accounts/{account_id}/statements")))
            .header(AUTHORIZATION, token.authorization_header())
            .query(&[
                ("startDate", start_date.to_string()),
                ("endDate", end_date.to_string()),
            ]);

        send_json(builder).await
    }
}
