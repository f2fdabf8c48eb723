//! eDahab provider implementation
//!
//! Requests are signed: `hash = hex(sha256(json(body) + secret))`, sent as the
//! `hash` query parameter. The exact string that was hashed is the request body.

use crate::error::{AppError, AppResult};
use crate::payments::traits::EDahabGateway;
use crate::payments::types::{
    CreditInvoiceRequest, CreditInvoiceResponse, IssueInvoiceRequest, IssueInvoiceResponse,
};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{error, info, warn};

const PROVIDER: &str = "eDahab";
const ISSUE_INVOICE_PATH: &str = "issueinvoice";
const AGENT_PAYMENT_PATH: &str = "agentPayment";
const INVOICE_PAID: &str = "Paid";
const TRANSACTION_APPROVED: &str = "Approved";

/// eDahab provider configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EDahabConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for EDahabConfig {
    fn default() -> Self {
        Self {
            base_url: "https://edahab.net/api/api".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Serialized body together with its hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub body: String,
    pub hash: String,
}

/// Sign `payload` with `secret`. The secret only contributes to the hash.
pub fn sign<T: Serialize>(payload: &T, secret: &str) -> AppResult<SignedPayload> {
    let body = serde_json::to_string(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hasher.update(secret.as_bytes());
    let hash = hex::encode(hasher.finalize());
    Ok(SignedPayload { body, hash })
}

/// eDahab payment provider
pub struct EDahabProvider {
    config: EDahabConfig,
    client: Client,
}

impl EDahabProvider {
    pub fn new(config: EDahabConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = %config.base_url, "eDahab provider initialized");

        Ok(Self { config, client })
    }

    fn url(&self, path: &str, hash: &str) -> String {
        format!(
            "{}/{}?hash={}",
            self.config.base_url.trim_end_matches('/'),
            path,
            hash
        )
    }

    async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        signed: SignedPayload,
        failure_message: &str,
    ) -> AppResult<T> {
        let response = self
            .client
            .post(self.url(path, &signed.hash))
            .header(header::CONTENT_TYPE, "application/json")
            .body(signed.body)
            .send()
            .await
            .map_err(|e| {
                error!(path, "eDahab request failed: {}", e);
                AppError::transport(PROVIDER, e.status().map(|s| s.as_u16()), e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .unwrap_or(failure_message)
                .to_string();
            error!(path, status = status.as_u16(), "eDahab API error: {}", message);
            return Err(AppError::transport(PROVIDER, Some(status.as_u16()), message));
        }

        response.json::<T>().await.map_err(|e| {
            error!(path, "Failed to parse eDahab response: {}", e);
            AppError::transport(PROVIDER, None, format!("Invalid response format: {}", e))
        })
    }
}

/// Accept a paid invoice, reject anything else
pub fn interpret_issue(response: IssueInvoiceResponse) -> AppResult<IssueInvoiceResponse> {
    if response.invoice_status.as_deref() == Some(INVOICE_PAID) && response.status_code == Some(0)
    {
        return Ok(response);
    }

    let message = response
        .validation_message()
        .or_else(|| response.status_description.clone().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "Failed to make payment request".to_string());
    warn!(
        invoice_status = ?response.invoice_status,
        status_code = ?response.status_code,
        "eDahab rejected the invoice: {}",
        message
    );
    Err(AppError::rejected(
        PROVIDER,
        response.status_code.map(|code| code.to_string()),
        Some(message),
    ))
}

/// Accept an approved credit, reject anything else
pub fn interpret_credit(response: CreditInvoiceResponse) -> AppResult<CreditInvoiceResponse> {
    if response.transaction_status.as_deref() == Some(TRANSACTION_APPROVED) {
        return Ok(response);
    }

    let message = response
        .transaction_message
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "Failed to make credit invoice request".to_string());
    warn!(
        transaction_status = ?response.transaction_status,
        "eDahab rejected the credit: {}",
        message
    );
    Err(AppError::rejected(
        PROVIDER,
        response.transaction_status,
        Some(message),
    ))
}

#[async_trait]
impl EDahabGateway for EDahabProvider {
    async fn issue_invoice(
        &self,
        request: &IssueInvoiceRequest,
        secret: &str,
    ) -> AppResult<IssueInvoiceResponse> {
        info!(
            edahab_number = %request.edahab_number,
            amount = %request.amount,
            "Issuing eDahab invoice"
        );

        let signed = sign(request, secret)?;
        let response = self
            .post_signed(ISSUE_INVOICE_PATH, signed, "Failed to make payment request")
            .await?;
        let response = interpret_issue(response)?;

        info!(
            invoice_id = ?response.invoice_id,
            transaction_id = ?response.transaction_id,
            "eDahab invoice paid"
        );
        Ok(response)
    }

    async fn credit_invoice(
        &self,
        request: &CreditInvoiceRequest,
        secret: &str,
    ) -> AppResult<CreditInvoiceResponse> {
        info!(
            transaction_id = %request.transaction_id,
            amount = %request.transaction_amount,
            "Crediting eDahab account"
        );

        let signed = sign(request, secret)?;
        let response = self
            .post_signed(
                AGENT_PAYMENT_PATH,
                signed,
                "Failed to make credit invoice request",
            )
            .await?;
        let response = interpret_credit(response)?;

        info!(
            transaction_id = ?response.transaction_id,
            "eDahab credit approved"
        );
        Ok(response)
    }
}
