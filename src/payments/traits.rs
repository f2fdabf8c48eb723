//! Gateway trait definitions
//!
//! The composition layer only talks to these traits, so handlers can be
//! exercised against in-memory gateways as well as the HTTP providers.

use crate::error::AppResult;
use crate::payments::types::{
    CreditInvoiceRequest, CreditInvoiceResponse, IssueInvoiceRequest, IssueInvoiceResponse,
    WaafiPayOperation, WaafiPayRequest, WaafiPayResponse,
};
use async_trait::async_trait;

/// Purchase / withdraw / refund / pre-authorization gateway
#[async_trait]
pub trait WaafiPayGateway: Send + Sync {
    /// Send one operation and return the response only if the gateway accepted it.
    ///
    /// Transport failures and gateway rejections both come back as `Err`.
    async fn execute(
        &self,
        operation: WaafiPayOperation,
        request: &WaafiPayRequest,
    ) -> AppResult<WaafiPayResponse>;

    async fn purchase(&self, request: &WaafiPayRequest) -> AppResult<WaafiPayResponse> {
        self.execute(WaafiPayOperation::Purchase, request).await
    }

    async fn withdraw(&self, request: &WaafiPayRequest) -> AppResult<WaafiPayResponse> {
        self.execute(WaafiPayOperation::Withdraw, request).await
    }

    async fn refund(&self, request: &WaafiPayRequest) -> AppResult<WaafiPayResponse> {
        self.execute(WaafiPayOperation::Refund, request).await
    }

    async fn pre_authorize(&self, request: &WaafiPayRequest) -> AppResult<WaafiPayResponse> {
        self.execute(WaafiPayOperation::PreAuthorize, request).await
    }

    async fn pre_authorize_commit(
        &self,
        request: &WaafiPayRequest,
    ) -> AppResult<WaafiPayResponse> {
        self.execute(WaafiPayOperation::PreAuthorizeCommit, request)
            .await
    }

    async fn pre_authorize_cancel(
        &self,
        request: &WaafiPayRequest,
    ) -> AppResult<WaafiPayResponse> {
        self.execute(WaafiPayOperation::PreAuthorizeCancel, request)
            .await
    }
}

/// Invoice issue / credit gateway with signed requests
#[async_trait]
pub trait EDahabGateway: Send + Sync {
    /// Issue an invoice to a subscriber; `secret` only feeds the request hash
    async fn issue_invoice(
        &self,
        request: &IssueInvoiceRequest,
        secret: &str,
    ) -> AppResult<IssueInvoiceResponse>;

    /// Credit an account from the agent balance
    async fn credit_invoice(
        &self,
        request: &CreditInvoiceRequest,
        secret: &str,
    ) -> AppResult<CreditInvoiceResponse>;
}
