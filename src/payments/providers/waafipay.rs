//! WaafiPay provider implementation
//!
//! Every operation is a single POST of a fixed-shape envelope to the ASM
//! endpoint. Success is `responseCode == "2001"`, plus a `params.transactionId`
//! for the operations that create a transaction. No retries.

use crate::error::{AppError, AppResult};
use crate::payments::policy::{CommissionPolicy, MerchantAccountRule};
use crate::payments::traits::WaafiPayGateway;
use crate::payments::types::{Amount, WaafiPayOperation, WaafiPayRequest, WaafiPayResponse};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, warn};

const PROVIDER: &str = "WaafiPay";
const SCHEMA_VERSION: &str = "1.0";
const CHANNEL_NAME: &str = "WEB";
const PAYMENT_METHOD: &str = "MWALLET_ACCOUNT";
const CURRENCY: &str = "USD";

/// Gateway response code for an accepted request
pub const SUCCESS_CODE: &str = "2001";

/// WaafiPay provider configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaafiPayConfig {
    /// ASM endpoint every operation is posted to
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub commission_rate: f64,
    #[serde(default)]
    pub commission_waiver_threshold: Option<f64>,
    #[serde(default)]
    pub merchant_account_rule: MerchantAccountRule,
}

impl Default for WaafiPayConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.waafipay.net/asm".to_string(),
            timeout_secs: 30,
            commission_rate: 0.02,
            commission_waiver_threshold: None,
            merchant_account_rule: MerchantAccountRule::default(),
        }
    }
}

impl WaafiPayConfig {
    pub fn commission(&self) -> CommissionPolicy {
        CommissionPolicy {
            rate: self.commission_rate,
            waiver_threshold: self.commission_waiver_threshold,
        }
    }
}

/// WaafiPay payment provider
pub struct WaafiPayProvider {
    config: WaafiPayConfig,
    client: Client,
}

impl WaafiPayProvider {
    pub fn new(config: WaafiPayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            endpoint = %config.endpoint,
            merchant_account_rule = %config.merchant_account_rule,
            "WaafiPay provider initialized"
        );

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &WaafiPayConfig {
        &self.config
    }

    /// Full request envelope for `operation`
    pub fn build_envelope(
        &self,
        operation: WaafiPayOperation,
        request: &WaafiPayRequest,
    ) -> AppResult<Value> {
        Ok(json!({
            "schemaVersion": SCHEMA_VERSION,
            "requestId": request.reference_id,
            "timestamp": Utc::now().timestamp_millis(),
            "channelName": CHANNEL_NAME,
            "serviceName": operation.service_name(),
            "serviceParams": self.service_params(operation, request)?,
        }))
    }

    fn service_params(
        &self,
        operation: WaafiPayOperation,
        request: &WaafiPayRequest,
    ) -> AppResult<Value> {
        let credentials = &request.credentials;
        let mut params = json!({
            "merchantUid": credentials.merchant_uid,
            "apiUserId": credentials.api_user_id,
            "apiKey": credentials.api_key,
        });

        let extra = match operation {
            WaafiPayOperation::Purchase | WaafiPayOperation::PreAuthorize => {
                let mobile = required(request.mobile.as_deref(), "mobile", operation)?;
                let amount = required(request.amount, "amount", operation)?;
                json!({
                    "paymentMethod": PAYMENT_METHOD,
                    "payerInfo": { "accountNo": mobile },
                    "transactionInfo": {
                        "referenceId": request.reference_id,
                        "invoiceId": request.reference_id.invoice_id(mobile),
                        "amount": amount,
                        "currency": CURRENCY,
                        "description": request.description,
                    },
                })
            }
            WaafiPayOperation::Withdraw => {
                let account = required(
                    request.account_number_to_withdraw.as_deref(),
                    "account number to withdraw",
                    operation,
                )?;
                let amount = required(request.amount, "amount", operation)?;
                let rule = &self.config.merchant_account_rule;
                if let Some(other) = rule.divergent_rule(account) {
                    warn!(
                        reference_id = %request.reference_id,
                        configured = %rule,
                        divergent = %other,
                        "Merchant account rules disagree on withdrawal account classification"
                    );
                }
                let subscriber = request.mobile.as_deref().unwrap_or(account);
                json!({
                    "paymentMethod": PAYMENT_METHOD,
                    "payerInfo": {
                        "accountNo": account,
                        "accountType": rule.classify(account).as_str(),
                    },
                    "transactionInfo": {
                        "referenceId": request.reference_id,
                        "invoiceId": request.reference_id.invoice_id(subscriber),
                        "amount": self.config.commission().transferred_amount(amount),
                        "currency": CURRENCY,
                        "description": request.description,
                    },
                })
            }
            WaafiPayOperation::Refund => {
                let transaction_id =
                    required(request.transaction_id.as_deref(), "transactionId", operation)?;
                let amount = required(request.amount, "amount", operation)?;
                json!({
                    "transactionId": transaction_id_value(transaction_id),
                    "amount": amount,
                    "description": request.description,
                })
            }
            WaafiPayOperation::PreAuthorizeCommit => {
                let transaction_id =
                    required(request.transaction_id.as_deref(), "transactionId", operation)?;
                json!({
                    "transactionId": transaction_id_value(transaction_id),
                    "description": request.description,
                    "referenceId": request.reference_id,
                })
            }
            WaafiPayOperation::PreAuthorizeCancel => {
                let transaction_id =
                    required(request.transaction_id.as_deref(), "transactionId", operation)?;
                json!({
                    "transactionId": transaction_id_value(transaction_id),
                    "description": request.description,
                })
            }
        };

        if let (Some(target), Value::Object(fields)) = (params.as_object_mut(), extra) {
            target.extend(fields);
        }
        Ok(params)
    }

    async fn send(&self, operation: WaafiPayOperation, body: &Value) -> AppResult<WaafiPayResponse> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(operation = %operation, "WaafiPay request failed: {}", e);
                AppError::transport(PROVIDER, e.status().map(|s| s.as_u16()), e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| operation.failure_message().to_string());
            error!(operation = %operation, status = status.as_u16(), "WaafiPay API error: {}", message);
            return Err(AppError::transport(PROVIDER, Some(status.as_u16()), message));
        }

        response.json::<WaafiPayResponse>().await.map_err(|e| {
            error!(operation = %operation, "Failed to parse WaafiPay response: {}", e);
            AppError::transport(PROVIDER, None, format!("Invalid response format: {}", e))
        })
    }
}

/// Accept or reject a 2xx WaafiPay response
pub fn interpret(
    operation: WaafiPayOperation,
    response: WaafiPayResponse,
) -> AppResult<WaafiPayResponse> {
    let code_ok = response.response_code.as_deref() == Some(SUCCESS_CODE);
    let transaction_ok = !operation.requires_transaction_id() || response.transaction_id().is_some();

    if code_ok && transaction_ok {
        return Ok(response);
    }

    let message = response
        .description()
        .or(response.response_msg.as_deref().filter(|m| !m.is_empty()))
        .map(str::to_string);
    warn!(
        operation = %operation,
        response_code = ?response.response_code,
        "WaafiPay rejected the request: {:?}",
        message
    );
    Err(AppError::rejected(PROVIDER, response.response_code, message))
}

fn required<T: Copy>(value: Option<T>, field: &str, operation: WaafiPayOperation) -> AppResult<T> {
    value.ok_or_else(|| AppError::internal(format!("{} is required for {}", field, operation)))
}

/// Numeric transaction ids go out as JSON numbers, anything else as a string
fn transaction_id_value(transaction_id: &str) -> Value {
    transaction_id
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(transaction_id))
}

#[async_trait]
impl WaafiPayGateway for WaafiPayProvider {
    async fn execute(
        &self,
        operation: WaafiPayOperation,
        request: &WaafiPayRequest,
    ) -> AppResult<WaafiPayResponse> {
        info!(
            operation = %operation,
            reference_id = %request.reference_id,
            amount = ?request.amount.map(Amount::value),
            "Sending WaafiPay request"
        );

        let body = self.build_envelope(operation, request)?;
        let response = interpret(operation, self.send(operation, &body).await?)?;

        info!(
            operation = %operation,
            reference_id = %request.reference_id,
            transaction_id = ?response.transaction_id(),
            "WaafiPay request accepted"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppErrorKind, ExternalError};
    use crate::payments::types::{ReferenceId, WaafiPayCredentials};
    use httpmock::prelude::*;

    fn create_test_provider(endpoint: String) -> WaafiPayProvider {
        WaafiPayProvider::new(WaafiPayConfig {
            endpoint,
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn request() -> WaafiPayRequest {
        WaafiPayRequest {
            credentials: WaafiPayCredentials {
                merchant_uid: "M1".into(),
                api_user_id: "A1".into(),
                api_key: "API-1234567890123".into(),
            },
            reference_id: ReferenceId::from("0f8fad5b-d9cb-469f-a165-70867728950e"),
            amount: Some(Amount::new(10.0)),
            mobile: Some("611234567".into()),
            account_number_to_withdraw: Some("712345678".into()),
            transaction_id: Some("44556677".into()),
            description: "test".into(),
        }
    }

    #[test]
    fn test_waafipay_config_default() {
        let config = WaafiPayConfig::default();
        assert_eq!(config.endpoint, "https://api.waafipay.net/asm");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.commission(), CommissionPolicy::default());
    }

    #[test]
    fn test_purchase_envelope() {
        let provider = create_test_provider("http://localhost/asm".into());
        let envelope = provider
            .build_envelope(WaafiPayOperation::Purchase, &request())
            .unwrap();

        assert_eq!(envelope["schemaVersion"], "1.0");
        assert_eq!(envelope["channelName"], "WEB");
        assert_eq!(envelope["serviceName"], "API_PURCHASE");
        assert_eq!(envelope["requestId"], "0f8fad5b-d9cb-469f-a165-70867728950e");
        assert!(envelope["timestamp"].as_i64().unwrap() > 0);

        let params = &envelope["serviceParams"];
        assert_eq!(params["merchantUid"], "M1");
        assert_eq!(params["apiUserId"], "A1");
        assert_eq!(params["paymentMethod"], "MWALLET_ACCOUNT");
        assert_eq!(params["payerInfo"]["accountNo"], "611234567");
        assert_eq!(params["transactionInfo"]["invoiceId"], "0f8fa-611234567");
        assert_eq!(params["transactionInfo"]["amount"], json!(10));
        assert_eq!(params["transactionInfo"]["currency"], "USD");
    }

    #[test]
    fn test_withdraw_envelope_applies_commission() {
        let provider = create_test_provider("http://localhost/asm".into());
        let envelope = provider
            .build_envelope(WaafiPayOperation::Withdraw, &request())
            .unwrap();

        assert_eq!(envelope["serviceName"], "API_CREDIT_MERCHANT");
        let params = &envelope["serviceParams"];
        assert_eq!(params["payerInfo"]["accountNo"], "712345678");
        assert_eq!(params["payerInfo"]["accountType"], "CUSTOMER");
        assert_eq!(params["transactionInfo"]["amount"], json!(9.8));
    }

    #[test]
    fn test_withdraw_classification_follows_configured_rule() {
        let provider = WaafiPayProvider::new(WaafiPayConfig {
            merchant_account_rule: MerchantAccountRule::Prefix("1".into()),
            ..Default::default()
        })
        .unwrap();
        let mut req = request();
        req.account_number_to_withdraw = Some("107123456".into());

        let envelope = provider
            .build_envelope(WaafiPayOperation::Withdraw, &req)
            .unwrap();
        assert_eq!(envelope["serviceParams"]["payerInfo"]["accountType"], "MERCHANT");
    }

    #[test]
    fn test_refund_and_cancel_envelopes() {
        let provider = create_test_provider("http://localhost/asm".into());

        let refund = provider
            .build_envelope(WaafiPayOperation::Refund, &request())
            .unwrap();
        assert_eq!(refund["serviceName"], "API_REFUND");
        assert_eq!(refund["serviceParams"]["transactionId"], json!(44556677));
        assert_eq!(refund["serviceParams"]["amount"], json!(10));

        let commit = provider
            .build_envelope(WaafiPayOperation::PreAuthorizeCommit, &request())
            .unwrap();
        assert_eq!(commit["serviceName"], "API_PREAUTHORIZE_COMMIT");
        assert_eq!(
            commit["serviceParams"]["referenceId"],
            "0f8fad5b-d9cb-469f-a165-70867728950e"
        );

        let mut req = request();
        req.transaction_id = Some("TX-9".into());
        let cancel = provider
            .build_envelope(WaafiPayOperation::PreAuthorizeCancel, &req)
            .unwrap();
        assert_eq!(cancel["serviceName"], "API_PREAUTHORIZE_CANCEL");
        assert_eq!(cancel["serviceParams"]["transactionId"], "TX-9");
    }

    #[test]
    fn test_missing_operation_input_is_internal_error() {
        let provider = create_test_provider("http://localhost/asm".into());
        let mut req = request();
        req.transaction_id = None;
        let err = provider
            .build_envelope(WaafiPayOperation::Refund, &req)
            .unwrap_err();
        assert!(matches!(err.kind, AppErrorKind::Internal { .. }));
    }

    #[test]
    fn test_interpret_requires_transaction_id_for_purchase() {
        let response: WaafiPayResponse =
            serde_json::from_value(json!({"responseCode": "2001", "responseMsg": "RCS_SUCCESS"}))
                .unwrap();
        assert!(interpret(WaafiPayOperation::Purchase, response.clone()).is_err());
        assert!(interpret(WaafiPayOperation::PreAuthorize, response).is_ok());
    }

    #[test]
    fn test_interpret_prefers_params_description() {
        let response: WaafiPayResponse = serde_json::from_value(json!({
            "responseCode": "5310",
            "responseMsg": "RCS_USER_REJECTED",
            "params": {"description": "Payment declined by user"}
        }))
        .unwrap();
        let err = interpret(WaafiPayOperation::Purchase, response).unwrap_err();
        assert_eq!(err.message(), Some("Payment declined by user"));
        assert_eq!(err.status().as_u16(), 500);
        assert!(matches!(
            err.kind,
            AppErrorKind::External(ExternalError::Rejected { ref code, .. }) if code.as_deref() == Some("5310")
        ));

        let response: WaafiPayResponse =
            serde_json::from_value(json!({"responseCode": "5206", "responseMsg": "RCS_CANCELLED"}))
                .unwrap();
        let err = interpret(WaafiPayOperation::Refund, response).unwrap_err();
        assert_eq!(err.message(), Some("RCS_CANCELLED"));
    }

    #[tokio::test]
    async fn test_purchase_against_mock_gateway() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/asm")
                    .json_body_partial(r#"{"serviceName": "API_PURCHASE", "channelName": "WEB"}"#);
                then.status(200).json_body(json!({
                    "schemaVersion": "1.0",
                    "timestamp": "2024-05-01 12:00:00.000",
                    "responseId": "R-1",
                    "responseCode": "2001",
                    "errorCode": "0",
                    "responseMsg": "RCS_SUCCESS",
                    "params": {
                        "transactionId": "TX1",
                        "referenceId": "0f8fad5b-d9cb-469f-a165-70867728950e",
                        "txAmount": "10.0",
                        "merchantCharges": "0.1"
                    }
                }));
            })
            .await;

        let provider = create_test_provider(server.url("/asm"));
        let response = provider.purchase(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.transaction_id(), Some("TX1"));
        assert_eq!(response.merchant_charges(), Some("0.1"));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_upstream_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/asm");
                then.status(503);
            })
            .await;

        let provider = create_test_provider(server.url("/asm"));
        let err = provider.refund(&request()).await.unwrap_err();

        assert_eq!(err.status().as_u16(), 503);
        assert_eq!(err.message(), Some("Service Unavailable"));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/asm");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let provider = create_test_provider(server.url("/asm"));
        let err = provider.pre_authorize(&request()).await.unwrap_err();

        assert_eq!(err.status().as_u16(), 500);
        assert!(err.message().unwrap().starts_with("Invalid response format"));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_500() {
        let provider = create_test_provider("http://127.0.0.1:9/asm".into());
        let err = provider.withdraw(&request()).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 500);
        assert!(err.message().is_some());
    }
}
