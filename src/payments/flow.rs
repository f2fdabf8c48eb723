//! Request composition: one primary gateway call, optionally followed by a
//! chained secondary call, merged into the outward envelope.
//!
//! A primary failure aborts the request. A secondary failure is recorded in
//! the `withdraw` field and the request still succeeds.

use crate::error::{AppError, AppResult};
use crate::payments::traits::{EDahabGateway, WaafiPayGateway};
use crate::payments::types::{
    Amount, CreditInvoiceRequest, Currency, EDahabCredentials, IssueInvoiceRequest, ReferenceId,
    WaafiPayCredentials, WaafiPayOperation, WaafiPayRequest, WaafiPayResponse,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Route families exposed by the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Purchase,
    Refund,
    Withdraw,
    PreAuthorize,
    PreAuthorizeCommit,
    PreAuthorizeCancel,
    IssueInvoice,
    CreditInvoice,
}

impl OperationKind {
    pub fn success_message(self) -> &'static str {
        match self {
            Self::Purchase | Self::IssueInvoice => "Payment has been done successfully",
            Self::Refund => "Refund has been done successfully",
            Self::Withdraw | Self::CreditInvoice => "Withdrawal has been done successfully",
            Self::PreAuthorize => "Payment has been pre-authorized successfully",
            Self::PreAuthorizeCommit => "Pre-authorized payment has been committed successfully",
            Self::PreAuthorizeCancel => "Pre-authorized payment has been cancelled successfully",
        }
    }

    /// Routes that may chain a secondary withdraw / credit
    pub fn chains_secondary(self) -> bool {
        matches!(
            self,
            Self::Purchase | Self::PreAuthorizeCommit | Self::IssueInvoice
        )
    }

    pub fn waafipay_operation(self) -> Option<WaafiPayOperation> {
        match self {
            Self::Purchase => Some(WaafiPayOperation::Purchase),
            Self::Refund => Some(WaafiPayOperation::Refund),
            Self::Withdraw => Some(WaafiPayOperation::Withdraw),
            Self::PreAuthorize => Some(WaafiPayOperation::PreAuthorize),
            Self::PreAuthorizeCommit => Some(WaafiPayOperation::PreAuthorizeCommit),
            Self::PreAuthorizeCancel => Some(WaafiPayOperation::PreAuthorizeCancel),
            Self::IssueInvoice | Self::CreditInvoice => None,
        }
    }

    /// Whether the outward envelope carries `charges`
    fn reports_charges(self) -> bool {
        matches!(
            self,
            Self::Purchase | Self::PreAuthorize | Self::PreAuthorizeCommit
        )
    }

    /// Whether the outward envelope carries the gateway `amount`
    fn reports_amount(self) -> bool {
        !matches!(self, Self::Refund | Self::PreAuthorizeCancel)
    }
}

/// Default description of a withdrawal to `account`
pub fn withdrawal_description(amount: Amount, account: &str) -> String {
    format!("{} dollars has been withdrawn to {} via system", amount, account)
}

/// Validated input for a WaafiPay route
#[derive(Debug, Clone, PartialEq)]
pub struct WaafiPayCommand {
    pub kind: OperationKind,
    pub credentials: WaafiPayCredentials,
    pub amount: Option<Amount>,
    pub mobile: Option<String>,
    pub transaction_id: Option<String>,
    pub custom_reference: Option<String>,
    pub description: String,
    /// Withdraw target; the secondary trigger on chaining routes
    pub account_number_to_withdraw: Option<String>,
}

/// Validated input for an eDahab route
#[derive(Debug, Clone, PartialEq)]
pub enum EDahabCommand {
    IssueInvoice {
        credentials: EDahabCredentials,
        agent_code: String,
        mobile: String,
        amount: Amount,
        currency: Currency,
        account_number_to_withdraw: Option<String>,
    },
    CreditInvoice {
        credentials: EDahabCredentials,
        phone_number: String,
        amount: Amount,
        currency: Currency,
        transaction_id: Option<String>,
    },
}

impl EDahabCommand {
    pub fn kind(&self) -> OperationKind {
        match self {
            EDahabCommand::IssueInvoice { .. } => OperationKind::IssueInvoice,
            EDahabCommand::CreditInvoice { .. } => OperationKind::CreditInvoice,
        }
    }
}

/// Result of the chained secondary call. Both keys are always serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryOutcome {
    pub transaction_id: Option<String>,
    pub error: Option<String>,
}

impl SecondaryOutcome {
    fn failed(err: &AppError) -> Self {
        Self {
            transaction_id: None,
            error: Some(
                err.message()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string()),
            ),
        }
    }
}

/// Success envelope for the WaafiPay routes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEnvelope {
    pub id: ReferenceId,
    pub timestamp: Option<String>,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charges: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_reference: Option<String>,
    pub description: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdraw: Option<SecondaryOutcome>,
}

impl TransactionEnvelope {
    fn from_response(
        kind: OperationKind,
        reference_id: ReferenceId,
        response: &WaafiPayResponse,
        command: WaafiPayCommand,
    ) -> Self {
        Self {
            id: reference_id,
            timestamp: response.timestamp.clone(),
            transaction_id: response.transaction_id().map(str::to_string),
            reference_id: response.reference_id().map(str::to_string),
            amount: kind
                .reports_amount()
                .then(|| response.tx_amount().map(str::to_string))
                .flatten(),
            charges: kind
                .reports_charges()
                .then(|| response.merchant_charges().map(str::to_string))
                .flatten(),
            mobile: command.mobile,
            custom_reference: command.custom_reference,
            description: command.description,
            message: kind.success_message().to_string(),
            withdraw: None,
        }
    }
}

/// Success envelope for the eDahab routes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    pub transaction_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdraw: Option<SecondaryOutcome>,
}

/// Composition layer shared by every route
#[derive(Clone)]
pub struct PaymentFlow {
    waafipay: Arc<dyn WaafiPayGateway>,
    edahab: Arc<dyn EDahabGateway>,
}

impl PaymentFlow {
    pub fn new(waafipay: Arc<dyn WaafiPayGateway>, edahab: Arc<dyn EDahabGateway>) -> Self {
        Self { waafipay, edahab }
    }

    /// Run a WaafiPay route: primary call, then the chained withdraw if any
    pub async fn run_waafipay(&self, command: WaafiPayCommand) -> AppResult<TransactionEnvelope> {
        let kind = command.kind;
        let operation = kind.waafipay_operation().ok_or_else(|| {
            AppError::internal(format!("{:?} is not a WaafiPay operation", kind))
        })?;

        let reference_id = ReferenceId::generate();
        let request = WaafiPayRequest {
            credentials: command.credentials.clone(),
            reference_id: reference_id.clone(),
            amount: command.amount,
            mobile: command.mobile.clone(),
            account_number_to_withdraw: command.account_number_to_withdraw.clone(),
            transaction_id: command.transaction_id.clone(),
            description: command.description.clone(),
        };

        let response = self.waafipay.execute(operation, &request).await?;

        let withdraw = if kind.chains_secondary() {
            Some(self.chained_withdraw(&request).await)
        } else {
            None
        };

        info!(
            operation = ?kind,
            reference_id = %reference_id,
            transaction_id = ?response.transaction_id(),
            "Payment request completed"
        );

        let mut envelope = TransactionEnvelope::from_response(kind, reference_id, &response, command);
        envelope.withdraw = withdraw;
        Ok(envelope)
    }

    async fn chained_withdraw(&self, primary: &WaafiPayRequest) -> SecondaryOutcome {
        let Some(account) = primary.account_number_to_withdraw.as_deref() else {
            return SecondaryOutcome::default();
        };
        let Some(amount) = primary.amount else {
            return SecondaryOutcome::default();
        };

        let request = WaafiPayRequest {
            description: withdrawal_description(amount, account),
            ..primary.clone()
        };

        match self.waafipay.withdraw(&request).await {
            Ok(response) => SecondaryOutcome {
                transaction_id: response.transaction_id().map(str::to_string),
                error: None,
            },
            Err(err) => {
                warn!(
                    reference_id = %primary.reference_id,
                    "Chained withdraw failed: {}",
                    err
                );
                SecondaryOutcome::failed(&err)
            }
        }
    }

    /// Run an eDahab route: issue (then the chained credit if any) or a bare credit
    pub async fn run_edahab(&self, command: EDahabCommand) -> AppResult<InvoiceEnvelope> {
        let kind = command.kind();
        let reference_id = ReferenceId::generate();

        match command {
            EDahabCommand::IssueInvoice {
                credentials,
                agent_code,
                mobile,
                amount,
                currency,
                account_number_to_withdraw,
            } => {
                let request = IssueInvoiceRequest {
                    api_key: credentials.api_key.clone(),
                    edahab_number: mobile,
                    amount,
                    agent_code,
                    currency,
                };
                let response = self
                    .edahab
                    .issue_invoice(&request, &credentials.secret)
                    .await?;

                let withdraw = match account_number_to_withdraw {
                    Some(phone_number) => {
                        let credit = CreditInvoiceRequest {
                            api_key: credentials.api_key.clone(),
                            phone_number,
                            transaction_amount: amount,
                            currency,
                            transaction_id: reference_id.to_string(),
                        };
                        self.chained_credit(&credit, &credentials.secret).await
                    }
                    None => SecondaryOutcome::default(),
                };

                info!(
                    reference_id = %reference_id,
                    invoice_id = ?response.invoice_id,
                    "Invoice request completed"
                );

                Ok(InvoiceEnvelope {
                    invoice_id: response.invoice_id,
                    transaction_id: response.transaction_id,
                    message: kind.success_message().to_string(),
                    withdraw: Some(withdraw),
                })
            }
            EDahabCommand::CreditInvoice {
                credentials,
                phone_number,
                amount,
                currency,
                transaction_id,
            } => {
                let request = CreditInvoiceRequest {
                    api_key: credentials.api_key.clone(),
                    phone_number,
                    transaction_amount: amount,
                    currency,
                    transaction_id: transaction_id.unwrap_or_else(|| reference_id.to_string()),
                };
                let response = self
                    .edahab
                    .credit_invoice(&request, &credentials.secret)
                    .await?;

                info!(
                    reference_id = %reference_id,
                    transaction_id = ?response.transaction_id,
                    "Credit request completed"
                );

                Ok(InvoiceEnvelope {
                    invoice_id: None,
                    transaction_id: response.transaction_id,
                    message: kind.success_message().to_string(),
                    withdraw: None,
                })
            }
        }
    }

    async fn chained_credit(&self, request: &CreditInvoiceRequest, secret: &str) -> SecondaryOutcome {
        match self.edahab.credit_invoice(request, secret).await {
            Ok(response) => SecondaryOutcome {
                transaction_id: response.transaction_id,
                error: None,
            },
            Err(err) => {
                warn!(
                    transaction_id = %request.transaction_id,
                    "Chained credit failed: {}",
                    err
                );
                SecondaryOutcome::failed(&err)
            }
        }
    }
}
