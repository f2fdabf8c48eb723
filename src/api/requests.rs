//! Inbound request bodies and their validation into commands
//!
//! Checks run in a fixed order per route and the first failure wins.

use crate::error::{AppError, AppResult};
use crate::payments::flow::{withdrawal_description, EDahabCommand, OperationKind, WaafiPayCommand};
use crate::payments::types::{Amount, Currency, EDahabCredentials, WaafiPayCredentials};
use crate::validation::{
    is_valid_api_key, is_valid_edahab_mobile, is_valid_mobile, is_valid_withdraw_account,
};
use serde::Deserialize;

/// `amount` as sent by callers: a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

/// Transaction ids arrive as numbers or strings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Number(serde_json::Number),
    Text(String),
}

impl IdInput {
    fn into_string(self) -> String {
        match self {
            IdInput::Number(n) => n.to_string(),
            IdInput::Text(s) => s,
        }
    }
}

/// `mobile` as sent. Non-string values are kept so they fail the format check
/// instead of the body extraction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MobileInput {
    Text(String),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CredentialsBody {
    #[serde(rename = "merchantUId")]
    pub merchant_uid: Option<String>,
    #[serde(rename = "apiUId")]
    pub api_uid: Option<String>,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    #[serde(rename = "accountNumberToWithdraw")]
    pub account_number_to_withdraw: Option<String>,
    pub secret: Option<String>,
    #[serde(rename = "agentCode")]
    pub agent_code: Option<String>,
}

/// Union of the fields any payment route reads
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub mobile: Option<MobileInput>,
    pub amount: Option<AmountInput>,
    pub custom_reference: Option<String>,
    pub description: Option<String>,
    pub transaction_id: Option<IdInput>,
    pub reason: Option<String>,
    pub currency: Option<String>,
    pub credentials: Option<CredentialsBody>,
}

/// Empty strings count as missing
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn require(value: Option<String>, message: &str) -> AppResult<String> {
    present(value).ok_or_else(|| AppError::validation(message))
}

fn parse_amount(input: Option<AmountInput>) -> AppResult<Amount> {
    let value = match input {
        None => return Err(AppError::validation("Missing amount")),
        Some(AmountInput::Number(n)) if n == 0.0 => {
            return Err(AppError::validation("Missing amount"))
        }
        Some(AmountInput::Number(n)) => n,
        Some(AmountInput::Text(s)) if s.is_empty() => {
            return Err(AppError::validation("Missing amount"))
        }
        Some(AmountInput::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::validation("Amount must be a number"))?,
    };

    if !value.is_finite() {
        return Err(AppError::validation("Amount must be a number"));
    }
    if value <= 0.0 {
        return Err(AppError::validation("Amount must be greater than 0"));
    }
    Ok(Amount::new(value))
}

fn parse_currency(input: Option<String>) -> AppResult<Currency> {
    match present(input) {
        None => Ok(Currency::default()),
        Some(value) => value
            .parse()
            .map_err(|_| AppError::validation("Currency is not valid")),
    }
}

fn require_transaction_id(input: Option<IdInput>) -> AppResult<String> {
    require(input.map(IdInput::into_string), "Missing transactionId")
}

/// Validated WaafiPay credentials plus the optional withdraw target
fn waafipay_credentials(
    body: Option<CredentialsBody>,
) -> AppResult<(WaafiPayCredentials, Option<String>)> {
    let body = body.ok_or_else(|| AppError::validation("Missing credentials"))?;
    let missing = || AppError::validation("Missing credentials");
    let merchant_uid = present(body.merchant_uid).ok_or_else(missing)?;
    let api_user_id = present(body.api_uid).ok_or_else(missing)?;
    let api_key = present(body.api_key).ok_or_else(missing)?;

    if !is_valid_api_key(&api_key) {
        return Err(AppError::validation("API key is not valid"));
    }

    Ok((
        WaafiPayCredentials {
            merchant_uid,
            api_user_id,
            api_key,
        },
        present(body.account_number_to_withdraw),
    ))
}

fn check_withdraw_account(account: Option<&str>, is_valid: fn(&str) -> bool) -> AppResult<()> {
    match account {
        Some(account) if !is_valid(account) => Err(AppError::validation(
            "Account number to withdraw is not valid",
        )),
        _ => Ok(()),
    }
}

fn require_mobile(mobile: Option<String>, is_valid: fn(&str) -> bool) -> AppResult<String> {
    let mobile = require(mobile, "Missing mobile")?;
    if !is_valid(&mobile) {
        return Err(AppError::validation("Mobile number is not valid"));
    }
    Ok(mobile)
}

fn require_mobile_input(
    mobile: Option<MobileInput>,
    is_valid: fn(&str) -> bool,
) -> AppResult<String> {
    match mobile {
        Some(MobileInput::Text(text)) => require_mobile(Some(text), is_valid),
        // 0 and false read as absent, like an empty string
        Some(MobileInput::Other(serde_json::Value::Bool(false))) | None => {
            Err(AppError::validation("Missing mobile"))
        }
        Some(MobileInput::Other(serde_json::Value::Number(n))) if n.as_f64() == Some(0.0) => {
            Err(AppError::validation("Missing mobile"))
        }
        Some(MobileInput::Other(_)) => Err(AppError::validation("Mobile number is not valid")),
    }
}

impl PaymentBody {
    /// Purchase, or commit of a pre-authorization; both chain a withdraw
    pub fn into_payment(self, kind: OperationKind) -> AppResult<WaafiPayCommand> {
        let transaction_id = match kind {
            OperationKind::PreAuthorizeCommit => Some(require_transaction_id(self.transaction_id)?),
            _ => None,
        };
        let amount = parse_amount(self.amount)?;
        let mobile = require_mobile_input(self.mobile, is_valid_mobile)?;
        let (credentials, withdraw_to) = waafipay_credentials(self.credentials)?;
        check_withdraw_account(withdraw_to.as_deref(), is_valid_withdraw_account)?;

        let description = present(self.description)
            .unwrap_or_else(|| format!("{} has paid {} dollars", mobile, amount));

        Ok(WaafiPayCommand {
            kind,
            credentials,
            amount: Some(amount),
            mobile: Some(mobile),
            transaction_id,
            custom_reference: present(self.custom_reference),
            description,
            account_number_to_withdraw: withdraw_to,
        })
    }

    pub fn into_pre_authorize(self) -> AppResult<WaafiPayCommand> {
        let amount = parse_amount(self.amount)?;
        let mobile = require_mobile_input(self.mobile, is_valid_mobile)?;
        let (credentials, _) = waafipay_credentials(self.credentials)?;

        let description = present(self.description)
            .unwrap_or_else(|| format!("{} has pre-authorized {} dollars", mobile, amount));

        Ok(WaafiPayCommand {
            kind: OperationKind::PreAuthorize,
            credentials,
            amount: Some(amount),
            mobile: Some(mobile),
            transaction_id: None,
            custom_reference: present(self.custom_reference),
            description,
            account_number_to_withdraw: None,
        })
    }

    pub fn into_refund(self) -> AppResult<WaafiPayCommand> {
        let transaction_id = require_transaction_id(self.transaction_id)?;
        let reason = require(self.reason, "Missing reason")?;
        let amount = parse_amount(self.amount)?;
        let (credentials, _) = waafipay_credentials(self.credentials)?;

        Ok(WaafiPayCommand {
            kind: OperationKind::Refund,
            credentials,
            amount: Some(amount),
            mobile: None,
            transaction_id: Some(transaction_id),
            custom_reference: present(self.custom_reference),
            description: reason,
            account_number_to_withdraw: None,
        })
    }

    pub fn into_withdraw(self) -> AppResult<WaafiPayCommand> {
        let amount = parse_amount(self.amount)?;
        let (credentials, account) = waafipay_credentials(self.credentials)?;
        let account = account
            .ok_or_else(|| AppError::validation("Missing account number to withdraw"))?;
        check_withdraw_account(Some(&account), is_valid_withdraw_account)?;

        let description =
            present(self.description).unwrap_or_else(|| withdrawal_description(amount, &account));

        Ok(WaafiPayCommand {
            kind: OperationKind::Withdraw,
            credentials,
            amount: Some(amount),
            mobile: None,
            transaction_id: None,
            custom_reference: None,
            description,
            account_number_to_withdraw: Some(account),
        })
    }

    pub fn into_cancel(self) -> AppResult<WaafiPayCommand> {
        let transaction_id = require_transaction_id(self.transaction_id)?;
        let (credentials, _) = waafipay_credentials(self.credentials)?;

        let description = present(self.description).unwrap_or_else(|| {
            format!("Pre-authorization {} has been cancelled", transaction_id)
        });

        Ok(WaafiPayCommand {
            kind: OperationKind::PreAuthorizeCancel,
            credentials,
            amount: None,
            mobile: None,
            transaction_id: Some(transaction_id),
            custom_reference: present(self.custom_reference),
            description,
            account_number_to_withdraw: None,
        })
    }

    pub fn into_issue_invoice(self) -> AppResult<EDahabCommand> {
        let amount = parse_amount(self.amount)?;
        let mobile = require_mobile_input(self.mobile, is_valid_edahab_mobile)?;
        let currency = parse_currency(self.currency)?;

        let body = self
            .credentials
            .ok_or_else(|| AppError::validation("Missing credentials"))?;
        let missing = || AppError::validation("Missing credentials");
        let secret = present(body.secret).ok_or_else(missing)?;
        let agent_code = present(body.agent_code).ok_or_else(missing)?;
        let api_key = present(body.api_key).ok_or_else(missing)?;

        let account_number_to_withdraw = present(body.account_number_to_withdraw);
        check_withdraw_account(account_number_to_withdraw.as_deref(), is_valid_edahab_mobile)?;

        Ok(EDahabCommand::IssueInvoice {
            credentials: EDahabCredentials { api_key, secret },
            agent_code,
            mobile,
            amount,
            currency,
            account_number_to_withdraw,
        })
    }

    pub fn into_credit_invoice(self) -> AppResult<EDahabCommand> {
        let amount = parse_amount(self.amount)?;

        let body = self
            .credentials
            .ok_or_else(|| AppError::validation("Missing credentials"))?;
        let missing = || AppError::validation("Missing credentials");
        let secret = present(body.secret).ok_or_else(missing)?;
        let api_key = present(body.api_key).ok_or_else(missing)?;

        let phone_number = require_mobile(body.account_number_to_withdraw, is_valid_edahab_mobile)?;
        let currency = parse_currency(self.currency)?;

        Ok(EDahabCommand::CreditInvoice {
            credentials: EDahabCredentials { api_key, secret },
            phone_number,
            amount,
            currency,
            transaction_id: present(self.transaction_id.map(IdInput::into_string)),
        })
    }
}
