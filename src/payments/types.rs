//! Gateway request and response types
//!
//! Wire shapes for WaafiPay (purchase/withdraw/refund/pre-authorization) and
//! eDahab (invoice issue/credit), plus the small value types shared by both.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Monetary amount as carried on the wire.
///
/// Serializes like a JavaScript number: integral values carry no fractional
/// part (`10`, not `10.0`), which keeps signed eDahab payloads stable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Amount(f64);

impl Amount {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn round_to_cents(self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }

    fn as_integer(self) -> Option<i64> {
        const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
        (self.0.is_finite() && self.0.fract() == 0.0 && self.0.abs() <= MAX_SAFE_INTEGER)
            .then_some(self.0 as i64)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_integer() {
            Some(whole) => serializer.serialize_i64(whole),
            None => serializer.serialize_f64(self.0),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_integer() {
            Some(whole) => write!(f, "{}", whole),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Per-request correlation token, generated once and reused by chained calls
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// WaafiPay invoice id: first five characters of the reference, a dash,
    /// then the subscriber number
    pub fn invoice_id(&self, subscriber: &str) -> String {
        let prefix: String = self.0.chars().take(5).collect();
        format!("{}-{}", prefix, subscriber)
    }
}

impl From<&str> for ReferenceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Currencies accepted by eDahab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Slsh,
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "SLSH" => Ok(Currency::Slsh),
            other => Err(format!("unsupported currency: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// WaafiPay
// ---------------------------------------------------------------------------

/// WaafiPay operations, one per `serviceName`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaafiPayOperation {
    Purchase,
    Withdraw,
    Refund,
    PreAuthorize,
    PreAuthorizeCommit,
    PreAuthorizeCancel,
}

impl WaafiPayOperation {
    pub fn service_name(self) -> &'static str {
        match self {
            Self::Purchase => "API_PURCHASE",
            Self::Withdraw => "API_CREDIT_MERCHANT",
            Self::Refund => "API_REFUND",
            Self::PreAuthorize => "API_PREAUTHORIZE",
            Self::PreAuthorizeCommit => "API_PREAUTHORIZE_COMMIT",
            Self::PreAuthorizeCancel => "API_PREAUTHORIZE_CANCEL",
        }
    }

    /// Operations whose success must carry `params.transactionId`
    pub fn requires_transaction_id(self) -> bool {
        matches!(
            self,
            Self::Purchase | Self::Withdraw | Self::Refund | Self::PreAuthorizeCancel
        )
    }

    /// Message used when the transport fails without a status text
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Purchase => "Failed to make payment request",
            Self::Withdraw => "Failed to make withdrawal request",
            Self::Refund => "Failed to make refund request",
            Self::PreAuthorize => "Failed to make pre-authorize request",
            Self::PreAuthorizeCommit => "Failed to make pre-authorize commit request",
            Self::PreAuthorizeCancel => "Failed to make pre-authorize cancel request",
        }
    }
}

impl fmt::Display for WaafiPayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

/// Merchant credentials for WaafiPay, supplied per request by the caller
#[derive(Clone, PartialEq, Eq)]
pub struct WaafiPayCredentials {
    pub merchant_uid: String,
    pub api_user_id: String,
    pub api_key: String,
}

impl fmt::Debug for WaafiPayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaafiPayCredentials")
            .field("merchant_uid", &self.merchant_uid)
            .field("api_user_id", &self.api_user_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Input shared by every WaafiPay operation
#[derive(Debug, Clone, PartialEq)]
pub struct WaafiPayRequest {
    pub credentials: WaafiPayCredentials,
    pub reference_id: ReferenceId,
    pub amount: Option<Amount>,
    pub mobile: Option<String>,
    pub account_number_to_withdraw: Option<String>,
    pub transaction_id: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaafiPayParams {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub account_no: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub account_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub merchant_charges: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub reference_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub issuer_transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub tx_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub order_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
}

/// Raw WaafiPay response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaafiPayResponse {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub schema_version: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub response_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub response_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub error_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub response_msg: Option<String>,
    #[serde(default)]
    pub params: Option<WaafiPayParams>,
}

impl WaafiPayResponse {
    fn param(&self, pick: impl Fn(&WaafiPayParams) -> &Option<String>) -> Option<&str> {
        self.params
            .as_ref()
            .and_then(|p| pick(p).as_deref())
            .filter(|v| !v.is_empty())
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.param(|p| &p.transaction_id)
    }

    pub fn reference_id(&self) -> Option<&str> {
        self.param(|p| &p.reference_id)
    }

    pub fn tx_amount(&self) -> Option<&str> {
        self.param(|p| &p.tx_amount)
    }

    pub fn merchant_charges(&self) -> Option<&str> {
        self.param(|p| &p.merchant_charges)
    }

    pub fn description(&self) -> Option<&str> {
        self.param(|p| &p.description)
    }
}

// ---------------------------------------------------------------------------
// eDahab
// ---------------------------------------------------------------------------

/// eDahab credentials; the secret only ever feeds the request hash
#[derive(Clone, PartialEq, Eq)]
pub struct EDahabCredentials {
    pub api_key: String,
    pub secret: String,
}

impl fmt::Debug for EDahabCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EDahabCredentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Signed issue-invoice payload; field order is the canonical key order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueInvoiceRequest {
    pub api_key: String,
    pub edahab_number: String,
    pub amount: Amount,
    pub agent_code: String,
    pub currency: Currency,
}

/// Signed agent-payment (credit) payload; field order is the canonical key order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditInvoiceRequest {
    pub api_key: String,
    pub phone_number: String,
    pub transaction_amount: Amount,
    pub currency: Currency,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IssueInvoiceResponse {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub invoice_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub invoice_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub status_code: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub status_description: Option<String>,
    #[serde(default)]
    pub validation_errors: Option<serde_json::Value>,
}

impl IssueInvoiceResponse {
    /// `ValidationErrors` flattened to one line; eDahab sends a string or a list
    pub fn validation_message(&self) -> Option<String> {
        let text = match self.validation_errors.as_ref()? {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
            serde_json::Value::Null => return None,
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreditInvoiceResponse {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_status: Option<String>,
    // eDahab's spelling
    #[serde(rename = "TransactionMesage", default, deserialize_with = "lenient::opt_string")]
    pub transaction_message: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub transaction_id: Option<String>,
}

/// Deserializers that accept the loosely typed scalars both gateways emit
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => Some(other.to_string()),
        })
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
        Ok(match Option::<Value>::deserialize(de)? {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }
}
