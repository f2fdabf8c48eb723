//! Field validators for inbound payment requests
//!
//! All validators are pure predicates over the raw input. Nothing is trimmed
//! or normalised, so surrounding whitespace or a leading `+` makes a number
//! invalid wherever the rule expects bare digits.

use once_cell::sync::Lazy;
use regex::Regex;

/// Literal marker every WaafiPay API key starts with
pub const API_KEY_PREFIX: &str = "API-";
/// API keys must be strictly longer than this
pub const API_KEY_MIN_EXCLUSIVE_LEN: usize = 15;

const SUBSCRIBER_NUMBER_LEN: usize = 9;
const WITHDRAW_ACCOUNT_LEN: usize = 9;
const WITHDRAW_ACCOUNT_PREFIXES: &[&str] = &["107", "6", "7"];

/// Prefixes owned by one telecom provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPrefixes {
    pub provider: String,
    pub prefixes: Vec<String>,
}

impl ProviderPrefixes {
    pub fn new(provider: impl Into<String>, prefixes: &[&str]) -> Self {
        Self {
            provider: provider.into(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Subscriber-number rule: a fixed length plus a two-character provider prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTable {
    number_len: usize,
    providers: Vec<ProviderPrefixes>,
}

impl PrefixTable {
    pub fn new(number_len: usize, providers: Vec<ProviderPrefixes>) -> Self {
        Self {
            number_len,
            providers,
        }
    }

    /// Subscribers reachable through WaafiPay
    pub fn waafipay() -> Self {
        Self::new(
            SUBSCRIBER_NUMBER_LEN,
            vec![
                ProviderPrefixes::new("hormuud", &["61", "77"]),
                ProviderPrefixes::new("somnet", &["68"]),
                ProviderPrefixes::new("golis", &["90"]),
                ProviderPrefixes::new("telesom", &["63"]),
                ProviderPrefixes::new("soltelco", &["67"]),
            ],
        )
    }

    /// Somtel subscribers reachable through eDahab
    pub fn edahab() -> Self {
        Self::new(
            SUBSCRIBER_NUMBER_LEN,
            vec![ProviderPrefixes::new("somtel", &["62", "65", "66"])],
        )
    }

    /// Provider owning `value`, if the number is well-formed for this table
    pub fn provider_of(&self, value: &str) -> Option<&str> {
        if value.len() != self.number_len {
            return None;
        }
        let key = value.get(..2)?;
        self.providers
            .iter()
            .find(|group| group.prefixes.iter().any(|p| p == key))
            .map(|group| group.provider.as_str())
    }

    pub fn matches(&self, value: &str) -> bool {
        self.provider_of(value).is_some()
    }
}

static WAAFIPAY_SUBSCRIBERS: Lazy<PrefixTable> = Lazy::new(PrefixTable::waafipay);
static EDAHAB_SUBSCRIBERS: Lazy<PrefixTable> = Lazy::new(PrefixTable::edahab);

static WEBSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}(\S*)?$").expect("valid website regex")
});
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static GENERIC_MOBILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+?9[0-9]{8}|\+?252[0-9]{9})$").expect("valid mobile regex")
});

/// WaafiPay subscriber number: 9 characters with a known provider prefix
pub fn is_valid_mobile(value: &str) -> bool {
    WAAFIPAY_SUBSCRIBERS.matches(value)
}

/// eDahab (Somtel) subscriber number
pub fn is_valid_edahab_mobile(value: &str) -> bool {
    EDAHAB_SUBSCRIBERS.matches(value)
}

pub fn is_valid_api_key(value: &str) -> bool {
    value.starts_with(API_KEY_PREFIX) && value.len() > API_KEY_MIN_EXCLUSIVE_LEN
}

/// Account that withdrawn funds are credited to
pub fn is_valid_withdraw_account(value: &str) -> bool {
    value.len() == WITHDRAW_ACCOUNT_LEN
        && WITHDRAW_ACCOUNT_PREFIXES
            .iter()
            .any(|prefix| value.starts_with(prefix))
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn is_valid_website(value: &str) -> bool {
    WEBSITE_RE.is_match(value)
}

/// Broader E.164-style Somali number (`9XXXXXXXX` or `252XXXXXXXXX`, optional `+`)
pub fn is_valid_generic_mobile(value: &str) -> bool {
    GENERIC_MOBILE_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_accepts_known_prefixes() {
        for number in ["611234567", "771234567", "681234567", "901234567", "631234567", "671234567"] {
            assert!(is_valid_mobile(number), "{number} should be valid");
        }
    }

    #[test]
    fn test_mobile_rejects_bad_length_or_prefix() {
        assert!(!is_valid_mobile(""));
        assert!(!is_valid_mobile("61123456"));
        assert!(!is_valid_mobile("6112345678"));
        assert!(!is_valid_mobile("621234567"));
        assert!(!is_valid_mobile(" 61123456"));
        assert!(!is_valid_mobile("+61123456"));
    }

    #[test]
    fn test_provider_lookup() {
        let table = PrefixTable::waafipay();
        assert_eq!(table.provider_of("771234567"), Some("hormuud"));
        assert_eq!(table.provider_of("901234567"), Some("golis"));
        assert_eq!(table.provider_of("551234567"), None);
    }

    #[test]
    fn test_custom_prefix_table() {
        let table = PrefixTable::new(7, vec![ProviderPrefixes::new("test", &["12"])]);
        assert!(table.matches("1234567"));
        assert!(!table.matches("123456789"));
    }

    #[test]
    fn test_edahab_mobile() {
        assert!(is_valid_edahab_mobile("651234567"));
        assert!(is_valid_edahab_mobile("621234567"));
        assert!(!is_valid_edahab_mobile("611234567"));
        assert!(!is_valid_edahab_mobile("65123456"));
    }

    #[test]
    fn test_api_key() {
        assert!(is_valid_api_key("API-123456789012"));
        assert!(!is_valid_api_key("API-1"));
        assert!(!is_valid_api_key("XYZ-123456789012"));
        assert!(!is_valid_api_key("api-123456789012"));
        assert!(!is_valid_api_key("API-12345678901"));
        assert!(!is_valid_api_key(""));
    }

    #[test]
    fn test_withdraw_account() {
        assert!(is_valid_withdraw_account("107123456"));
        assert!(is_valid_withdraw_account("612345678"));
        assert!(is_valid_withdraw_account("712345678"));
        assert!(!is_valid_withdraw_account("10712345"));
        assert!(!is_valid_withdraw_account("6123456789"));
        assert!(!is_valid_withdraw_account("71234567"));
        assert!(!is_valid_withdraw_account("812345678"));
        assert!(!is_valid_withdraw_account(""));
    }

    #[test]
    fn test_validators_are_idempotent() {
        let inputs = ["611234567", "API-123456789012", "712345678", "", "a@b.co"];
        for input in inputs {
            assert_eq!(is_valid_mobile(input), is_valid_mobile(input));
            assert_eq!(is_valid_api_key(input), is_valid_api_key(input));
            assert_eq!(is_valid_withdraw_account(input), is_valid_withdraw_account(input));
            assert_eq!(is_valid_email(input), is_valid_email(input));
        }
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_website() {
        assert!(is_valid_website("example.com"));
        assert!(is_valid_website("https://pay.example.so/checkout?x=1"));
        assert!(!is_valid_website("localhost"));
        assert!(!is_valid_website("ftp://example.com"));
        assert!(!is_valid_website(""));
    }

    #[test]
    fn test_generic_mobile() {
        assert!(is_valid_generic_mobile("912345678"));
        assert!(is_valid_generic_mobile("+912345678"));
        assert!(is_valid_generic_mobile("252612345678"));
        assert!(is_valid_generic_mobile("+252612345678"));
        assert!(!is_valid_generic_mobile("612345678"));
        assert!(!is_valid_generic_mobile("25261234567"));
        assert!(!is_valid_generic_mobile(""));
    }
}
