//! Withdrawal policies: provider commission and payee account classification

use crate::payments::types::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Commission WaafiPay keeps on merchant credits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionPolicy {
    pub rate: f64,
    /// Requested amounts at or below this are transferred without commission
    pub waiver_threshold: Option<f64>,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            rate: 0.02,
            waiver_threshold: None,
        }
    }
}

impl CommissionPolicy {
    pub fn commission_for(&self, requested: Amount) -> f64 {
        match self.waiver_threshold {
            Some(threshold) if requested.value() <= threshold => 0.0,
            _ => requested.value() * self.rate,
        }
    }

    /// Amount actually credited to the payee
    pub fn transferred_amount(&self, requested: Amount) -> Amount {
        Amount::new(requested.value() - self.commission_for(requested)).round_to_cents()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Merchant,
    Customer,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Merchant => "MERCHANT",
            AccountType::Customer => "CUSTOMER",
        }
    }
}

/// Rule deciding whether a withdrawal account belongs to a merchant.
///
/// Two rules exist in deployed variants and they disagree on most accounts:
/// an exact length of 6, or a leading `1`. Configured as `length:6` or
/// `prefix:1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum MerchantAccountRule {
    Length(usize),
    Prefix(String),
}

impl Default for MerchantAccountRule {
    fn default() -> Self {
        MerchantAccountRule::Length(6)
    }
}

impl MerchantAccountRule {
    /// Both rules seen in the field, used to flag accounts they classify differently
    pub fn known_rules() -> [MerchantAccountRule; 2] {
        [
            MerchantAccountRule::Length(6),
            MerchantAccountRule::Prefix("1".to_string()),
        ]
    }

    pub fn classify(&self, account: &str) -> AccountType {
        let is_merchant = match self {
            MerchantAccountRule::Length(len) => account.len() == *len,
            MerchantAccountRule::Prefix(prefix) => account.starts_with(prefix.as_str()),
        };
        if is_merchant {
            AccountType::Merchant
        } else {
            AccountType::Customer
        }
    }

    /// The first known rule that classifies `account` differently, if any
    pub fn divergent_rule(&self, account: &str) -> Option<MerchantAccountRule> {
        let ours = self.classify(account);
        Self::known_rules()
            .into_iter()
            .find(|rule| rule != self && rule.classify(account) != ours)
    }
}

impl FromStr for MerchantAccountRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected `length:<n>` or `prefix:<digits>`, got `{}`", s))?;
        match kind.trim() {
            "length" => value
                .trim()
                .parse()
                .map(MerchantAccountRule::Length)
                .map_err(|_| format!("invalid merchant account length: `{}`", value)),
            "prefix" if !value.trim().is_empty() => {
                Ok(MerchantAccountRule::Prefix(value.trim().to_string()))
            }
            _ => Err(format!("unknown merchant account rule: `{}`", s)),
        }
    }
}

impl TryFrom<String> for MerchantAccountRule {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MerchantAccountRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MerchantAccountRule::Length(len) => write!(f, "length:{}", len),
            MerchantAccountRule::Prefix(prefix) => write!(f, "prefix:{}", prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_commission_is_two_percent() {
        let policy = CommissionPolicy::default();
        assert_eq!(policy.transferred_amount(Amount::new(10.0)), Amount::new(9.8));
        assert_eq!(policy.transferred_amount(Amount::new(0.1)), Amount::new(0.1));
        assert!((policy.commission_for(Amount::new(0.1)) - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_waiver_threshold() {
        let policy = CommissionPolicy {
            rate: 0.02,
            waiver_threshold: Some(0.18),
        };
        assert_eq!(policy.commission_for(Amount::new(0.18)), 0.0);
        assert_eq!(policy.transferred_amount(Amount::new(0.18)), Amount::new(0.18));
        assert_eq!(policy.transferred_amount(Amount::new(50.0)), Amount::new(49.0));
    }

    #[test]
    fn test_length_rule() {
        let rule = MerchantAccountRule::Length(6);
        assert_eq!(rule.classify("123456"), AccountType::Merchant);
        assert_eq!(rule.classify("107123456"), AccountType::Customer);
    }

    #[test]
    fn test_prefix_rule() {
        let rule = MerchantAccountRule::Prefix("1".into());
        assert_eq!(rule.classify("107123456"), AccountType::Merchant);
        assert_eq!(rule.classify("612345678"), AccountType::Customer);
    }

    #[test]
    fn test_divergence_is_detected() {
        let rule = MerchantAccountRule::default();
        assert_eq!(
            rule.divergent_rule("107123456"),
            Some(MerchantAccountRule::Prefix("1".into()))
        );
        assert_eq!(rule.divergent_rule("612345678"), None);
    }

    #[test]
    fn test_rule_parsing() {
        assert_eq!("length:6".parse(), Ok(MerchantAccountRule::Length(6)));
        assert_eq!("prefix:1".parse(), Ok(MerchantAccountRule::Prefix("1".into())));
        assert!("length:x".parse::<MerchantAccountRule>().is_err());
        assert!("prefix:".parse::<MerchantAccountRule>().is_err());
        assert!("suffix:1".parse::<MerchantAccountRule>().is_err());
        assert_eq!(MerchantAccountRule::Prefix("1".into()).to_string(), "prefix:1");
    }
}
