use crate::payments::providers::{EDahabConfig, WaafiPayConfig};
use ::config::{Environment, Map};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const ENV_PREFIX: &str = "PAYBRIDGE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub waafipay: WaafiPayConfig,
    pub edahab: EDahabConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    /// Defaults overridden by `PAYBRIDGE_*` environment variables
    /// (`PAYBRIDGE_SERVER__PORT`, `PAYBRIDGE_WAAFIPAY__COMMISSION_RATE`, ...)
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Like [`Config::from_env`], reading variables from `vars` instead of the process
    pub fn from_vars(vars: Map<String, String>) -> Result<Self> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<Map<String, String>>) -> Result<Self> {
        let waafipay = WaafiPayConfig::default();
        let edahab = EDahabConfig::default();

        let settings = ::config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("server.environment", "development")?
            .set_default("waafipay.endpoint", waafipay.endpoint)?
            .set_default("waafipay.timeout_secs", waafipay.timeout_secs as i64)?
            .set_default("waafipay.commission_rate", waafipay.commission_rate)?
            .set_default(
                "waafipay.merchant_account_rule",
                waafipay.merchant_account_rule.to_string(),
            )?
            .set_default("edahab.base_url", edahab.base_url)?
            .set_default("edahab.timeout_secs", edahab.timeout_secs as i64)?
            .set_default("logging.format", "text")?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        // Validate upstream URLs are not empty
        if self.waafipay.endpoint.trim().is_empty() {
            return Err(anyhow!("WaafiPay endpoint cannot be empty"));
        }

        if self.edahab.base_url.trim().is_empty() {
            return Err(anyhow!("eDahab base URL cannot be empty"));
        }

        if self.waafipay.timeout_secs == 0 || self.edahab.timeout_secs == 0 {
            return Err(anyhow!("Upstream timeouts must be greater than 0"));
        }

        let rate = self.waafipay.commission_rate;
        if !(0.0..1.0).contains(&rate) {
            return Err(anyhow!(
                "Commission rate must be in [0, 1), got {}",
                rate
            ));
        }

        if let Some(threshold) = self.waafipay.commission_waiver_threshold {
            if threshold < 0.0 {
                return Err(anyhow!(
                    "Commission waiver threshold cannot be negative, got {}",
                    threshold
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::policy::MerchantAccountRule;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Map::new()).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.server.environment, "development");
        assert_eq!(config.waafipay, WaafiPayConfig::default());
        assert_eq!(config.edahab, EDahabConfig::default());
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_vars(vars(&[
            ("PAYBRIDGE_SERVER__PORT", "9090"),
            ("PAYBRIDGE_SERVER__ENVIRONMENT", "production"),
            ("PAYBRIDGE_WAAFIPAY__COMMISSION_RATE", "0.03"),
            ("PAYBRIDGE_WAAFIPAY__COMMISSION_WAIVER_THRESHOLD", "0.18"),
            ("PAYBRIDGE_WAAFIPAY__MERCHANT_ACCOUNT_RULE", "prefix:1"),
            ("PAYBRIDGE_EDAHAB__BASE_URL", "http://localhost:9000/api"),
            ("PAYBRIDGE_LOGGING__FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.environment, "production");
        assert_eq!(config.waafipay.commission_rate, 0.03);
        assert_eq!(config.waafipay.commission_waiver_threshold, Some(0.18));
        assert_eq!(
            config.waafipay.merchant_account_rule,
            MerchantAccountRule::Prefix("1".into())
        );
        assert_eq!(config.edahab.base_url, "http://localhost:9000/api");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for (key, value) in [
            ("PAYBRIDGE_SERVER__PORT", "80"),
            ("PAYBRIDGE_SERVER__ENVIRONMENT", "qa"),
            ("PAYBRIDGE_WAAFIPAY__COMMISSION_RATE", "1.5"),
            ("PAYBRIDGE_WAAFIPAY__COMMISSION_WAIVER_THRESHOLD", "-1"),
            ("PAYBRIDGE_WAAFIPAY__TIMEOUT_SECS", "0"),
            ("PAYBRIDGE_WAAFIPAY__MERCHANT_ACCOUNT_RULE", "suffix:1"),
            ("PAYBRIDGE_LOGGING__FORMAT", "xml"),
        ] {
            assert!(
                Config::from_vars(vars(&[(key, value)])).is_err(),
                "{key}={value} should be rejected"
            );
        }
    }
}
