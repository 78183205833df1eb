use billing_core::config as core_config;
use billing_core::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl InvoiceConfig {
    /// Load the shared settings, then the service-specific ones from the
    /// environment. In prod every variable without a default must be set.
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(InvoiceConfig {
            common,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("invoice_db"), is_prod)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(_) => {
            if is_prod {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} must be set in prod",
                    key
                )));
            }
            default.map(str::to_owned).ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("{} is not set and has no default", key))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn load_uses_defaults_outside_prod() {
        env::remove_var("ENVIRONMENT");
        env::remove_var("MONGODB_URI");
        env::remove_var("MONGODB_DATABASE");
        env::remove_var("APP__PORT");

        let config = InvoiceConfig::load().unwrap();
        assert_eq!(config.common.port, 8080);
        assert_eq!(config.mongodb.uri, "mongodb://localhost:27017");
        assert_eq!(config.mongodb.database, "invoice_db");
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        env::remove_var("ENVIRONMENT");
        env::set_var("MONGODB_DATABASE", "invoice_staging");

        let config = InvoiceConfig::load().unwrap();
        assert_eq!(config.mongodb.database, "invoice_staging");

        env::remove_var("MONGODB_DATABASE");
    }

    #[test]
    #[serial]
    fn prod_requires_explicit_values() {
        env::set_var("ENVIRONMENT", "prod");
        env::remove_var("MONGODB_URI");

        let result = InvoiceConfig::load();
        assert!(result.is_err());

        env::remove_var("ENVIRONMENT");
    }
}
