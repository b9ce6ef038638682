use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::gateway::MidtransEnvironment;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/premium";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SENDER: &str = "Rektslixv <rektslixv@gmail.com>";
const DEFAULT_PRODUCT_NAME: &str = "Upgrade Rektslix Premium";
const DEFAULT_PRICE: i64 = 25000;
const DEFAULT_TERM_DAYS: i64 = 30;
const DEFAULT_ID_ATTEMPTS: u32 = 32;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct GatewayConfig {
    pub server_key: String,
    pub environment: MidtransEnvironment,
    /// Overrides the environment's Snap URL when set.
    pub snap_url: Option<String>,
    pub timeout: Duration,
}

pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub timeout: Duration,
}

/// Price and term applied to every new subscription transaction.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    pub product_name: String,
    pub price: i64,
    pub term_days: i64,
    pub max_id_attempts: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            price: DEFAULT_PRICE,
            term_days: DEFAULT_TERM_DAYS,
            max_id_attempts: DEFAULT_ID_ATTEMPTS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SERVER_KEY must be set while WEBHOOK_VERIFY_SIGNATURE is enabled")]
    MissingServerKey,
}

pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub mail: MailConfig,
    pub billing: BillingConfig,
    pub verify_webhook_signature: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            database_url: text("DATABASE_URL", DEFAULT_DATABASE_URL),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            gateway: GatewayConfig {
                server_key: text("SERVER_KEY", ""),
                environment: MidtransEnvironment::parse(&text("MIDTRANS_ENV", "sandbox")),
                snap_url: lookup("MIDTRANS_SNAP_URL").filter(|v| !v.trim().is_empty()),
                timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "GATEWAY_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )),
            },
            mail: MailConfig {
                smtp_host: text("SMTP_HOST", DEFAULT_SMTP_HOST),
                smtp_port: parse_or(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT),
                username: text("EMAIL_SYSTEM", ""),
                password: text("PASSWORD_SYSTEM", ""),
                sender: text("MAIL_SENDER", DEFAULT_SENDER),
                timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "MAIL_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )),
            },
            billing: BillingConfig {
                product_name: text("PRODUCT_NAME", DEFAULT_PRODUCT_NAME),
                price: positive_or(&lookup, "SUBSCRIPTION_PRICE", DEFAULT_PRICE),
                term_days: positive_or(&lookup, "SUBSCRIPTION_TERM_DAYS", DEFAULT_TERM_DAYS),
                max_id_attempts: parse_or(&lookup, "ID_MAX_ATTEMPTS", DEFAULT_ID_ATTEMPTS),
            },
            verify_webhook_signature: parse_or(&lookup, "WEBHOOK_VERIFY_SIGNATURE", true),
        };

        // An empty key turns the notification signature into a plain hash
        // anyone can compute.
        if config.verify_webhook_signature && config.gateway.server_key.trim().is_empty() {
            return Err(ConfigError::MissingServerKey);
        }
        Ok(config)
    }
}

fn positive_or<F>(lookup: &F, key: &str, default: i64) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default);
    if value > 0 {
        value
    } else {
        tracing::warn!("Config: {} must be positive, using default", key);
        default
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Config: invalid value for {}, using default", key);
                default
            }
        },
        None => default,
    }
}
