use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Sender identity attached to every compliance check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderProfile {
    pub name: String,
    pub country: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Backend
    pub backend_base_url: String,

    // Alerts
    pub operator_webhook_url: Option<String>,

    // Runtime
    pub testnet: bool,
    pub default_currency: String,

    // Compliance sender profile
    pub sender_name: String,
    pub sender_country: String,
    pub payment_method: String,

    // Quoting
    pub quote_quiet_period_ms: u64,

    // Polling
    pub feed_poll_secs: u64,
    pub feed_limit: usize,
    pub dlq_poll_secs: u64,

    // Persistence
    pub journal_path: String,
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|s| s.trim().to_lowercase()) {
        None => default,
        Some(v) if v.is_empty() => default,
        Some(v) if v == "1" || v == "true" || v == "yes" || v == "y" || v == "on" => true,
        Some(v) if v == "0" || v == "false" || v == "no" || v == "n" || v == "off" => false,
        Some(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|x| x.parse().ok())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend_base_url = std::env::var("PAYFLOW_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let operator_webhook_url = std::env::var("PAYFLOW_OPERATOR_WEBHOOK").ok();

        let testnet = env_bool("PAYFLOW_TESTNET", false);
        let default_currency =
            std::env::var("PAYFLOW_CURRENCY").unwrap_or_else(|_| "USDC".to_string());

        let sender_name =
            std::env::var("PAYFLOW_SENDER_NAME").unwrap_or_else(|_| "Treasury Desk".to_string());
        let sender_country =
            std::env::var("PAYFLOW_SENDER_COUNTRY").unwrap_or_else(|_| "US".to_string());
        let payment_method = std::env::var("PAYFLOW_PAYMENT_METHOD")
            .unwrap_or_else(|_| "crypto_transfer".to_string());

        let quote_quiet_period_ms = env_parse::<u64>("PAYFLOW_QUOTE_QUIET_MS").unwrap_or(800);
        if quote_quiet_period_ms == 0 {
            return Err(anyhow!("PAYFLOW_QUOTE_QUIET_MS cannot be 0"));
        }

        let feed_poll_secs = env_parse::<u64>("PAYFLOW_FEED_POLL_SECS").unwrap_or(5);
        let feed_limit = env_parse::<usize>("PAYFLOW_FEED_LIMIT").unwrap_or(50);
        let dlq_poll_secs = env_parse::<u64>("PAYFLOW_DLQ_POLL_SECS").unwrap_or(10);
        if feed_poll_secs == 0 || dlq_poll_secs == 0 {
            return Err(anyhow!("poll intervals cannot be 0"));
        }
        if feed_limit == 0 {
            return Err(anyhow!("PAYFLOW_FEED_LIMIT cannot be 0"));
        }

        let journal_path = std::env::var("PAYFLOW_JOURNAL_PATH")
            .unwrap_or_else(|_| "./docs/transfers.md".to_string());

        Ok(Self {
            backend_base_url,
            operator_webhook_url,
            testnet,
            default_currency,
            sender_name,
            sender_country,
            payment_method,
            quote_quiet_period_ms,
            feed_poll_secs,
            feed_limit,
            dlq_poll_secs,
            journal_path,
        })
    }

    /// Snapshot of the sender identity handed to the compliance gate at
    /// construction; the gate never reads ambient state mid-flow.
    pub fn sender_profile(&self) -> SenderProfile {
        SenderProfile {
            name: self.sender_name.clone(),
            country: self.sender_country.clone(),
            payment_method: self.payment_method.clone(),
        }
    }
}
