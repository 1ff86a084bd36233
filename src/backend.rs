use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ComplianceVerdict, FailedTask, RoutePreference, RouteQuote, SettlementStatus};

/// HTTP client for the treasury backend (routing, compliance, settlement,
/// agent feed, dead-letter queue). One client instance is shared by every
/// subsystem; reqwest pools connections internally.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub async fn calculate_routes(&self, req: &RouteRequest) -> Result<RouteQuote> {
        let url = format!("{}/routing/calculate", self.base_url);
        let resp = self
            .http
            .post(url)
            .json(req)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn check_compliance(&self, req: &ComplianceRequest) -> Result<ComplianceVerdict> {
        let url = format!("{}/compliance/check", self.base_url);
        let resp = self
            .http
            .post(url)
            .json(req)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn send_transfer(&self, req: &TransferRequest) -> Result<TransferResponse> {
        let url = format!("{}/wallet/send", self.base_url);
        let resp = self
            .http
            .post(url)
            .json(req)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn fetch_feed(&self, limit: usize) -> Result<Vec<FeedEvent>> {
        let url = format!("{}/agents/feed", self.base_url);
        let resp = self
            .http
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// `id` must be the item's resolved request identifier, never the raw
    /// log identifier (the approval endpoint 404s on log ids).
    pub async fn approve_event(&self, id: &str, signature: &str) -> Result<()> {
        let url = format!("{}/agents/approve/{}", self.base_url, id);
        self.http
            .post(url)
            .json(&ApprovalRequest { signature })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn reject_event(&self, id: &str) -> Result<()> {
        let url = format!("{}/agents/reject/{}", self.base_url, id);
        self.http.post(url).send().await?.error_for_status()?;
        Ok(())
    }

    pub async fn list_failed_tasks(&self) -> Result<Vec<FailedTask>> {
        let url = format!("{}/admin/dlq/tasks", self.base_url);
        let resp = self.http.get(url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn retry_task(&self, task_id: &str) -> Result<()> {
        let url = format!("{}/admin/dlq/retry/{}", self.base_url, task_id);
        let resp = self.http.post(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("retry dispatch rejected: {}", resp.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub amount: f64,
    pub currency: String,
    pub recipient: String,
    pub preference: RoutePreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRequest {
    pub sender_name: String,
    pub sender_country: String,
    pub recipient_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_country: Option<String>,
    pub recipient_address: String,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    /// Routes settlement to test networks instead of mainnet.
    pub testnet: bool,
    /// Client-generated idempotency token; the backend deduplicates repeated
    /// submissions carrying the same reference.
    pub reference_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    pub tx_hash: String,
    #[serde(default = "default_settlement_status")]
    pub status: SettlementStatus,
}

fn default_settlement_status() -> SettlementStatus {
    SettlementStatus::Pending
}

#[derive(Serialize)]
struct ApprovalRequest<'a> {
    signature: &'a str,
}

/// Raw event from `GET /agents/feed`. Carries a log identifier in `id`;
/// actionable events carry a distinct request identifier inside `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEvent {
    pub id: String,
    pub agent_type: String,
    pub action_type: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}
