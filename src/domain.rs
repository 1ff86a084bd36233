use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Route preference the user picked on the send form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutePreference {
    Cost,
    Speed,
}

/// A user's transfer intent. Immutable once handed to the compliance gate;
/// discarded after the orchestration terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub amount: f64,
    pub currency: String,
    pub recipient: String,
    #[serde(default)]
    pub note: Option<String>,
    pub route_preference: RoutePreference,
}

impl TransferIntent {
    /// A submission needs at least a positive amount and a recipient;
    /// everything else is the backend's problem.
    pub fn is_submittable(&self) -> bool {
        self.amount > 0.0 && !self.recipient.trim().is_empty()
    }
}

/// One candidate payment path returned by the routing backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub chain: String,
    pub fee_usd: f64,
    pub eta_seconds: u64,
    pub recommendation_score: f64,
    pub reason: String,
}

/// A full quote: every candidate route plus the backend's pick.
/// Superseded wholesale by each new quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteQuote {
    pub routes: Vec<Route>,
    #[serde(rename = "recommended_route")]
    pub recommended: Route,
}

/// Compliance backend verdict for one intent. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub is_compliant: bool,
    /// 0..=100
    pub risk_score: u8,
    pub reasoning: String,
    #[serde(default)]
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Completed,
    Failed,
}

/// Result of a settlement submission. Terminal once status leaves Pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub settlement_ref: String,
    pub status: SettlementStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedCategory {
    Analysis,
    Rebalance,
    Approval,
    Payment,
    Error,
    Opportunity,
    User,
}

impl FeedCategory {
    /// Actionable items accept approve/reject commands.
    pub fn is_actionable(self) -> bool {
        matches!(self, FeedCategory::Approval | FeedCategory::Opportunity)
    }
}

/// Optional label/value pair rendered under a feed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMeta {
    pub label: String,
    pub value: String,
}

/// One entry in the live activity feed.
///
/// `id` is the identity used for any downstream action: for actionable items
/// this is the backend's request identifier when supplied in metadata, never
/// the log identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub category: FeedCategory,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub meta: Option<FeedMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailedTaskStatus {
    Failed,
    Retrying,
}

/// An asynchronous backend task that exhausted its own retry budget and
/// awaits manual intervention. Payload schema varies by task type, so it
/// stays an opaque JSON value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    pub task_id: String,
    pub task_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub error_message: String,
    pub retry_count: u32,
    pub status: FailedTaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_retry_at: Option<DateTime<Utc>>,
}
