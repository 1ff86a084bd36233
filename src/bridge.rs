use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PayflowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitDirection {
    Deposit,
    Withdraw,
}

/// Cross-domain exit lifecycle: request → PROCESSING → finalize (after the
/// challenge period) → FINALIZING → RELEASED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitStatus {
    Processing,
    Finalizing,
    Released,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExitRequest {
    pub amount: f64,
    pub currency: String,
    pub direction: ExitDirection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExitHandle {
    pub exit_id: String,
    pub status: ExitStatus,
}

#[derive(Debug, Deserialize)]
struct FinalizeRejection {
    #[serde(default)]
    error: String,
    #[serde(default)]
    remaining_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FinalizeResponse {
    status: ExitStatus,
}

/// Two-phase bridge withdrawals against the settlement backend.
#[derive(Clone)]
pub struct BridgeClient {
    base_url: String,
    http: Client,
}

impl BridgeClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub async fn start_exit(&self, req: &ExitRequest) -> Result<ExitHandle> {
        let url = format!("{}/bridge/exit", self.base_url);
        let resp = self
            .http
            .post(url)
            .json(req)
            .send()
            .await
            .map_err(|e| PayflowError::ExecutionFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| PayflowError::ExecutionFailed(e.to_string()))?;

        let handle: ExitHandle = resp
            .json()
            .await
            .map_err(|e| PayflowError::ExecutionFailed(e.to_string()))?;
        info!(exit_id = %handle.exit_id, status = ?handle.status, "bridge.exit_started");
        Ok(handle)
    }

    /// Finalize a processed exit. A finalize attempt inside the challenge
    /// period comes back as a conflict and maps to its own error variant so
    /// callers can show "still waiting" instead of a generic failure.
    pub async fn finalize(&self, exit_id: &str) -> Result<ExitStatus> {
        let url = format!("{}/bridge/finalize/{}", self.base_url, exit_id);
        let resp = self
            .http
            .post(url)
            .send()
            .await
            .map_err(|e| PayflowError::ExecutionFailed(e.to_string()))?;

        if resp.status() == StatusCode::CONFLICT {
            let rejection: FinalizeRejection = resp.json().await.unwrap_or(FinalizeRejection {
                error: "CHALLENGE_PERIOD_ACTIVE".into(),
                remaining_secs: None,
            });
            if rejection.error == "CHALLENGE_PERIOD_ACTIVE" {
                return Err(PayflowError::ChallengePeriodActive {
                    exit_id: exit_id.to_owned(),
                    remaining_secs: rejection.remaining_secs,
                });
            }
            return Err(PayflowError::ExecutionFailed(rejection.error));
        }

        let resp = resp
            .error_for_status()
            .map_err(|e| PayflowError::ExecutionFailed(e.to_string()))?;
        let body: FinalizeResponse = resp
            .json()
            .await
            .map_err(|e| PayflowError::ExecutionFailed(e.to_string()))?;
        info!(exit_id, status = ?body.status, "bridge.finalize");
        Ok(body.status)
    }
}
