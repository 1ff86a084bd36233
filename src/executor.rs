use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::backend::{BackendClient, TransferRequest};
use crate::domain::{TransferIntent, TransferResult};
use crate::error::{PayflowError, Result};

/// Submits confirmed intents to the settlement backend.
///
/// Failure is terminal for the attempt: financial transfers are never
/// retried blindly, re-initiation is the user's call. The caller-supplied
/// reference id lets the backend deduplicate a manually repeated submission.
pub struct TransferExecutor {
    client: Arc<BackendClient>,
    testnet: bool,
}

impl TransferExecutor {
    pub fn new(client: Arc<BackendClient>, testnet: bool) -> Self {
        Self { client, testnet }
    }

    pub async fn execute(
        &self,
        intent: &TransferIntent,
        risk_score: Option<u8>,
        reference_id: Uuid,
    ) -> Result<TransferResult> {
        let req = TransferRequest {
            recipient: intent.recipient.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            note: intent.note.clone(),
            risk_score,
            testnet: self.testnet,
            reference_id,
        };

        let resp = self
            .client
            .send_transfer(&req)
            .await
            .map_err(|e| PayflowError::ExecutionFailed(e.to_string()))?;

        info!(
            settlement_ref = %resp.tx_hash,
            %reference_id,
            testnet = self.testnet,
            "executor.settled"
        );

        Ok(TransferResult {
            settlement_ref: resp.tx_hash,
            status: resp.status,
        })
    }
}
