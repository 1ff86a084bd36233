use reqwest::Client;
use serde::Serialize;
use tracing::warn;

use crate::domain::{ComplianceVerdict, TransferIntent};
use crate::error::PayflowError;

/// Fire-and-forget operator alerts over an optional webhook. Missing
/// configuration is a no-op so dev/test environments need no webhook.
#[derive(Clone)]
pub struct OperatorNotifier {
    webhook_url: Option<String>,
    http: Client,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

impl OperatorNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            http: Client::new(),
        }
    }

    pub async fn alert_blocked(&self, verdict: &ComplianceVerdict) {
        let text = format!(
            "transfer blocked: {} (violations: {})",
            verdict.reasoning,
            verdict.violations.join(", ")
        );
        self.post(&text).await;
    }

    pub async fn alert_execution_failed(&self, intent: &TransferIntent, err: &PayflowError) {
        let text = format!(
            "transfer of {:.2} {} to {} failed: {err}",
            intent.amount, intent.currency, intent.recipient
        );
        self.post(&text).await;
    }

    async fn post(&self, text: &str) {
        let Some(url) = self.webhook_url.as_deref() else {
            return;
        };

        let result = self.http.post(url).json(&WebhookPayload { text }).send().await;
        match result {
            Ok(resp) if !resp.status().is_success() => {
                warn!(status = %resp.status(), "notifier.webhook_rejected");
            }
            Err(e) => warn!(error = %e, "notifier.webhook_failed"),
            Ok(_) => {}
        }
    }
}
