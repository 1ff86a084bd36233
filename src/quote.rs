use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::backend::{BackendClient, RouteRequest};
use crate::domain::{RoutePreference, RouteQuote};
use crate::error::{PayflowError, Result};

/// One snapshot of the send form, as fed to the quote engine.
#[derive(Debug, Clone)]
pub struct QuoteInput {
    pub amount: f64,
    pub currency: String,
    pub recipient: String,
    pub preference: RoutePreference,
}

impl QuoteInput {
    fn is_quotable(&self) -> bool {
        self.amount > 0.0 && !self.recipient.trim().is_empty()
    }
}

/// Outcome delivered to the quote consumer. Absence of a quote means
/// "unknown", never zero fee.
#[derive(Debug)]
pub enum QuoteOutcome {
    Quote(RouteQuote),
    Unavailable(String),
}

/// Fetch a single quote immediately. Used at submission time, where the
/// orchestrator wants the freshest routes without debouncing.
pub async fn fetch_routes(client: &BackendClient, input: &QuoteInput) -> Result<RouteQuote> {
    if !input.is_quotable() {
        // Short-circuit: incomplete input never reaches the network.
        return Err(PayflowError::QuoteUnavailable(
            "amount and recipient required".into(),
        ));
    }

    let req = RouteRequest {
        amount: input.amount,
        currency: input.currency.clone(),
        recipient: input.recipient.clone(),
        preference: input.preference,
    };

    client
        .calculate_routes(&req)
        .await
        .map_err(|e| PayflowError::QuoteUnavailable(e.to_string()))
}

/// Debounced quote requests for the live send form.
///
/// Each input supersedes the previous one: the pending request (if any) is
/// aborted and a new one is scheduled after the quiet period, so N rapid
/// changes produce at most one network call, with the last input's values.
pub struct QuoteDebouncer {
    client: Arc<BackendClient>,
    quiet_period: Duration,
    outcomes: mpsc::UnboundedSender<QuoteOutcome>,
    pending: Option<JoinHandle<()>>,
}

impl QuoteDebouncer {
    pub fn new(
        client: Arc<BackendClient>,
        quiet_period: Duration,
        outcomes: mpsc::UnboundedSender<QuoteOutcome>,
    ) -> Self {
        Self {
            client,
            quiet_period,
            outcomes,
            pending: None,
        }
    }

    /// Feed one keystroke's worth of form state. Cancels any pending
    /// scheduled request; schedules nothing for unquotable input.
    pub fn on_input(&mut self, input: QuoteInput) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        if !input.is_quotable() {
            return;
        }

        let client = self.client.clone();
        let outcomes = self.outcomes.clone();
        let quiet = self.quiet_period;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let outcome = match fetch_routes(&client, &input).await {
                Ok(quote) => QuoteOutcome::Quote(quote),
                Err(e) => {
                    warn!(error = %e, "quote.debounced_fetch_failed");
                    QuoteOutcome::Unavailable(e.to_string())
                }
            };
            // Receiver may be gone during shutdown.
            let _ = outcomes.send(outcome);
        }));
    }

    /// True while a request is scheduled or in flight.
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for QuoteDebouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn input(amount: f64, recipient: &str) -> QuoteInput {
        QuoteInput {
            amount,
            currency: "USDC".into(),
            recipient: recipient.into(),
            preference: RoutePreference::Cost,
        }
    }

    fn quote_body() -> serde_json::Value {
        json!({
            "routes": [
                {"chain": "base", "fee_usd": 0.12, "eta_seconds": 4,
                 "recommendation_score": 0.93, "reason": "lowest fee"}
            ],
            "recommended_route": {
                "chain": "base", "fee_usd": 0.12, "eta_seconds": 4,
                "recommendation_score": 0.93, "reason": "lowest fee"
            }
        })
    }

    #[tokio::test]
    async fn short_circuit_issues_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/routing/calculate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_body()))
            .expect(0)
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(server.uri()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = QuoteDebouncer::new(client.clone(), Duration::from_millis(10), tx);

        debouncer.on_input(input(0.0, "0xABC"));
        debouncer.on_input(input(-1.0, "0xABC"));
        debouncer.on_input(input(100.0, "   "));
        assert!(!debouncer.has_pending());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        // Direct fetch short-circuits too.
        let err = fetch_routes(&client, &input(0.0, "0xABC")).await.unwrap_err();
        assert!(matches!(err, PayflowError::QuoteUnavailable(_)));
    }

    #[tokio::test]
    async fn rapid_input_collapses_to_one_request_with_last_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/routing/calculate"))
            .and(body_partial_json(json!({"amount": 300.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(quote_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(server.uri()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = QuoteDebouncer::new(client, Duration::from_millis(40), tx);

        debouncer.on_input(input(100.0, "0xABC"));
        debouncer.on_input(input(200.0, "0xABC"));
        debouncer.on_input(input(300.0, "0xABC"));

        let outcome = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("debounced quote should arrive")
            .expect("sender alive");
        assert!(matches!(outcome, QuoteOutcome::Quote(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn backend_failure_reports_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/routing/calculate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Arc::new(BackendClient::new(server.uri()));
        let err = fetch_routes(&client, &input(100.0, "0xABC"))
            .await
            .unwrap_err();
        assert!(matches!(err, PayflowError::QuoteUnavailable(_)));
    }
}
