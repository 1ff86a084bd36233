use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::domain::{
    ComplianceVerdict, FeedCategory, FeedItem, FeedMeta, RouteQuote, TransferIntent,
    TransferResult,
};
use crate::error::{PayflowError, Result};
use crate::executor::TransferExecutor;
use crate::feed::FeedStore;
use crate::gate::{ComplianceGate, GateDisposition};
use crate::journal;
use crate::notifier::OperatorNotifier;
use crate::quote::{fetch_routes, QuoteInput};

/// Lifecycle of one in-flight transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Quoting,
    Gating,
    AwaitingConfirmation,
    Executing,
    Settled,
    Blocked,
    Failed,
}

impl OrchestratorState {
    pub fn name(self) -> &'static str {
        match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Quoting => "quoting",
            OrchestratorState::Gating => "gating",
            OrchestratorState::AwaitingConfirmation => "awaiting_confirmation",
            OrchestratorState::Executing => "executing",
            OrchestratorState::Settled => "settled",
            OrchestratorState::Blocked => "blocked",
            OrchestratorState::Failed => "failed",
        }
    }

    /// Terminal states re-arm on the next submission; mid-flight states
    /// reject it.
    fn accepts_submission(self) -> bool {
        matches!(
            self,
            OrchestratorState::Idle
                | OrchestratorState::Settled
                | OrchestratorState::Blocked
                | OrchestratorState::Failed
        )
    }
}

/// What a completed (non-error) submission step hands back to the caller.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Executed and settled; the UI moves to the history view.
    Settled(TransferResult),
    /// Risk warning: execution is parked until `confirm` or `cancel`.
    AwaitingConfirmation(ComplianceVerdict),
}

struct PendingConfirmation {
    intent: TransferIntent,
    reference_id: Uuid,
    quote: Option<RouteQuote>,
    verdict: ComplianceVerdict,
}

/// Sequences Quote → Gate → (confirmation) → Execute → feed update for one
/// intent at a time. Transitions are strictly sequential; a submission while
/// another intent is mid-flight is rejected, not queued.
///
/// Quoting is advisory: a failed quote is logged and the flow proceeds to
/// gating with the quote recorded as unknown. The gate is never skipped.
pub struct Orchestrator {
    client: Arc<BackendClient>,
    gate: ComplianceGate,
    executor: TransferExecutor,
    feed: Arc<FeedStore>,
    notifier: OperatorNotifier,
    journal_path: Option<PathBuf>,
    default_currency: Option<String>,
    state: OrchestratorState,
    pending: Option<PendingConfirmation>,
    /// Intent and reference of the last attempt that did not settle; a
    /// manual repeat of the same intent reuses the reference so the backend
    /// can deduplicate.
    last_attempt: Option<(TransferIntent, Uuid)>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<BackendClient>,
        gate: ComplianceGate,
        executor: TransferExecutor,
        feed: Arc<FeedStore>,
        notifier: OperatorNotifier,
    ) -> Self {
        Self {
            client,
            gate,
            executor,
            feed,
            notifier,
            journal_path: None,
            default_currency: None,
            state: OrchestratorState::Idle,
            pending: None,
            last_attempt: None,
        }
    }

    /// Settled transfers get appended to this history file.
    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    /// Currency assumed when the send form leaves it blank. Part of the
    /// config snapshot taken at construction, not read mid-flow.
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = Some(currency.into());
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Drive one intent from submission to settlement, block, or failure.
    pub async fn submit(&mut self, mut intent: TransferIntent) -> Result<SubmitOutcome> {
        if !self.state.accepts_submission() {
            return Err(PayflowError::Busy);
        }
        if intent.currency.trim().is_empty() {
            if let Some(currency) = &self.default_currency {
                intent.currency = currency.clone();
            }
        }
        if !intent.is_submittable() {
            // No transition: an incomplete form is a no-op, not a flow.
            return Err(PayflowError::InvalidIntent(
                "amount and recipient are required".into(),
            ));
        }

        let reference_id = self.reference_for(&intent);
        info!(?intent, %reference_id, "orchestrator.submit");

        self.transition(OrchestratorState::Quoting);
        let quote_input = QuoteInput {
            amount: intent.amount,
            currency: intent.currency.clone(),
            recipient: intent.recipient.clone(),
            preference: intent.route_preference,
        };
        let quote = match fetch_routes(&self.client, &quote_input).await {
            Ok(q) => Some(q),
            Err(e) => {
                // Advisory-only quote policy: unknown fee, flow continues.
                warn!(error = %e, "orchestrator.quote_unavailable");
                None
            }
        };

        self.transition(OrchestratorState::Gating);
        let disposition = match self.gate.check(&intent).await {
            Ok(d) => d,
            Err(e) => {
                // Unknown verdict is a hard stop; never execute blind.
                self.transition(OrchestratorState::Failed);
                return Err(e);
            }
        };

        match disposition {
            GateDisposition::Safe(verdict) => {
                self.execute_phase(intent, Some(verdict.risk_score), quote, reference_id)
                    .await
            }
            GateDisposition::Warning(verdict) => {
                self.pending = Some(PendingConfirmation {
                    intent,
                    reference_id,
                    quote,
                    verdict: verdict.clone(),
                });
                self.transition(OrchestratorState::AwaitingConfirmation);
                Ok(SubmitOutcome::AwaitingConfirmation(verdict))
            }
            GateDisposition::Block(verdict) => {
                self.transition(OrchestratorState::Blocked);
                self.last_attempt = None;
                self.notifier.alert_blocked(&verdict).await;
                Err(PayflowError::ComplianceBlocked(verdict))
            }
        }
    }

    /// User accepted the risk warning: execute with the already-computed
    /// risk score. Valid only while awaiting confirmation.
    pub async fn confirm(&mut self) -> Result<SubmitOutcome> {
        if self.state != OrchestratorState::AwaitingConfirmation {
            return Err(PayflowError::InvalidTransition {
                state: self.state.name(),
                action: "confirm",
            });
        }
        let pending = self.pending.take().ok_or(PayflowError::InvalidTransition {
            state: self.state.name(),
            action: "confirm",
        })?;
        self.execute_phase(
            pending.intent,
            Some(pending.verdict.risk_score),
            pending.quote,
            pending.reference_id,
        )
        .await
    }

    /// User declined the risk warning. Terminal for the intent; nothing is
    /// recorded.
    pub fn cancel(&mut self) -> Result<()> {
        if self.state != OrchestratorState::AwaitingConfirmation {
            return Err(PayflowError::InvalidTransition {
                state: self.state.name(),
                action: "cancel",
            });
        }
        self.pending = None;
        self.last_attempt = None;
        self.transition(OrchestratorState::Idle);
        Ok(())
    }

    async fn execute_phase(
        &mut self,
        intent: TransferIntent,
        risk_score: Option<u8>,
        quote: Option<RouteQuote>,
        reference_id: Uuid,
    ) -> Result<SubmitOutcome> {
        self.transition(OrchestratorState::Executing);

        match self.executor.execute(&intent, risk_score, reference_id).await {
            Ok(result) => {
                self.transition(OrchestratorState::Settled);
                self.last_attempt = None;
                self.feed
                    .push_user(user_feed_item(&intent, &result, reference_id));
                if let Some(path) = &self.journal_path {
                    if let Err(e) =
                        journal::append_settled(path, &intent, &result, risk_score, quote.as_ref())
                    {
                        warn!(error = %e, "orchestrator.journal_append_failed");
                    }
                }
                Ok(SubmitOutcome::Settled(result))
            }
            Err(e) => {
                // No feed item, no silent retry: surface the raw message and
                // hand the machine back for re-submission.
                self.transition(OrchestratorState::Failed);
                self.notifier.alert_execution_failed(&intent, &e).await;
                self.transition(OrchestratorState::Idle);
                Err(e)
            }
        }
    }

    fn reference_for(&mut self, intent: &TransferIntent) -> Uuid {
        if let Some((prev, id)) = &self.last_attempt {
            if prev == intent {
                return *id;
            }
        }
        let id = Uuid::new_v4();
        self.last_attempt = Some((intent.clone(), id));
        id
    }

    fn transition(&mut self, to: OrchestratorState) {
        info!(from = self.state.name(), to = to.name(), "orchestrator.transition");
        self.state = to;
    }
}

fn user_feed_item(intent: &TransferIntent, result: &TransferResult, reference_id: Uuid) -> FeedItem {
    FeedItem {
        id: format!("user-{reference_id}"),
        category: FeedCategory::User,
        title: "Transfer sent".into(),
        description: format!(
            "{:.2} {} to {}",
            intent.amount, intent.currency, intent.recipient
        ),
        timestamp: Utc::now(),
        meta: Some(FeedMeta {
            label: "settlement_ref".into(),
            value: result.settlement_ref.clone(),
        }),
    }
}
