use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::dlq::DlqConsole;
use crate::executor::TransferExecutor;
use crate::feed::{FeedReconciler, FeedStore};
use crate::gate::ComplianceGate;
use crate::notifier::OperatorNotifier;
use crate::orchestrator::Orchestrator;
use crate::quote::{QuoteDebouncer, QuoteOutcome};

/// Composition root: every subsystem wired from one config snapshot.
///
/// The orchestrator and quote debouncer stay with the caller-facing side
/// (driven by UI submissions); `run` owns the polling loops.
pub struct App {
    pub orchestrator: Orchestrator,
    pub quotes: QuoteDebouncer,
    pub quote_outcomes: mpsc::UnboundedReceiver<QuoteOutcome>,
    pub feed: Arc<FeedStore>,
    pub dlq: Arc<DlqConsole>,
    reconciler: FeedReconciler,
}

impl App {
    pub fn from_config(cfg: &Config) -> Self {
        let client = Arc::new(BackendClient::new(cfg.backend_base_url.clone()));
        let feed = Arc::new(FeedStore::new());

        let (quote_tx, quote_outcomes) = mpsc::unbounded_channel();
        let quotes = QuoteDebouncer::new(
            client.clone(),
            Duration::from_millis(cfg.quote_quiet_period_ms),
            quote_tx,
        );

        let orchestrator = Orchestrator::new(
            client.clone(),
            ComplianceGate::new(client.clone(), cfg.sender_profile()),
            TransferExecutor::new(client.clone(), cfg.testnet),
            feed.clone(),
            OperatorNotifier::new(cfg.operator_webhook_url.clone()),
        )
        .with_journal(&cfg.journal_path)
        .with_default_currency(&cfg.default_currency);

        let reconciler = FeedReconciler::new(
            client.clone(),
            feed.clone(),
            Duration::from_secs(cfg.feed_poll_secs),
            cfg.feed_limit,
        );
        let dlq = Arc::new(DlqConsole::new(
            client,
            Duration::from_secs(cfg.dlq_poll_secs),
        ));

        Self {
            orchestrator,
            quotes,
            quote_outcomes,
            feed,
            dlq,
            reconciler,
        }
    }

    /// Spawn the polling subsystems and park until shutdown.
    pub async fn run(self) -> Result<()> {
        let App {
            reconciler, dlq, ..
        } = self;

        tokio::spawn(reconciler.run());
        tokio::spawn(dlq.run());

        tokio::signal::ctrl_c().await?;
        info!("shutdown");
        Ok(())
    }
}
