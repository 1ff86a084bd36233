use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{info, warn};

use crate::backend::{BackendClient, FeedEvent};
use crate::domain::{FeedCategory, FeedItem, FeedMeta};
use crate::error::{PayflowError, Result};

/// Rendered feed list. Single writer per cycle: the reconciler replaces the
/// server-sourced portion wholesale, the orchestrator appends optimistic
/// USER entries between polls.
#[derive(Default)]
pub struct FeedStore {
    items: Mutex<Vec<FeedItem>>,
}

// A panicked writer must not take the rendered feed down with it.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<FeedItem> {
        lock(&self.items).clone()
    }

    /// Record a locally originated entry. Retained across merges until a
    /// backend item with the same id supersedes it.
    pub fn push_user(&self, item: FeedItem) {
        lock(&self.items).push(item);
    }

    /// Identity-keyed merge: the fresh server set replaces every non-USER
    /// item; USER items survive unless the server now reports the same id
    /// (last writer wins by stable key). No ad hoc concatenation, so an
    /// unchanged backend feed merges to an identical list.
    pub fn apply_server_items(&self, fresh: Vec<FeedItem>) {
        let mut items = lock(&self.items);
        let retained_users: Vec<FeedItem> = items
            .iter()
            .filter(|i| {
                i.category == FeedCategory::User && !fresh.iter().any(|f| f.id == i.id)
            })
            .cloned()
            .collect();
        *items = fresh;
        items.extend(retained_users);
    }
}

/// Map one backend event to a rendered feed item.
///
/// Actionable items resolve their identity to the request identifier in
/// metadata when present; the log id is only a fallback. Approve/reject
/// endpoints 404 on log ids, so the resolution happens here, once.
pub fn map_event(ev: &FeedEvent) -> FeedItem {
    let category = categorize(&ev.agent_type, &ev.action_type);

    let id = if category.is_actionable() {
        request_id(ev).unwrap_or_else(|| ev.id.clone())
    } else {
        ev.id.clone()
    };

    FeedItem {
        id,
        category,
        title: title_for(category, &ev.agent_type),
        description: ev.message.clone(),
        timestamp: ev.timestamp,
        meta: meta_for(ev),
    }
}

fn request_id(ev: &FeedEvent) -> Option<String> {
    ev.metadata
        .as_ref()
        .and_then(|m| m.get("request_id"))
        .and_then(|v| v.as_str())
        .map(str::to_owned)
}

/// Backend categorical codes → feed categories. `action_type` wins; the
/// agent type only breaks ties for generic actions.
fn categorize(agent_type: &str, action_type: &str) -> FeedCategory {
    match action_type {
        "analysis" | "market_analysis" => FeedCategory::Analysis,
        "rebalance" | "rebalance_executed" => FeedCategory::Rebalance,
        "approval_request" | "approval" => FeedCategory::Approval,
        "payment" | "transfer" | "payment_sent" => FeedCategory::Payment,
        "error" | "task_failed" => FeedCategory::Error,
        "opportunity" | "yield_opportunity" => FeedCategory::Opportunity,
        _ => match agent_type {
            "treasury" => FeedCategory::Rebalance,
            "payments" => FeedCategory::Payment,
            _ => FeedCategory::Analysis,
        },
    }
}

fn title_for(category: FeedCategory, agent_type: &str) -> String {
    let label = match category {
        FeedCategory::Analysis => "Analysis",
        FeedCategory::Rebalance => "Rebalance",
        FeedCategory::Approval => "Approval needed",
        FeedCategory::Payment => "Payment",
        FeedCategory::Error => "Error",
        FeedCategory::Opportunity => "Opportunity",
        FeedCategory::User => "You",
    };
    format!("{label} · {agent_type}")
}

fn meta_for(ev: &FeedEvent) -> Option<FeedMeta> {
    let m = ev.metadata.as_ref()?;
    let label = m.get("label")?.as_str()?;
    let value = m.get("value")?.as_str()?;
    Some(FeedMeta {
        label: label.to_owned(),
        value: value.to_owned(),
    })
}

/// Polls the agent feed on a fixed interval and reconciles it into the
/// shared store. Poll failures are logged and leave the rendered list
/// untouched until the next tick.
pub struct FeedReconciler {
    client: Arc<BackendClient>,
    store: Arc<FeedStore>,
    interval: Duration,
    limit: usize,
}

impl FeedReconciler {
    pub fn new(
        client: Arc<BackendClient>,
        store: Arc<FeedStore>,
        interval: Duration,
        limit: usize,
    ) -> Self {
        Self {
            client,
            store,
            interval,
            limit,
        }
    }

    pub async fn poll_once(&self) -> Result<()> {
        let events = self
            .client
            .fetch_feed(self.limit)
            .await
            .map_err(|e| PayflowError::FeedPollFailed(e.to_string()))?;
        let items: Vec<FeedItem> = events.iter().map(map_event).collect();
        self.store.apply_server_items(items);
        Ok(())
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        info!(interval_secs = self.interval.as_secs(), "feed.reconciler_start");
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                warn!(error = %e, "feed.poll_failed");
            }
        }
    }

    /// Approve an actionable item. `item.id` is already the resolved
    /// request identifier.
    pub async fn approve(&self, item: &FeedItem, signature: &str) -> Result<()> {
        self.client
            .approve_event(&item.id, signature)
            .await
            .map_err(|e| PayflowError::ApprovalDispatchFailed {
                id: item.id.clone(),
                reason: e.to_string(),
            })
    }

    pub async fn reject(&self, item: &FeedItem) -> Result<()> {
        self.client
            .reject_event(&item.id)
            .await
            .map_err(|e| PayflowError::ApprovalDispatchFailed {
                id: item.id.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn event(id: &str, agent: &str, action: &str, metadata: Option<serde_json::Value>) -> FeedEvent {
        FeedEvent {
            id: id.into(),
            agent_type: agent.into(),
            action_type: action.into(),
            message: "msg".into(),
            timestamp: Utc::now(),
            metadata,
        }
    }

    fn user_item(id: &str) -> FeedItem {
        FeedItem {
            id: id.into(),
            category: FeedCategory::User,
            title: "You".into(),
            description: "sent".into(),
            timestamp: Utc::now(),
            meta: None,
        }
    }

    #[test]
    fn actionable_item_uses_request_id_not_log_id() {
        let ev = event(
            "L1",
            "payments",
            "approval_request",
            Some(json!({"request_id": "R1"})),
        );
        let item = map_event(&ev);
        assert_eq!(item.category, FeedCategory::Approval);
        assert_eq!(item.id, "R1");
    }

    #[test]
    fn actionable_item_falls_back_to_log_id() {
        let ev = event("L7", "defi", "opportunity", None);
        let item = map_event(&ev);
        assert_eq!(item.category, FeedCategory::Opportunity);
        assert_eq!(item.id, "L7");
    }

    #[test]
    fn non_actionable_item_keeps_log_id_even_with_request_id() {
        let ev = event("L2", "analyst", "analysis", Some(json!({"request_id": "R2"})));
        assert_eq!(map_event(&ev).id, "L2");
    }

    #[test]
    fn category_mapping_covers_known_codes() {
        let cases = [
            ("analysis", FeedCategory::Analysis),
            ("rebalance", FeedCategory::Rebalance),
            ("approval_request", FeedCategory::Approval),
            ("payment_sent", FeedCategory::Payment),
            ("task_failed", FeedCategory::Error),
            ("yield_opportunity", FeedCategory::Opportunity),
        ];
        for (code, expected) in cases {
            assert_eq!(categorize("any", code), expected, "code {code}");
        }
        // Unknown action falls through to the agent type.
        assert_eq!(categorize("treasury", "something_new"), FeedCategory::Rebalance);
        assert_eq!(categorize("unknown", "something_new"), FeedCategory::Analysis);
    }

    #[test]
    fn merge_is_idempotent_for_unchanged_feed() {
        let store = FeedStore::new();
        let fresh: Vec<FeedItem> = vec![
            map_event(&event("L1", "analyst", "analysis", None)),
            map_event(&event("L2", "payments", "payment", None)),
        ];

        store.apply_server_items(fresh.clone());
        let first = store.snapshot();
        store.apply_server_items(fresh);
        let second = store.snapshot();

        assert_eq!(first.len(), 2);
        let ids = |items: &[FeedItem]| items.iter().map(|i| i.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn user_items_survive_merge_until_superseded() {
        let store = FeedStore::new();
        store.push_user(user_item("user-abc"));

        store.apply_server_items(vec![map_event(&event("L1", "analyst", "analysis", None))]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        assert!(snap.iter().any(|i| i.id == "user-abc"));

        // Backend now reports the same id: the server copy wins.
        let mut confirmed = map_event(&event("user-abc", "payments", "payment", None));
        confirmed.description = "confirmed".into();
        store.apply_server_items(vec![confirmed]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].category, FeedCategory::Payment);
        assert_eq!(snap[0].description, "confirmed");
    }

    #[test]
    fn store_survives_a_poisoned_lock() {
        let store = FeedStore::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.items.lock().unwrap();
            panic!("writer died mid-cycle");
        }));

        store.push_user(user_item("user-1"));
        assert_eq!(store.snapshot().len(), 1);
        store.apply_server_items(vec![]);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn non_user_items_are_replaced_wholesale() {
        let store = FeedStore::new();
        store.apply_server_items(vec![
            map_event(&event("L1", "analyst", "analysis", None)),
            map_event(&event("L2", "analyst", "analysis", None)),
        ]);
        store.apply_server_items(vec![map_event(&event("L3", "analyst", "analysis", None))]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].id, "L3");
    }
}
