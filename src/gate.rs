use std::sync::Arc;

use tracing::info;

use crate::backend::{BackendClient, ComplianceRequest};
use crate::config::SenderProfile;
use crate::domain::{ComplianceVerdict, TransferIntent};
use crate::error::{PayflowError, Result};

/// Risk scores above this require explicit user confirmation.
pub const RISK_WARNING_THRESHOLD: u8 = 30;

/// Three-way compliance outcome for one intent.
#[derive(Debug, Clone)]
pub enum GateDisposition {
    Safe(ComplianceVerdict),
    Warning(ComplianceVerdict),
    Block(ComplianceVerdict),
}

impl GateDisposition {
    /// Fixed rule: non-compliant blocks regardless of score; otherwise the
    /// score decides. 30 is safe, 31 warns.
    pub fn from_verdict(verdict: ComplianceVerdict) -> Self {
        if !verdict.is_compliant {
            GateDisposition::Block(verdict)
        } else if verdict.risk_score > RISK_WARNING_THRESHOLD {
            GateDisposition::Warning(verdict)
        } else {
            GateDisposition::Safe(verdict)
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self, GateDisposition::Warning(_))
    }

    pub fn verdict(&self) -> &ComplianceVerdict {
        match self {
            GateDisposition::Safe(v) | GateDisposition::Warning(v) | GateDisposition::Block(v) => v,
        }
    }
}

/// Compliance pre-flight for transfer intents. No retries, no caching:
/// every submission re-checks, and an unavailable backend is a hard stop.
pub struct ComplianceGate {
    client: Arc<BackendClient>,
    profile: SenderProfile,
}

impl ComplianceGate {
    pub fn new(client: Arc<BackendClient>, profile: SenderProfile) -> Self {
        Self { client, profile }
    }

    pub async fn check(&self, intent: &TransferIntent) -> Result<GateDisposition> {
        let req = ComplianceRequest {
            sender_name: self.profile.name.clone(),
            sender_country: self.profile.country.clone(),
            // The send form only collects an address; the screening backend
            // resolves counterparty identity itself.
            recipient_name: intent.recipient.clone(),
            recipient_country: None,
            recipient_address: intent.recipient.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            payment_method: self.profile.payment_method.clone(),
        };

        let verdict = self
            .client
            .check_compliance(&req)
            .await
            .map_err(|e| PayflowError::ComplianceUnavailable(e.to_string()))?;

        info!(
            is_compliant = verdict.is_compliant,
            risk_score = verdict.risk_score,
            "gate.verdict"
        );

        Ok(GateDisposition::from_verdict(verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(is_compliant: bool, risk_score: u8) -> ComplianceVerdict {
        ComplianceVerdict {
            is_compliant,
            risk_score,
            reasoning: "test".into(),
            violations: vec![],
        }
    }

    #[test]
    fn threshold_boundary_30_is_safe() {
        let d = GateDisposition::from_verdict(verdict(true, 30));
        assert!(matches!(d, GateDisposition::Safe(_)));
        assert!(!d.requires_confirmation());
    }

    #[test]
    fn threshold_boundary_31_warns() {
        let d = GateDisposition::from_verdict(verdict(true, 31));
        assert!(matches!(d, GateDisposition::Warning(_)));
        assert!(d.requires_confirmation());
    }

    #[test]
    fn zero_risk_is_safe() {
        assert!(matches!(
            GateDisposition::from_verdict(verdict(true, 0)),
            GateDisposition::Safe(_)
        ));
    }

    #[test]
    fn non_compliant_blocks_regardless_of_score() {
        for score in [0, 10, 30, 31, 100] {
            let d = GateDisposition::from_verdict(verdict(false, score));
            assert!(matches!(d, GateDisposition::Block(_)), "score {score}");
        }
    }

    #[test]
    fn block_carries_violations_verbatim() {
        let mut v = verdict(false, 90);
        v.violations = vec!["SANCTIONS_MATCH".into()];
        v.reasoning = "recipient matched OFAC list".into();
        match GateDisposition::from_verdict(v) {
            GateDisposition::Block(v) => {
                assert_eq!(v.violations, vec!["SANCTIONS_MATCH".to_string()]);
                assert_eq!(v.reasoning, "recipient matched OFAC list");
            }
            other => panic!("expected block, got {other:?}"),
        }
    }
}
