use anyhow::Result;
use chrono::{DateTime, Local};
use std::{fs::OpenOptions, io::Write, path::Path};

use crate::domain::{RouteQuote, TransferIntent, TransferResult};

/// Append one settled transfer to the local history file. Best effort: the
/// caller logs failures and moves on.
pub fn append_settled(
    path: impl AsRef<Path>,
    intent: &TransferIntent,
    result: &TransferResult,
    risk_score: Option<u8>,
    quote: Option<&RouteQuote>,
) -> Result<()> {
    let now: DateTime<Local> = Local::now();

    if let Some(dir) = path.as_ref().parent() {
        std::fs::create_dir_all(dir)?;
    }

    let mut f = OpenOptions::new().create(true).append(true).open(path)?;

    writeln!(f, "- Settled: {}", now.to_rfc3339())?;
    writeln!(f, "- Amount: {:.2} {}", intent.amount, intent.currency)?;
    writeln!(f, "- Recipient: {}", intent.recipient)?;
    writeln!(f, "- Settlement ref: {}", result.settlement_ref)?;
    if let Some(score) = risk_score {
        writeln!(f, "- Risk score: {score}")?;
    }
    if let Some(q) = quote {
        writeln!(
            f,
            "- Route: {} (fee ${:.2}, eta {}s)",
            q.recommended.chain, q.recommended.fee_usd, q.recommended.eta_seconds
        )?;
    }
    if let Some(note) = &intent.note {
        writeln!(f, "- Note: {note}")?;
    }
    writeln!(f, "---\n")?;

    Ok(())
}
