//! CSV reconciliation report
//!
//! One row per user touched by a run, sorted by user id, with columns
//! `user_id, delta, status, revenue`. `revenue` is the balance after the
//! upsert and is empty for users whose delta was not applied in this run.

use crate::core::engine::RunSummary;
use crate::core::reconciler::ReconcileStatus;
use crate::types::LedgerError;
use std::io::Write;

/// Write the per-user outcomes of `summary` as CSV
///
/// # Errors
///
/// Returns `LedgerError::Report` if writing to `output` fails.
pub fn write_report_csv(summary: &RunSummary, output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["user_id", "delta", "status", "revenue"])?;

    for outcome in &summary.report.outcomes {
        let revenue = match outcome.status {
            ReconcileStatus::Applied { revenue } => revenue.to_string(),
            _ => String::new(),
        };
        writer.write_record(&[
            outcome.user_id.clone(),
            outcome.delta.to_string(),
            outcome.status.label().to_string(),
            revenue,
        ])?;
    }

    writer.flush().map_err(|e| LedgerError::Report {
        message: format!("Failed to flush output: {e}"),
    })?;

    Ok(())
}
