//! Push extracted observations to a [`Submitter`].

use serde::Serialize;
use skywatch_core::extract::Observation;
use tracing::{debug, warn};

use crate::{client::Submitter, submitted::SubmittedSet};

/// What one [`sync`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
  pub scans_sent:      usize,
  /// Change events the server reported across all scans.
  pub events:          usize,
  /// Keys the server failed to write; those scans should be resent.
  pub key_failures:    usize,
  pub reports_sent:    usize,
  /// Reports skipped because their key was already acknowledged.
  pub reports_skipped: usize,
  /// One message per observation that could not be submitted.
  pub errors:          Vec<String>,
}

/// Submit every observation in order.
///
/// Scans are always sent: a rescan is how freshness advances. Reports whose
/// key is in `submitted` are skipped, and every acknowledged report key is
/// added to it. A failed submission is recorded in the summary and does not
/// stop the pass.
pub async fn sync<C: Submitter>(
  client: &C,
  observations: &[Observation],
  submitted: &mut SubmittedSet,
) -> SyncSummary {
  let mut summary = SyncSummary::default();

  for observation in observations {
    match observation {
      Observation::Scan(scan) => match client.submit_scan(scan).await {
        Ok(outcome) => {
          summary.scans_sent += 1;
          summary.events += outcome.events.len();
          summary.key_failures += outcome.failures.len();
        }
        Err(e) => {
          warn!(region = %scan.region, error = %e, "scan submission failed");
          summary.errors.push(format!("scan {}: {e}", scan.region));
        }
      },
      Observation::Report(report) => {
        let key = report.key();
        if submitted.contains(&key) {
          debug!(%key, "already submitted");
          summary.reports_skipped += 1;
          continue;
        }
        match client.submit_report(report).await {
          Ok(ack) => {
            debug!(%key, outcome = ?ack.outcome, "report acknowledged");
            submitted.insert(key);
            summary.reports_sent += 1;
          }
          Err(e) => {
            warn!(%key, error = %e, "report submission failed");
            summary.errors.push(format!("report {key}: {e}"));
          }
        }
      }
    }
  }

  summary
}
