use crate::error::CliError;
use engine_config::report::{metrics::send_report, summary::RunSummary};
use std::path::Path;
use tracing::{error, info};

pub fn write_report(summary: &RunSummary, path: &Path) -> Result<(), CliError> {
    summary.write_to(path)?;
    info!(path = %path.display(), "Wrote run report");
    Ok(())
}

/// Posts the summary to `REPORT_CALLBACK_URL` when that variable is set.
pub async fn deliver_report(summary: &RunSummary) {
    if std::env::var_os("REPORT_CALLBACK_URL").is_none() {
        return;
    }
    if let Err(e) = send_report(summary).await {
        error!("Failed to send final report: {}", e);
        let report_json = summary
            .to_json()
            .unwrap_or_else(|_| "Failed to serialize report".to_string());
        error!("Final Report: {}", report_json);
    }
}
