use crate::{error::ReportGenerationError, report::summary::RunSummary};
use engine_core::retry::{RetryDisposition, RetryPolicy};
use std::time::Duration;
use tracing::{info, warn};

const CALLBACK_URL_VAR: &str = "REPORT_CALLBACK_URL";
const AUTH_TOKEN_VAR: &str = "AUTH_TOKEN";

/// Sends the final report to the callback URL named by `REPORT_CALLBACK_URL`.
pub async fn send_report(summary: &RunSummary) -> Result<(), ReportGenerationError> {
    let callback_url = match std::env::var(CALLBACK_URL_VAR) {
        Ok(url) => url,
        Err(_) => {
            warn!("{CALLBACK_URL_VAR} environment variable not set. Cannot send report.");
            return Err(ReportGenerationError::MissingCallbackUrl);
        }
    };

    let auth_token = match std::env::var(AUTH_TOKEN_VAR) {
        Ok(token) => token,
        Err(_) => {
            warn!("{AUTH_TOKEN_VAR} environment variable not set. Cannot send authenticated report.");
            return Err(ReportGenerationError::MissingAuthToken);
        }
    };

    let policy = RetryPolicy::new(5, Duration::from_millis(200), Duration::from_secs(5));
    post_report(&callback_url, &auth_token, summary, &policy).await
}

pub(crate) async fn post_report(
    callback_url: &str,
    auth_token: &str,
    summary: &RunSummary,
    policy: &RetryPolicy,
) -> Result<(), ReportGenerationError> {
    let client = reqwest::Client::new();

    policy
        .run(
            || async {
                info!(run_id = %summary.run_id, "Sending final report...");
                let response = client
                    .post(callback_url)
                    .bearer_auth(auth_token)
                    .json(summary)
                    .send()
                    .await;

                match response {
                    Ok(resp) if resp.status().is_success() => {
                        info!("Report sent successfully");
                        Ok(())
                    }
                    Ok(resp) => {
                        warn!("Report callback failed with status: {}", resp.status());
                        Err(format!("callback responded with {}", resp.status()))
                    }
                    Err(err) => {
                        warn!("Report callback failed with error: {err}");
                        Err(err.to_string())
                    }
                }
            },
            |_| RetryDisposition::Retry,
        )
        .await
        .map_err(|err| {
            ReportGenerationError::GenerationFailed(format!(
                "Max retries reached: {}",
                err.into_inner()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_core::{metrics::MetricsSnapshot, progress::ProgressStage};
    use uuid::Uuid;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn summary() -> RunSummary {
        RunSummary::new(
            Uuid::new_v4(),
            Utc::now(),
            ProgressStage::Done,
            MetricsSnapshot::default(),
        )
    }

    #[tokio::test]
    async fn retries_until_callback_accepts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/report"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/report"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);
        let url = format!("{}/report", server.uri());
        post_report(&url, "secret", &summary(), &policy)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let policy = RetryPolicy::new(2, Duration::ZERO, Duration::ZERO);
        let url = format!("{}/report", server.uri());
        let err = post_report(&url, "secret", &summary(), &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportGenerationError::GenerationFailed(_)));
    }
}
