use engine_core::{error::SinkError, retry::RetryDisposition};

/// Decides whether a sink failure is worth another attempt.
///
/// Throttling, server errors and lost connections are transient. Validation and
/// encoding failures would fail the same way again.
pub fn classify_sink_error(err: &SinkError) -> RetryDisposition {
    match err {
        SinkError::Status { status, .. } => classify_status(*status),
        SinkError::Unavailable(_) | SinkError::Io(_) | SinkError::Other(_) => {
            RetryDisposition::Retry
        }
        SinkError::Rejected { .. } | SinkError::Encode(_) => RetryDisposition::Stop,
    }
}

fn classify_status(status: u16) -> RetryDisposition {
    match status {
        408 | 429 => RetryDisposition::Retry,
        s if s >= 500 => RetryDisposition::Retry,
        _ => RetryDisposition::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> SinkError {
        SinkError::Status {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn throttling_and_server_errors_are_retried() {
        for code in [408, 429, 500, 502, 503] {
            assert_eq!(classify_sink_error(&status(code)), RetryDisposition::Retry);
        }
        assert_eq!(
            classify_sink_error(&SinkError::Unavailable("connection refused".into())),
            RetryDisposition::Retry
        );
    }

    #[test]
    fn validation_errors_stop() {
        for code in [400, 404, 409] {
            assert_eq!(classify_sink_error(&status(code)), RetryDisposition::Stop);
        }
        let rejected = SinkError::Rejected {
            id: "a".into(),
            reason: "bad field".into(),
        };
        assert_eq!(classify_sink_error(&rejected), RetryDisposition::Stop);
        assert_eq!(
            classify_sink_error(&SinkError::Encode("nan".into())),
            RetryDisposition::Stop
        );
    }
}
