//! Deadlines for capability calls.

use std::future::Future;
use std::time::Duration;

use crate::errors::UpstreamError;

/// Await `call`, converting an elapsed `deadline` into
/// [`UpstreamError::Timeout`].
pub async fn with_deadline<T, F>(
    operation: &str,
    deadline: Duration,
    call: F,
) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_elapsed) => Err(UpstreamError::timeout(operation, deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn passes_through_result() {
        let ok = with_deadline("op", Duration::from_secs(1), async { Ok::<_, UpstreamError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = with_deadline("op", Duration::from_secs(1), async {
            Err::<(), _>(UpstreamError::failed("op", "boom"))
        })
        .await;
        assert_matches!(err, Err(UpstreamError::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_timeout() {
        let result = with_deadline("summarize", Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, UpstreamError>(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "summarize timed out after 100ms");
    }
}
