//! Deadline for collaborator calls

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::domain::DomainError;

/// Run a collaborator call, mapping an elapsed deadline to `DomainError::Timeout`
pub async fn with_deadline<T, F>(operation: &str, limit: Duration, future: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::timeout(format!(
            "{} (after {}ms)",
            operation,
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let ok = with_deadline("fast", Duration::from_millis(50), async { Ok::<_, DomainError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = with_deadline("failing", Duration::from_millis(50), async {
            Err::<u8, _>(DomainError::storage("down"))
        })
        .await;
        assert!(matches!(err, Err(DomainError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_elapsed_deadline() {
        let result = with_deadline("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, DomainError>(())
        })
        .await;

        match result {
            Err(DomainError::Timeout { operation }) => assert!(operation.starts_with("slow")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
