use std::future::Future;

use tracing::warn;

use crate::error::ApiResult;

/// Apply a local change, confirm it remotely, and undo it if that fails.
///
/// `apply` makes the change and returns whatever is needed to undo it, or
/// `None` when there was nothing to change; in that case no request is made
/// and the result is `Ok(None)`. `commit` builds the confirming request from
/// the undo information. On failure `revert` receives the undo information
/// back and the error is returned unchanged.
pub async fn optimistic<U, A, C, Fut, T, R>(apply: A, commit: C, revert: R) -> ApiResult<Option<T>>
where
    A: FnOnce() -> Option<U>,
    C: FnOnce(&U) -> Fut,
    Fut: Future<Output = ApiResult<T>>,
    R: FnOnce(U),
{
    let Some(undo) = apply() else {
        return Ok(None);
    };

    match commit(&undo).await {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Rolling back optimistic change: {}", e);
            revert(undo);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::{Arc, Mutex};

    fn set(cell: &Arc<Mutex<i32>>, to: i32) -> Option<i32> {
        let mut guard = cell.lock().unwrap();
        let previous = *guard;
        *guard = to;
        Some(previous)
    }

    #[tokio::test]
    async fn test_revert_runs_only_on_failure() {
        let value = Arc::new(Mutex::new(1));

        let ok = optimistic(
            || set(&value, 2),
            |_| async { Ok::<_, ApiError>("saved") },
            |previous| *value.lock().unwrap() = previous,
        )
        .await;
        assert_eq!(ok.unwrap(), Some("saved"));
        assert_eq!(*value.lock().unwrap(), 2);

        let err = optimistic(
            || set(&value, 3),
            |_| async { Err::<(), _>(ApiError::Network("offline".into())) },
            |previous| *value.lock().unwrap() = previous,
        )
        .await;
        assert!(err.is_err());
        assert_eq!(*value.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_nothing_to_apply_sends_nothing() {
        let sent = Arc::new(Mutex::new(false));
        let result = optimistic(
            || None::<()>,
            |_| {
                *sent.lock().unwrap() = true;
                async { Ok::<_, ApiError>(()) }
            },
            |_| {},
        )
        .await;
        assert_eq!(result.unwrap(), None);
        assert!(!*sent.lock().unwrap());
    }
}
