//! Bounded collaborator invocation

use super::CollaboratorError;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Aborts the wrapped task when dropped, so a cancelled caller never leaves
/// collaborator work running detached.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run a collaborator call on its own task, bounded by `timeout`.
///
/// The task is aborted on timeout and whenever the returned future is
/// dropped before completion. A panic inside the collaborator is caught by
/// the task boundary and reported as `Aborted`, so the caller always gets a
/// value back within the bound.
pub async fn call_bounded<T, F>(timeout: Duration, call: F) -> Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, CollaboratorError>> + Send + 'static,
{
    let mut task = AbortOnDrop(tokio::spawn(call));

    match tokio::time::timeout(timeout, &mut task.0).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(CollaboratorError::Aborted(join_error.to_string())),
        Err(_) => Err(CollaboratorError::Timeout(timeout)),
    }
}
