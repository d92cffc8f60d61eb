use crate::AuthSession;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

/// Cancellable subscription to identity-provider changes.
///
/// Dropping the subscription stops it.
pub struct IdentitySubscription {
    task: Option<JoinHandle<()>>,
    sessions: watch::Receiver<AuthSession>,
}

impl IdentitySubscription {
    pub(crate) fn new(task: JoinHandle<()>, sessions: watch::Receiver<AuthSession>) -> Self {
        Self {
            task: Some(task),
            sessions,
        }
    }

    /// Session snapshots, each published after its notification was fully
    /// handled.
    pub fn sessions(&self) -> watch::Receiver<AuthSession> {
        self.sessions.clone()
    }

    pub fn is_active(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Wait until the identity provider closes its stream. A panicked
    /// notification loop is logged and returned.
    pub async fn finished(mut self) -> Result<(), JoinError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await.inspect_err(|e| {
            warn!(error = %e, "Identity subscription task failed");
        })
    }
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finished_reports_panicked_loop() {
        let (_tx, sessions) = watch::channel(AuthSession::unauthenticated());
        let task = tokio::spawn(async { panic!("notification loop panicked") });
        let subscription = IdentitySubscription::new(task, sessions);

        let err = subscription.finished().await.unwrap_err();
        assert!(err.is_panic());
    }

    #[tokio::test]
    async fn test_finished_after_clean_exit() {
        let (_tx, sessions) = watch::channel(AuthSession::unauthenticated());
        let subscription = IdentitySubscription::new(tokio::spawn(async {}), sessions);

        assert!(subscription.finished().await.is_ok());
    }
}
