//! Host notification surface

/// Receives `(title, reward)` after a confirmed completion
///
/// Permissions and display belong to the host.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Announce a rewarded completion
    fn notify(&self, title: &str, reward: u128);
}

/// Writes notifications to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, reward: u128) {
        tracing::info!(target: "quest::notify", title, reward = %reward, "reward earned");
    }
}

/// Discards notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _title: &str, _reward: u128) {}
}
