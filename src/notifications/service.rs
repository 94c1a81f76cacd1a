//! Broadcast channel that delivers toasts to all current subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{ToastKind, ToastMessage};
use crate::config::Config;

type Callback = Arc<dyn Fn(&ToastMessage) + Send + Sync>;

/// Token returned by [`ToastNotifier::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Central toast dispatcher.
///
/// Delivery is synchronous: `publish` returns after every subscriber that
/// was registered at call time has run. There is no acknowledgement and no
/// retry, and a subscriber that registers later never sees earlier toasts.
pub struct ToastNotifier {
    subscribers: Mutex<Vec<(Subscription, Callback)>>,
    next_id: AtomicU64,
    enabled: bool,
}

impl Default for ToastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastNotifier {
    /// Create an enabled notifier with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            enabled: true,
        }
    }

    /// Create a notifier from config, attaching the log mirror if configured.
    pub fn from_config(config: &Config) -> Self {
        let mut notifier = Self::new();
        notifier.enabled = config.notifications.enabled;

        if config.notifications.log_toasts {
            notifier.subscribe(log_toast);
        }

        notifier
    }

    /// Create a notifier that drops everything (for testing and quiet runs).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Register a callback for every toast published from now on.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ToastMessage) + Send + Sync + 'static,
    {
        let token = Subscription(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((token, Arc::new(callback)));
        token
    }

    /// Remove a subscriber. Returns false if the token was already gone.
    pub fn unsubscribe(&self, token: Subscription) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != token);
        subscribers.len() != before
    }

    /// Publish a toast to all current subscribers.
    pub fn publish(&self, kind: ToastKind, text: impl Into<String>) -> ToastMessage {
        let message = ToastMessage::new(kind, text);

        if !self.enabled {
            return message;
        }

        // Snapshot so callbacks can subscribe/unsubscribe without deadlocking
        let callbacks: Vec<Callback> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        if callbacks.is_empty() {
            tracing::trace!(kind = %message.kind, "Toast published with no subscribers");
        }
        for callback in callbacks {
            callback(&message);
        }

        message
    }

    pub fn success(&self, text: impl Into<String>) -> ToastMessage {
        self.publish(ToastKind::Success, text)
    }

    pub fn error(&self, text: impl Into<String>) -> ToastMessage {
        self.publish(ToastKind::Error, text)
    }

    pub fn info(&self, text: impl Into<String>) -> ToastMessage {
        self.publish(ToastKind::Info, text)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Subscription, Callback)>> {
        // A panicking subscriber must not take the channel down with it
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_toast(message: &ToastMessage) {
    match message.kind {
        ToastKind::Error => tracing::warn!(kind = %message.kind, "{}", message.text),
        _ => tracing::info!(kind = %message.kind, "{}", message.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn collector(notifier: &ToastNotifier) -> (Subscription, Arc<Mutex<Vec<ToastMessage>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let token = notifier.subscribe(move |m| sink.lock().unwrap().push(m.clone()));
        (token, seen)
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let notifier = ToastNotifier::new();
        let (_, first) = collector(&notifier);
        let (_, second) = collector(&notifier);

        notifier.success("Case saved");

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap()[0].text, "Case saved");
        assert_eq!(second.lock().unwrap()[0].kind, ToastKind::Success);
    }

    #[test]
    fn test_publish_without_subscribers_is_not_replayed() {
        let notifier = ToastNotifier::new();
        notifier.info("nobody listening");

        let (_, seen) = collector(&notifier);
        assert!(seen.lock().unwrap().is_empty());

        notifier.info("now listening");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let notifier = ToastNotifier::new();
        let (token, seen) = collector(&notifier);

        assert!(notifier.unsubscribe(token));
        assert!(!notifier.unsubscribe(token));
        notifier.error("boom");

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let notifier = Arc::new(ToastNotifier::new());
        let count = Arc::new(AtomicUsize::new(0));
        let token = Arc::new(Mutex::new(None));

        let n = notifier.clone();
        let c = count.clone();
        let t = token.clone();
        let sub = notifier.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let Some(tok) = t.lock().unwrap().take() {
                n.unsubscribe(tok);
            }
        });
        *token.lock().unwrap() = Some(sub);

        notifier.info("one");
        notifier.info("two");

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_drops_messages() {
        let notifier = ToastNotifier::disabled();
        let (_, seen) = collector(&notifier);

        let message = notifier.success("ignored");

        assert!(!notifier.is_enabled());
        assert_eq!(message.text, "ignored");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_from_config_attaches_log_mirror() {
        let mut config = Config::default();
        config.notifications.log_toasts = true;
        assert_eq!(ToastNotifier::from_config(&config).subscriber_count(), 1);

        config.notifications.log_toasts = false;
        assert_eq!(ToastNotifier::from_config(&config).subscriber_count(), 0);
    }
}
