use tokio::sync::mpsc::UnboundedReceiver;

use crate::infrastructure::networking::{SessionCallback, SessionCallbackSource, SubscriptionId};

/// A role's subscription to platform callbacks
///
/// `unsubscribe` is idempotent and safe to call even if `subscribe` never ran.
#[derive(Debug, Default)]
pub struct CallbackSubscription {
    id: Option<SubscriptionId>,
    receiver: Option<UnboundedReceiver<SessionCallback>>,
}

impl CallbackSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.id.is_some()
    }

    pub fn subscribe<S: SessionCallbackSource + ?Sized>(&mut self, source: &S) {
        if self.is_subscribed() {
            return;
        }

        let (id, receiver) = source.subscribe();
        self.id = Some(id);
        self.receiver = Some(receiver);
    }

    pub fn unsubscribe<S: SessionCallbackSource + ?Sized>(&mut self, source: &S) {
        if let Some(id) = self.id.take() {
            source.unsubscribe(id);
        }
        self.receiver = None;
    }

    /// Take every callback delivered since the last call
    pub fn drain(&mut self) -> Vec<SessionCallback> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Vec::new();
        };

        let mut callbacks = Vec::new();
        while let Ok(callback) = receiver.try_recv() {
            callbacks.push(callback);
        }
        callbacks
    }
}
