//! Live text-change subscriptions on bound directive points.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::host::{BindingId, ChangeCallback, DocumentHost, HostError, SubscriptionId};

/// A live subscription to the text of a bound directive point.
///
/// The host subscription is established when the watch is created, not when
/// someone first reads from it. The most recent text is cached and replayed to
/// every receiver handed out by [`PointWatch::subscribe`], including late ones.
///
/// Dropping a watch does not remove the host subscription; call
/// [`PointWatch::unsubscribe`] for that.
#[derive(Debug)]
pub struct PointWatch<H> {
    host: Arc<H>,
    binding: BindingId,
    subscription: SubscriptionId,
    receiver: watch::Receiver<Option<String>>,
}

impl<H: DocumentHost> PointWatch<H> {
    pub(crate) async fn establish(host: Arc<H>, binding: BindingId) -> Result<Self, HostError> {
        let (sender, receiver) = watch::channel(None);
        let callback: ChangeCallback = Arc::new(move |text| {
            sender.send_replace(Some(text));
        });
        let subscription = host.subscribe(binding, callback).await?;
        debug!(%binding, %subscription, "watching directive point");

        Ok(Self {
            host,
            binding,
            subscription,
            receiver,
        })
    }

    /// The binding being watched.
    pub const fn binding(&self) -> BindingId {
        self.binding
    }

    /// The most recent text, if the point has changed since the watch was
    /// created.
    pub fn latest(&self) -> Option<String> {
        self.receiver.borrow().clone()
    }

    /// A receiver that starts with the most recent text.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.receiver.clone()
    }

    /// Waits for the next change and returns the new text.
    ///
    /// Returns `None` once the binding has been removed from the host.
    pub async fn changed(&mut self) -> Option<String> {
        self.receiver.changed().await.ok()?;
        self.receiver.borrow_and_update().clone()
    }

    /// Removes the host subscription.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the subscription could not be removed.
    pub async fn unsubscribe(self) -> Result<(), HostError> {
        self.host.unsubscribe(self.subscription).await
    }
}
