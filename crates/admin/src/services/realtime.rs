//! Live newsletter change feed.
//!
//! A trigger on `shop.newsletter_subscribers` publishes every insert, update
//! and delete on the `newsletter_changes` channel. One background task holds
//! a `PgListener` and fans notifications out through a broadcast channel to
//! the SSE handlers.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;

use crate::models::NewsletterChange;

/// Postgres notification channel the trigger publishes on.
pub const CHANNEL: &str = "newsletter_changes";

const CAPACITY: usize = 256;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Fan-out hub for newsletter changes.
#[derive(Debug, Clone)]
pub struct NewsletterFeed {
    sender: broadcast::Sender<NewsletterChange>,
}

impl Default for NewsletterFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NewsletterFeed {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self { sender }
    }

    /// Receive every change published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NewsletterChange> {
        self.sender.subscribe()
    }

    /// Forward a change to current subscribers. Returns how many received
    /// it; zero when nobody is listening.
    pub fn publish(&self, change: NewsletterChange) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    /// Parse a notification payload and publish it. Malformed payloads are
    /// logged and dropped.
    pub fn publish_payload(&self, payload: &str) {
        match serde_json::from_str::<NewsletterChange>(payload) {
            Ok(change) => {
                tracing::debug!(op = %change.op, id = %change.id, "Newsletter change");
                self.publish(change);
            }
            Err(e) => tracing::warn!(error = %e, payload, "Malformed newsletter notification"),
        }
    }

    /// Listen on [`CHANNEL`] until the process exits, reconnecting after
    /// errors.
    pub async fn run(self, pool: PgPool) {
        loop {
            if let Err(e) = self.listen(&pool).await {
                tracing::error!(error = %e, "Newsletter listener failed, reconnecting");
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn listen(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(CHANNEL).await?;
        tracing::info!(channel = CHANNEL, "Listening for newsletter changes");

        loop {
            let notification = listener.recv().await?;
            self.publish_payload(notification.payload());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::SubscriberId;

    use super::*;

    #[tokio::test]
    async fn test_payload_reaches_subscribers() {
        let feed = NewsletterFeed::new();
        let mut rx = feed.subscribe();

        feed.publish_payload(r#"{"op":"insert","id":7}"#);
        feed.publish_payload("not json");

        let change = rx.recv().await.unwrap();
        assert_eq!(change.op, "insert");
        assert_eq!(change.id, SubscriberId::new(7));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_listeners() {
        let feed = NewsletterFeed::new();
        let delivered = feed.publish(NewsletterChange {
            op: "delete".to_owned(),
            id: SubscriberId::new(1),
        });
        assert_eq!(delivered, 0);
    }
}
