//! Newsletter subscribers and change notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_core::{Email, SubscriberId, SubscriptionStatus};

/// A newsletter subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub name: Option<String>,
    pub status: SubscriptionStatus,
    pub source: Option<String>,
    #[serde(skip)]
    pub unsubscribe_token: Uuid,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// Filters for the subscriber list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberQuery {
    pub status: Option<SubscriptionStatus>,
    pub search: Option<String>,
}

/// Headline subscriber counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NewsletterStats {
    pub total: i64,
    pub subscribed: i64,
    pub unsubscribed: i64,
    pub new_this_month: i64,
}

/// Payload of a `newsletter_changes` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterChange {
    /// `insert`, `update` or `delete`.
    pub op: String,
    pub id: SubscriberId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_change_payload_parses_trigger_output() {
        let change: NewsletterChange =
            serde_json::from_str(r#"{"op" : "delete", "id" : 42}"#).unwrap();
        assert_eq!(change.op, "delete");
        assert_eq!(change.id, SubscriberId::new(42));
    }

    #[test]
    fn test_subscriber_query_status_filter() {
        let query: SubscriberQuery =
            serde_json::from_value(serde_json::json!({ "status": "unsubscribed" })).unwrap();
        assert_eq!(query.status, Some(SubscriptionStatus::Unsubscribed));
        assert!(query.search.is_none());
    }
}
