//! Newsletter subscribers and the live change feed.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::instrument;

use atelier_core::csv::CsvWriter;
use atelier_core::{SubscriberId, SubscriptionStatus};

use super::{audit, csv_response};
use crate::db::NewsletterRepository;
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{NewsletterChange, NewsletterStats, Subscriber, SubscriberQuery};
use crate::state::AppState;

/// Body of `PUT /api/newsletter/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: SubscriptionStatus,
}

/// `GET /api/newsletter`
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<SubscriberQuery>,
) -> Result<Json<Vec<Subscriber>>> {
    let subscribers = NewsletterRepository::new(state.pool()).list(&query).await?;
    Ok(Json(subscribers))
}

/// `GET /api/newsletter/stats`
pub async fn stats(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<NewsletterStats>> {
    Ok(Json(NewsletterRepository::new(state.pool()).stats().await?))
}

/// `PUT /api/newsletter/{id}/status`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_status(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<SubscriberId>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Subscriber>> {
    let subscriber = NewsletterRepository::new(state.pool())
        .set_status(id, body.status)
        .await?;
    audit(
        &state,
        &admin,
        "set_status",
        "newsletter_subscriber",
        Some(id.to_string()),
        json!({ "status": body.status }),
    )
    .await;
    Ok(Json(subscriber))
}

/// `DELETE /api/newsletter/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<SubscriberId>,
) -> Result<StatusCode> {
    NewsletterRepository::new(state.pool()).delete(id).await?;
    audit(
        &state,
        &admin,
        "delete",
        "newsletter_subscriber",
        Some(id.to_string()),
        json!({}),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/newsletter/export.csv`
///
/// Honors the same filters as the list.
#[instrument(skip(state, _admin))]
pub async fn export(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<SubscriberQuery>,
) -> Result<Response> {
    let subscribers = NewsletterRepository::new(state.pool()).list(&query).await?;
    Ok(csv_response("newsletter", subscribers_csv(&subscribers)))
}

fn subscribers_csv(subscribers: &[Subscriber]) -> String {
    let mut csv = CsvWriter::new([
        "email",
        "name",
        "status",
        "source",
        "subscribed_at",
        "unsubscribed_at",
    ]);
    for s in subscribers {
        csv.push([
            s.email.as_str().to_owned(),
            s.name.clone().unwrap_or_default(),
            s.status.as_str().to_owned(),
            s.source.clone().unwrap_or_default(),
            s.subscribed_at.to_rfc3339(),
            s.unsubscribed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ]);
    }
    csv.finish()
}

/// `GET /api/newsletter/events`
///
/// Server-sent events, one `changed` event per subscriber insert, update or
/// delete. A client that falls behind gets a single `resync` event instead
/// of the changes it missed.
pub async fn events(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut changes = state.newsletter_feed().subscribe();
    tracing::debug!(admin_id = %admin.id, "Newsletter event stream opened");

    let stream = async_stream::stream! {
        loop {
            match changes.recv().await {
                Ok(change) => yield Ok(change_event(&change)),
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "Newsletter event stream lagged");
                    yield Ok(Event::default()
                        .event("changed")
                        .data(json!({ "type": "changed", "op": "resync" }).to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn change_event(change: &NewsletterChange) -> Event {
    Event::default().event("changed").data(
        json!({ "type": "changed", "op": change.op, "id": change.id }).to_string(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::Email;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_subscribers_csv() {
        let subscriber = Subscriber {
            id: SubscriberId::new(1),
            email: Email::parse("lina@example.com").unwrap(),
            name: Some("Lina, B.".to_owned()),
            status: SubscriptionStatus::Subscribed,
            source: None,
            unsubscribe_token: Uuid::nil(),
            subscribed_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            unsubscribed_at: None,
        };
        let csv = subscribers_csv(&[subscriber]);
        let mut lines = csv.split("\r\n");
        assert_eq!(
            lines.next().unwrap(),
            "email,name,status,source,subscribed_at,unsubscribed_at"
        );
        assert_eq!(
            lines.next().unwrap(),
            "lina@example.com,\"Lina, B.\",subscribed,,2026-03-01T09:00:00+00:00,"
        );
    }
}
