//! Marketing campaigns: previews, per-recipient message links and SMTP
//! delivery.

use serde::Serialize;
use uuid::Uuid;

use atelier_core::{Email, EmailError, template};

use super::email::{EmailService, OutgoingEmail};
use crate::models::{
    Channel, Customer, MarketingTemplate, MessageLink, Recipient, Subscriber,
};

/// A template rendered for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

/// Result of building links for an audience.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkBatch {
    pub links: Vec<MessageLink>,
    /// Recipients with no usable address for the channel.
    pub skipped: usize,
}

/// Result of an SMTP campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
}

/// Render `template` for `recipient`.
#[must_use]
pub fn render(template: &MarketingTemplate, recipient: &Recipient) -> RenderedMessage {
    let vars = recipient.vars();
    RenderedMessage {
        subject: template.subject.as_deref().map(|s| template::render(s, &vars)),
        body: template::render(&template.body, &vars),
    }
}

/// A stand-in recipient for previews.
///
/// # Errors
///
/// Returns an error if `email` is not a valid address.
pub fn sample_recipient(
    name: &str,
    email: &str,
    storefront_base_url: &str,
) -> Result<Recipient, EmailError> {
    Ok(Recipient {
        name: name.trim().to_owned(),
        email: Email::parse(email)?,
        phone: Some("+33 6 12 34 56 78".to_owned()),
        unsubscribe_url: unsubscribe_url(storefront_base_url, &Uuid::nil().to_string()),
    })
}

/// Public unsubscribe link for a subscriber token.
#[must_use]
pub fn unsubscribe_url(storefront_base_url: &str, token: &str) -> String {
    format!(
        "{}/newsletter/unsubscribe?token={}",
        storefront_base_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

/// Recipients for active subscribers. Subscribers without a name are
/// addressed by the local part of their email.
#[must_use]
pub fn subscriber_recipients(subscribers: &[Subscriber], storefront_base_url: &str) -> Vec<Recipient> {
    subscribers
        .iter()
        .map(|s| Recipient {
            name: s
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| s.email.local_part())
                .to_owned(),
            email: s.email.clone(),
            phone: None,
            unsubscribe_url: unsubscribe_url(storefront_base_url, &s.unsubscribe_token.to_string()),
        })
        .collect()
}

/// Recipients for customers.
#[must_use]
pub fn customer_recipients(customers: &[Customer]) -> Vec<Recipient> {
    customers
        .iter()
        .map(|c| Recipient {
            name: Some(c.full_name.trim())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| c.email.local_part())
                .to_owned(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            unsubscribe_url: String::new(),
        })
        .collect()
}

/// Build one `mailto:` or `wa.me` link per recipient.
///
/// `WhatsApp` links need a phone number with at least one digit; recipients
/// without one are counted in `skipped`.
#[must_use]
pub fn build_links(template: &MarketingTemplate, recipients: &[Recipient]) -> LinkBatch {
    let mut batch = LinkBatch::default();
    for recipient in recipients {
        let message = render(template, recipient);
        let url = match template.channel {
            Channel::Email => Some(mailto_link(
                recipient.email.as_str(),
                message.subject.as_deref().unwrap_or_default(),
                &message.body,
            )),
            Channel::Whatsapp => recipient
                .phone
                .as_deref()
                .and_then(phone_digits)
                .map(|digits| whatsapp_link(&digits, &message.body)),
        };
        match url {
            Some(url) => batch.links.push(MessageLink {
                name: recipient.name.clone(),
                email: recipient.email.clone(),
                url,
            }),
            None => batch.skipped += 1,
        }
    }
    batch
}

/// `mailto:` URL with an encoded subject and body.
#[must_use]
pub fn mailto_link(email: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{email}?subject={}&body={}",
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}

/// `https://wa.me/<digits>?text=` URL.
#[must_use]
pub fn whatsapp_link(digits: &str, text: &str) -> String {
    format!("https://wa.me/{digits}?text={}", urlencoding::encode(text))
}

/// Strip a phone number down to its digits; `None` when none remain.
#[must_use]
pub fn phone_digits(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

/// Deliver an email template to each recipient in turn.
///
/// A failed delivery is logged and counted; the campaign continues.
pub async fn send_campaign(
    mailer: &EmailService,
    template: &MarketingTemplate,
    recipients: &[Recipient],
) -> SendReport {
    let mut report = SendReport::default();
    for recipient in recipients {
        let message = render(template, recipient);
        let email = OutgoingEmail {
            to: recipient.email.as_str().to_owned(),
            subject: message.subject.unwrap_or_else(|| template.name.clone()),
            body: message.body,
            unsubscribe_url: Some(recipient.unsubscribe_url.clone()),
        };
        match mailer.send(&email).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(to = %email.to, error = %e, "Campaign email failed");
                report.failed += 1;
            }
        }
    }
    tracing::info!(
        template = %template.id,
        sent = report.sent,
        failed = report.failed,
        "Campaign finished"
    );
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn template(channel: Channel) -> MarketingTemplate {
        MarketingTemplate {
            id: "tpl-1".to_owned(),
            name: "Spring".to_owned(),
            channel,
            subject: (channel == Channel::Email).then(|| "Hi {{name}}".to_owned()),
            body: "Dear {{name}} & co, see {{unsubscribe_url}} {{code}}".to_owned(),
        }
    }

    fn recipient(phone: Option<&str>) -> Recipient {
        Recipient {
            name: "Lina".to_owned(),
            email: Email::parse("lina@example.com").unwrap(),
            phone: phone.map(str::to_owned),
            unsubscribe_url: "https://atelier.test/u".to_owned(),
        }
    }

    #[test]
    fn test_render_substitutes_known_keys() {
        let message = render(&template(Channel::Email), &recipient(None));
        assert_eq!(message.subject.as_deref(), Some("Hi Lina"));
        assert_eq!(message.body, "Dear Lina & co, see https://atelier.test/u {{code}}");
    }

    #[test]
    fn test_mailto_links_encode_subject_and_body() {
        let batch = build_links(&template(Channel::Email), &[recipient(None)]);
        assert_eq!(batch.skipped, 0);
        let link = batch.links.first().unwrap();
        assert!(link.url.starts_with("mailto:lina@example.com?subject=Hi%20Lina&body=Dear%20Lina%20%26%20co"));
    }

    #[test]
    fn test_whatsapp_links_skip_missing_phones() {
        let recipients = [
            recipient(Some("+33 (6) 12-34")),
            recipient(None),
            recipient(Some("n/a")),
        ];
        let batch = build_links(&template(Channel::Whatsapp), &recipients);
        assert_eq!(batch.links.len(), 1);
        assert_eq!(batch.skipped, 2);
        assert!(batch.links.first().unwrap().url.starts_with("https://wa.me/3361234?text=Dear%20Lina"));
    }

    #[test]
    fn test_sample_recipient() {
        let sample = sample_recipient(" Lina ", "LINA@example.com", "https://atelier.test").unwrap();
        assert_eq!(sample.name, "Lina");
        assert_eq!(sample.email.as_str(), "lina@example.com");
        assert!(sample_recipient("Lina", "not-an-email", "https://atelier.test").is_err());
    }

    #[test]
    fn test_unsubscribe_url() {
        assert_eq!(
            unsubscribe_url("https://atelier.test/", "abc-123"),
            "https://atelier.test/newsletter/unsubscribe?token=abc-123"
        );
    }

    #[test]
    fn test_customer_recipient_name_falls_back_to_email() {
        let customer = Customer {
            id: atelier_core::CustomerId::new(1),
            email: Email::parse("sam@example.com").unwrap(),
            full_name: "  ".to_owned(),
            phone: Some("0612".to_owned()),
            city: None,
            address: None,
            order_count: 1,
            total_spent: rust_decimal::Decimal::ONE,
            last_order_at: None,
            created_at: chrono::Utc::now(),
        };
        let recipients = customer_recipients(&[customer]);
        assert_eq!(recipients.first().unwrap().name, "sam");
        assert_eq!(recipients.first().unwrap().unsubscribe_url, "");
    }
}
