//! Marketing message templates and their recipients.
//!
//! Templates live as a JSON array in the `marketing_templates` settings row.
//! Bodies use `{{name}}`, `{{email}}` and `{{unsubscribe_url}}` placeholders.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use atelier_core::Email;

use super::{MAX_SHORT_TEXT, ValidationError, optional_text, required_text};

const MAX_BODY_LENGTH: usize = 20_000;

/// How a template is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Whatsapp,
}

/// A stored marketing template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingTemplate {
    pub id: String,
    pub name: String,
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

/// Create/update body for a template. A missing `id` creates a new one.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub channel: Channel,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
}

impl TemplateInput {
    /// Validate into a storable template, generating an id when absent.
    ///
    /// # Errors
    ///
    /// Returns an error for blank fields or an email template with no
    /// subject.
    pub fn validate(self) -> Result<MarketingTemplate, ValidationError> {
        let name = required_text("name", &self.name, MAX_SHORT_TEXT)?;
        let body = required_text("body", &self.body, MAX_BODY_LENGTH)?;
        let subject = optional_text("subject", self.subject.as_deref(), MAX_SHORT_TEXT)?;
        if self.channel == Channel::Email && subject.is_none() {
            return Err(ValidationError::Required("subject"));
        }
        let id = self
            .id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(MarketingTemplate {
            id,
            name,
            channel: self.channel,
            subject: if self.channel == Channel::Email { subject } else { None },
            body,
        })
    }
}

/// Who a campaign is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Active newsletter subscribers.
    #[default]
    Subscribers,
    /// Everyone who has placed an order.
    Customers,
}

/// One addressee with the values their placeholders render to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    /// Empty for customers who never subscribed.
    pub unsubscribe_url: String,
}

impl Recipient {
    /// Placeholder values for `atelier_core::template::render`.
    #[must_use]
    pub fn vars(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("name", self.name.clone()),
            ("email", self.email.as_str().to_owned()),
            ("unsubscribe_url", self.unsubscribe_url.clone()),
        ])
    }
}

/// A ready-to-open message link for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageLink {
    pub name: String,
    pub email: Email,
    pub url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(channel: Channel, subject: Option<&str>) -> TemplateInput {
        TemplateInput {
            id: None,
            name: " Spring drop ".to_owned(),
            channel,
            subject: subject.map(str::to_owned),
            body: "Hi {{name}}".to_owned(),
        }
    }

    #[test]
    fn test_email_template_requires_subject() {
        assert_eq!(
            input(Channel::Email, Some("  ")).validate(),
            Err(ValidationError::Required("subject"))
        );
        let template = input(Channel::Email, Some("New in")).validate().unwrap();
        assert_eq!(template.name, "Spring drop");
        assert_eq!(template.subject.as_deref(), Some("New in"));
        assert!(!template.id.is_empty());
    }

    #[test]
    fn test_whatsapp_template_drops_subject() {
        let template = input(Channel::Whatsapp, Some("ignored")).validate().unwrap();
        assert_eq!(template.subject, None);
    }

    #[test]
    fn test_existing_id_is_kept() {
        let mut form = input(Channel::Whatsapp, None);
        form.id = Some("tpl-1".to_owned());
        assert_eq!(form.validate().unwrap().id, "tpl-1");
    }

    #[test]
    fn test_recipient_vars() {
        let recipient = Recipient {
            name: "Lina".to_owned(),
            email: Email::parse("lina@example.com").unwrap(),
            phone: None,
            unsubscribe_url: String::new(),
        };
        let vars = recipient.vars();
        assert_eq!(vars.get("name").map(String::as_str), Some("Lina"));
        assert_eq!(vars.get("email").map(String::as_str), Some("lina@example.com"));
    }
}
