//! Newsletter delivery over SMTP.
//!
//! Uses lettre with Askama templates for the HTML and plain-text parts.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

const STORE_NAME: &str = "Atelier";

#[derive(Template)]
#[template(path = "email/newsletter.html")]
struct NewsletterEmailHtml<'a> {
    subject: &'a str,
    store_name: &'a str,
    paragraphs: Vec<&'a str>,
    unsubscribe_url: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/newsletter.txt")]
struct NewsletterEmailText<'a> {
    body: &'a str,
    unsubscribe_url: Option<&'a str>,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered campaign email for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub unsubscribe_url: Option<String>,
}

/// SMTP mailer for newsletter campaigns.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send one campaign email.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to render, build or send.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let (text, html) = render_parts(email)?;

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(email.to.clone()))?)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Render the plain-text and HTML bodies.
fn render_parts(email: &OutgoingEmail) -> Result<(String, String), EmailError> {
    let unsubscribe_url = email.unsubscribe_url.as_deref().filter(|u| !u.is_empty());
    let text = NewsletterEmailText {
        body: &email.body,
        unsubscribe_url,
    }
    .render()?;
    let html = NewsletterEmailHtml {
        subject: &email.subject,
        store_name: STORE_NAME,
        paragraphs: email
            .body
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect(),
        unsubscribe_url,
    }
    .render()?;
    Ok((text, html))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "lina@example.com".to_owned(),
            subject: "New in".to_owned(),
            body: "Hi Lina,\n\nOur <summer> edit is here.".to_owned(),
            unsubscribe_url: Some("https://atelier.test/newsletter/unsubscribe?token=abc".to_owned()),
        }
    }

    #[test]
    fn test_html_part_escapes_and_splits_paragraphs() {
        let (_, html) = render_parts(&email()).unwrap();
        assert!(html.contains("<p style=\"margin:0 0 14px;\">Hi Lina,</p>"));
        assert!(html.contains("Our &#60;summer&#62; edit is here."));
        assert!(!html.contains("<summer>"));
        assert!(html.contains("Unsubscribe"));
    }

    #[test]
    fn test_text_part_keeps_body_verbatim() {
        let (text, _) = render_parts(&email()).unwrap();
        assert!(text.contains("Our <summer> edit is here."));
        assert!(text.contains("Unsubscribe: https://atelier.test/newsletter/unsubscribe?token=abc"));
    }

    #[test]
    fn test_footer_omitted_without_unsubscribe_url() {
        let mut email = email();
        email.unsubscribe_url = Some(String::new());
        let (text, html) = render_parts(&email).unwrap();
        assert!(!text.contains("Unsubscribe"));
        assert!(!html.contains("Unsubscribe"));
    }
}
