//! Hosted checkout client and return-URL signatures.
//!
//! The processor redirects the shopper back to `/checkout/success` or
//! `/checkout/error` with `order`, `status`, `reference` and `signature`
//! query parameters. The signature is a hex HMAC-SHA256 over
//! `"{order}:{status}:{reference}"` keyed with the shared signing secret.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::PaymentConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors talking to the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Processor returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Status reported on the return URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStatus {
    Paid,
    Failed,
    Cancelled,
}

impl ReturnStatus {
    /// Parse the processor's status string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "paid" | "succeeded" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Body of `POST /v1/checkout/sessions`.
#[derive(Debug, Serialize)]
pub struct CheckoutSessionRequest<'a> {
    pub amount_minor: i64,
    pub currency: &'a str,
    pub reference: &'a str,
    pub customer_email: &'a str,
    pub success_url: String,
    pub cancel_url: String,
}

/// A hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Client for the hosted checkout API.
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    api_url: String,
    signing_secret: SecretString,
}

impl PaymentClient {
    /// Create a new payment client.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.secret_key.expose_secret()
        ))
        .map_err(|e| PaymentError::InvalidRequest(format!("invalid secret key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            signing_secret: config.signing_secret.clone(),
        })
    }

    /// Open a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the processor rejects it.
    #[tracing::instrument(skip(self, request), fields(reference = %request.reference))]
    pub async fn create_session(
        &self,
        request: &CheckoutSessionRequest<'_>,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.api_url);
        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Signature the processor attaches to a return URL.
    #[must_use]
    pub fn sign_return(&self, order: &str, status: &str, reference: &str) -> Option<String> {
        sign(self.signing_secret.expose_secret(), order, status, reference)
    }

    /// Check a return URL signature in constant time.
    #[must_use]
    pub fn verify_return(&self, order: &str, status: &str, reference: &str, signature: &str) -> bool {
        verify(
            self.signing_secret.expose_secret(),
            order,
            status,
            reference,
            signature,
        )
    }
}

fn mac(secret: &str, order: &str, status: &str, reference: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{order}:{status}:{reference}").as_bytes());
    Some(mac)
}

fn sign(secret: &str, order: &str, status: &str, reference: &str) -> Option<String> {
    let mac = mac(secret, order, status, reference)?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn verify(secret: &str, order: &str, status: &str, reference: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    mac(secret, order, status, reference).is_some_and(|mac| mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "k9Jm2Pq8Wx4Rt7Yz1Lb5Nc3Vd6Hf0Gs";

    #[test]
    fn test_signature_roundtrip() {
        let sig = sign(SECRET, "AT-260301-ABCDEF", "paid", "cs_123").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify(SECRET, "AT-260301-ABCDEF", "paid", "cs_123", &sig));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let sig = sign(SECRET, "AT-260301-ABCDEF", "failed", "cs_123").unwrap();
        assert!(!verify(SECRET, "AT-260301-ABCDEF", "paid", "cs_123", &sig));
        assert!(!verify(SECRET, "AT-260301-ABCDEG", "failed", "cs_123", &sig));
        assert!(!verify(SECRET, "AT-260301-ABCDEF", "failed", "cs_124", &sig));
        assert!(!verify("another-secret", "AT-260301-ABCDEF", "failed", "cs_123", &sig));
    }

    #[test]
    fn test_signature_rejects_garbage() {
        assert!(!verify(SECRET, "o", "paid", "r", ""));
        assert!(!verify(SECRET, "o", "paid", "r", "not-hex"));
        assert!(!verify(SECRET, "o", "paid", "r", "abcd"));
    }

    #[test]
    fn test_return_status_parse() {
        assert_eq!(ReturnStatus::parse("paid"), Some(ReturnStatus::Paid));
        assert_eq!(ReturnStatus::parse("canceled"), Some(ReturnStatus::Cancelled));
        assert_eq!(ReturnStatus::parse("failed"), Some(ReturnStatus::Failed));
        assert_eq!(ReturnStatus::parse("PAID"), None);
    }

    #[test]
    fn test_client_signs_with_configured_secret() {
        let config = PaymentConfig {
            api_url: "https://pay.example.com/".to_owned(),
            secret_key: SecretString::from("sk_test_abc"),
            signing_secret: SecretString::from(SECRET),
        };
        let client = PaymentClient::new(&config).unwrap();
        assert_eq!(client.api_url, "https://pay.example.com");
        let sig = client.sign_return("o", "paid", "r").unwrap();
        assert!(client.verify_return("o", "paid", "r", &sig));
    }
}
