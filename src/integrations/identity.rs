//! Identity-provider webhooks: Svix signature verification and user events.
//!
//! Each delivery carries `svix-id`, `svix-timestamp` and `svix-signature`
//! headers. The signature header is a space separated list of `v1,<base64>`
//! entries, any of which may match
//! `HMAC-SHA256(key, "{id}.{timestamp}.{body}")`.

use crate::dtos::UpsertUserDTO;
use crate::entities::UserRole;
use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Deliveries older or newer than this many seconds are refused
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing header `{0}`")]
    MissingHeader(&'static str),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("webhook secret is not a valid whsec_ key")]
    InvalidSecret,
    #[error("timestamp outside the tolerance window")]
    Stale,
    #[error("no signature matched")]
    InvalidSignature,
}

pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.strip_prefix("whsec_").unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;
        Ok(Self { key })
    }

    pub fn sign(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(format!("{}.{}.", msg_id, timestamp).as_bytes());
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, body, Utc::now().timestamp())
    }

    #[instrument(skip(self, headers, body))]
    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let msg_id = header(headers, "svix-id")?;
        let timestamp = header(headers, "svix-timestamp")?;
        let signatures = header(headers, "svix-signature")?;

        let timestamp: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::MalformedPayload("svix-timestamp is not a number".into()))?;
        let drift = now.abs_diff(timestamp);
        if drift > TIMESTAMP_TOLERANCE_SECS.unsigned_abs() {
            warn!("Webhook timestamp {} is {}s away", timestamp, drift);
            return Err(WebhookError::Stale);
        }

        let expected = self.sign(msg_id, timestamp, body)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, signature)| bool::from(signature.as_bytes().ct_eq(expected.as_bytes())));

        if !matched {
            return Err(WebhookError::InvalidSignature);
        }
        debug!("Webhook {} verified", msg_id);
        Ok(())
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

// Provider payload shapes

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct PhoneNumber {
    id: String,
    phone_number: String,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetadata {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    primary_email_address_id: Option<String>,
    #[serde(default)]
    phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    primary_phone_number_id: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    public_metadata: Option<PublicMetadata>,
}

#[derive(Debug, Deserialize)]
struct DeletedUser {
    id: Option<String>,
}

impl ProviderUser {
    fn into_upsert(self) -> Result<UpsertUserDTO, WebhookError> {
        let email = self
            .primary_email_address_id
            .as_ref()
            .and_then(|primary| self.email_addresses.iter().find(|e| &e.id == primary))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
            .ok_or_else(|| WebhookError::MalformedPayload("user has no email address".into()))?;
        let phone = self
            .primary_phone_number_id
            .as_ref()
            .and_then(|primary| self.phone_numbers.iter().find(|p| &p.id == primary))
            .or_else(|| self.phone_numbers.first())
            .map(|p| p.phone_number.clone());
        let role = self
            .public_metadata
            .and_then(|m| m.role)
            .and_then(|raw| UserRole::from_metadata(&raw));

        Ok(UpsertUserDTO {
            auth_id: self.id,
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            image_url: self.image_url,
            phone,
            role,
        })
    }
}

/// What a verified webhook asks us to do
#[derive(Debug, PartialEq)]
pub enum IdentityEvent {
    /// `user.created` and `user.updated`
    Upsert(UpsertUserDTO),
    Deleted { auth_id: String },
    Ignored(String),
}

pub fn parse_event(body: &[u8]) -> Result<IdentityEvent, WebhookError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    match envelope.kind.as_str() {
        "user.created" | "user.updated" => {
            let user: ProviderUser = serde_json::from_value(envelope.data)
                .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
            Ok(IdentityEvent::Upsert(user.into_upsert()?))
        }
        "user.deleted" => {
            let deleted: DeletedUser = serde_json::from_value(envelope.data)
                .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
            let auth_id = deleted
                .id
                .ok_or_else(|| WebhookError::MalformedPayload("deleted user without id".into()))?;
            Ok(IdentityEvent::Deleted { auth_id })
        }
        _ => Ok(IdentityEvent::Ignored(envelope.kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_d2FzaGJheS13ZWJob29rLXNpZ25pbmcta2V5LTAwMDE=";
    const BODY: &str =
        r#"{"type":"user.deleted","data":{"id":"user_customer_dave","deleted":true}}"#;
    const SIGNATURE: &str = "E5YnSItZF76WFG12OqM6291R6CEI9mwRiFrj3PWF+9o=";

    fn headers(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("svix-id", HeaderValue::from_static("msg_2abc"));
        headers.insert("svix-timestamp", HeaderValue::from_static("1700000000"));
        headers.insert("svix-signature", HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn accepts_a_known_signature() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let sig = format!("v1,bogus v1,{}", SIGNATURE);
        assert!(verifier
            .verify_at(&headers(&sig), BODY.as_bytes(), 1_700_000_100)
            .is_ok());
    }

    #[test]
    fn rejects_bad_signature_and_stale_timestamp() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let sig = format!("v1,{}", SIGNATURE);
        assert!(matches!(
            verifier.verify_at(&headers("v1,AAAA"), BODY.as_bytes(), 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        ));
        assert!(matches!(
            verifier.verify_at(&headers(&sig), b"{}", 1_700_000_000),
            Err(WebhookError::InvalidSignature)
        ));
        assert!(matches!(
            verifier.verify_at(&headers(&sig), BODY.as_bytes(), 1_700_000_000 + 301),
            Err(WebhookError::Stale)
        ));
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        for extreme in [i64::MIN, i64::MAX] {
            let mut h = headers("v1,AAAA");
            h.insert(
                "svix-timestamp",
                HeaderValue::from_str(&extreme.to_string()).unwrap(),
            );
            assert!(matches!(
                verifier.verify_at(&h, BODY.as_bytes(), 1_700_000_000),
                Err(WebhookError::Stale)
            ));
        }
    }

    #[test]
    fn missing_headers_are_reported() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let mut partial = headers("v1,AAAA");
        partial.remove("svix-timestamp");
        assert!(matches!(
            verifier.verify_at(&partial, BODY.as_bytes(), 1_700_000_000),
            Err(WebhookError::MissingHeader("svix-timestamp"))
        ));
    }

    #[test]
    fn parses_user_events() {
        let created = br#"{
            "type": "user.created",
            "data": {
                "id": "user_2x",
                "email_addresses": [
                    {"id": "idn_1", "email_address": "old@washbay.test"},
                    {"id": "idn_2", "email_address": "primary@washbay.test"}
                ],
                "primary_email_address_id": "idn_2",
                "phone_numbers": [],
                "first_name": "Erin",
                "last_name": null,
                "image_url": "https://img.test/erin.png",
                "public_metadata": {"role": "staff"}
            }
        }"#;
        match parse_event(created).unwrap() {
            IdentityEvent::Upsert(user) => {
                assert_eq!(user.auth_id, "user_2x");
                assert_eq!(user.email, "primary@washbay.test");
                assert_eq!(user.role, Some(UserRole::Staff));
                assert!(user.phone.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(
            parse_event(BODY.as_bytes()).unwrap(),
            IdentityEvent::Deleted {
                auth_id: "user_customer_dave".to_string()
            }
        );
        assert_eq!(
            parse_event(br#"{"type":"session.created","data":{}}"#).unwrap(),
            IdentityEvent::Ignored("session.created".to_string())
        );
        assert!(parse_event(b"not json").is_err());
    }
}
