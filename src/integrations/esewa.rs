//! eSewa ePay v2: signed payment form, callback verification and the
//! transaction status API.
//!
//! A signature is `base64(HMAC-SHA256(secret, "k1=v1,k2=v2,..."))` over the
//! fields listed in `signed_field_names`, in that order.

use crate::core::Config;
use crate::core::money::format_amount;
use crate::dtos::EsewaFormDTO;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Fields we sign when building the payment form
pub const FORM_SIGNED_FIELDS: &str = "total_amount,transaction_uuid,product_code";

/// Fields a callback signature must cover; the form signature covers fewer,
/// so it can never pass for a callback.
pub const CALLBACK_SIGNED_FIELDS: [&str; 6] = [
    "transaction_code",
    "status",
    "total_amount",
    "transaction_uuid",
    "product_code",
    "signed_field_names",
];

/// Status eSewa reports for a settled payment
pub const STATUS_COMPLETE: &str = "COMPLETE";

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("payload is not a JSON object")]
    Json(#[from] serde_json::Error),
    #[error("field `{0}` is missing")]
    MissingField(String),
    #[error("field `{0}` is not covered by the signature")]
    UnsignedField(String),
    #[error("signing key rejected")]
    InvalidKey,
    #[error("signature does not match")]
    Mismatch,
}

/// Decoded and verified success callback
#[derive(Debug, Clone, PartialEq)]
pub struct EsewaCallback {
    pub transaction_code: String,
    pub status: String,
    /// As sent by the gateway, e.g. `"1,000.0"`
    pub total_amount: String,
    pub transaction_uuid: String,
    pub product_code: String,
}

pub fn sign(secret: &str, message: &str) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn signing_message(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the auto-submitted form for a pending payment.
#[instrument(skip(config, amount))]
pub fn build_form(
    config: &Config,
    amount: Decimal,
    transaction_uuid: &str,
) -> Result<EsewaFormDTO, SignatureError> {
    let total_amount = format_amount(amount);
    let message = signing_message(&[
        ("total_amount", &total_amount),
        ("transaction_uuid", transaction_uuid),
        ("product_code", &config.esewa_product_code),
    ]);
    let signature = sign(&config.esewa_secret_key, &message)?;
    let base = config.public_base_url.trim_end_matches('/');
    debug!("eSewa form signed");

    Ok(EsewaFormDTO {
        url: config.esewa_form_url.clone(),
        amount: total_amount.clone(),
        tax_amount: "0".to_string(),
        total_amount,
        transaction_uuid: transaction_uuid.to_string(),
        product_code: config.esewa_product_code.clone(),
        product_service_charge: "0".to_string(),
        product_delivery_charge: "0".to_string(),
        success_url: format!("{}/payments/esewa/success", base),
        failure_url: format!("{}/payments/esewa/failure", base),
        signed_field_names: FORM_SIGNED_FIELDS.to_string(),
        signature,
    })
}

fn field_as_string(payload: &Map<String, Value>, name: &str) -> Result<String, SignatureError> {
    match payload.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(SignatureError::MissingField(name.to_string())),
        Some(other) => Ok(other.to_string()),
    }
}

/// Decodes the base64 JSON `data` parameter without checking its signature.
pub fn decode_payload(data: &str) -> Result<Map<String, Value>, SignatureError> {
    // `+` arrives as a space when the query string was not percent-encoded
    let raw = STANDARD.decode(data.trim().replace(' ', "+"))?;
    Ok(serde_json::from_slice::<Map<String, Value>>(&raw)?)
}

/// Decodes a callback and checks its signature against `secret`.
#[instrument(skip_all)]
pub fn verify_callback(secret: &str, data: &str) -> Result<EsewaCallback, SignatureError> {
    let payload = decode_payload(data)?;
    let signed_field_names = field_as_string(&payload, "signed_field_names")?;
    let provided = field_as_string(&payload, "signature")?;

    let names: Vec<&str> = signed_field_names.split(',').map(str::trim).collect();
    if let Some(missing) = CALLBACK_SIGNED_FIELDS
        .iter()
        .find(|required| !names.contains(required))
    {
        warn!(field = %missing, "eSewa callback leaves a field unsigned");
        return Err(SignatureError::UnsignedField(missing.to_string()));
    }

    let mut values = Vec::new();
    for name in names {
        values.push((name, field_as_string(&payload, name)?));
    }
    let fields: Vec<(&str, &str)> = values.iter().map(|(n, v)| (*n, v.as_str())).collect();
    let expected = sign(secret, &signing_message(&fields))?;

    if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        warn!("eSewa callback signature mismatch");
        return Err(SignatureError::Mismatch);
    }

    Ok(EsewaCallback {
        transaction_code: field_as_string(&payload, "transaction_code")?,
        status: field_as_string(&payload, "status")?,
        total_amount: field_as_string(&payload, "total_amount")?,
        transaction_uuid: field_as_string(&payload, "transaction_uuid")?,
        product_code: field_as_string(&payload, "product_code")?,
    })
}

/// Asks the gateway for the current state of a transaction.
#[instrument(skip(http, config, total_amount))]
pub async fn check_status(
    http: &reqwest::Client,
    config: &Config,
    transaction_uuid: &str,
    total_amount: Decimal,
) -> Result<Value, reqwest::Error> {
    let total_amount = format_amount(total_amount);
    let response = http
        .get(&config.esewa_status_url)
        .query(&[
            ("product_code", config.esewa_product_code.as_str()),
            ("total_amount", total_amount.as_str()),
            ("transaction_uuid", transaction_uuid),
        ])
        .send()
        .await?
        .error_for_status()?;
    response.json::<Value>().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ESEWA_SANDBOX_SECRET;

    // Callback for txn-pending-0001 / 900.0 signed with the sandbox key
    const SAMPLE_CALLBACK: &str = "eyJ0cmFuc2FjdGlvbl9jb2RlIjoiMDAwQUUwMSIsInN0YXR1cyI6IkNPTVBMRVRFIiwidG90YWxfYW1vdW50IjoiOTAwLjAiLCJ0cmFuc2FjdGlvbl91dWlkIjoidHhuLXBlbmRpbmctMDAwMSIsInByb2R1Y3RfY29kZSI6IkVQQVlURVNUIiwic2lnbmVkX2ZpZWxkX25hbWVzIjoidHJhbnNhY3Rpb25fY29kZSxzdGF0dXMsdG90YWxfYW1vdW50LHRyYW5zYWN0aW9uX3V1aWQscHJvZHVjdF9jb2RlLHNpZ25lZF9maWVsZF9uYW1lcyIsInNpZ25hdHVyZSI6IkZ1MUwrRGtPeUtLc21ZODR5QTRvcjNVKzZwWExSYXBqQlNSWlpGUGpuRXc9In0=";

    #[test]
    fn signs_the_documented_sandbox_vector() {
        let signature = sign(
            ESEWA_SANDBOX_SECRET,
            "total_amount=100,transaction_uuid=11-201-13,product_code=EPAYTEST",
        )
        .unwrap();
        assert_eq!(signature, "5DZywcrTKD0gia/rsSMcrRHmJl+4Tbol6S+lWgdJ94E=");
    }

    #[test]
    fn form_carries_signature_and_callback_urls() {
        let config = Config {
            public_base_url: "https://api.washbay.test/".to_string(),
            ..Default::default()
        };
        let form = build_form(&config, Decimal::new(100, 0), "11-201-13").unwrap();
        assert_eq!(form.total_amount, "100.00");
        assert_eq!(form.signed_field_names, FORM_SIGNED_FIELDS);
        assert_eq!(
            form.success_url,
            "https://api.washbay.test/payments/esewa/success"
        );
        let expected = sign(
            ESEWA_SANDBOX_SECRET,
            "total_amount=100.00,transaction_uuid=11-201-13,product_code=EPAYTEST",
        )
        .unwrap();
        assert_eq!(form.signature, expected);
    }

    #[test]
    fn verifies_a_signed_callback() {
        let callback = verify_callback(ESEWA_SANDBOX_SECRET, SAMPLE_CALLBACK).unwrap();
        assert_eq!(callback.status, STATUS_COMPLETE);
        assert_eq!(callback.transaction_uuid, "txn-pending-0001");
        assert_eq!(callback.total_amount, "900.0");
        assert_eq!(callback.transaction_code, "000AE01");
    }

    #[test]
    fn rejects_a_tampered_callback() {
        let mut payload = decode_payload(SAMPLE_CALLBACK).unwrap();
        payload.insert("total_amount".to_string(), Value::String("9.0".to_string()));
        let tampered = STANDARD.encode(serde_json::to_vec(&payload).unwrap());
        assert!(matches!(
            verify_callback(ESEWA_SANDBOX_SECRET, &tampered),
            Err(SignatureError::Mismatch)
        ));
        assert!(matches!(
            verify_callback("another-secret", SAMPLE_CALLBACK),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn form_signature_does_not_verify_a_callback() {
        let form = build_form(&Config::default(), Decimal::new(900, 0), "tx-abc").unwrap();
        let replayed = serde_json::json!({
            "transaction_code": "FAKE",
            "status": "COMPLETE",
            "total_amount": form.total_amount,
            "transaction_uuid": form.transaction_uuid,
            "product_code": form.product_code,
            "signed_field_names": FORM_SIGNED_FIELDS,
            "signature": form.signature,
        });
        let data = STANDARD.encode(replayed.to_string());
        assert!(matches!(
            verify_callback(ESEWA_SANDBOX_SECRET, &data),
            Err(SignatureError::UnsignedField(ref field)) if field == "transaction_code"
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            verify_callback(ESEWA_SANDBOX_SECRET, "%%%"),
            Err(SignatureError::Encoding(_))
        ));
        let not_signed = STANDARD.encode(r#"{"status":"COMPLETE"}"#);
        assert!(matches!(
            verify_callback(ESEWA_SANDBOX_SECRET, &not_signed),
            Err(SignatureError::MissingField(_))
        ));
    }
}
