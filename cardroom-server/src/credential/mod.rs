//! Access Credential Codec
//!
//! Issues and validates the scannable check-in credential (QR payload).
//! Pure and stateless: validity is computed entirely from the payload fields
//! plus a shared signing secret; nothing is persisted and no store is
//! touched. Malformed, expired, and forged payloads are all reported as
//! plain "invalid" - callers cannot and must not distinguish them.

use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::utils::{AppError, AppResult, now_millis};

/// Credential lifetime: 10 minutes
pub const CREDENTIAL_TTL_MILLIS: i64 = 10 * 60 * 1000;

/// Separator for the signed message. Ids containing it are rejected at
/// issuance so field boundaries cannot be forged.
const FIELD_SEPARATOR: char = ':';

/// Credential kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Patron,
    Staff,
}

/// The signed, time-boxed payload proving a scanned identity claim
///
/// Serialized as JSON for encoding into a QR image by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCredential {
    pub uid: String,
    pub login_id: String,
    /// Issuance time, Unix millis
    pub issued_at: i64,
    pub kind: CredentialKind,
    /// Hex HMAC-SHA256 over `uid:loginId:issuedAt`
    pub token: String,
}

impl QrCredential {
    pub fn expires_at(&self) -> i64 {
        self.issued_at + CREDENTIAL_TTL_MILLIS
    }
}

/// Credential codec configuration
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Shared signing secret, from `QR_SECRET_KEY`
    pub secret: String,
}

impl CredentialConfig {
    /// Load the signing secret from the environment
    ///
    /// Missing secret is a boot failure in production; development falls
    /// back to a fixed key so local stacks come up without setup.
    pub fn from_env(is_production: bool) -> AppResult<Self> {
        match std::env::var("QR_SECRET_KEY") {
            Ok(secret) if secret.len() >= 16 => Ok(Self { secret }),
            Ok(_) => Err(AppError::internal(
                "QR_SECRET_KEY must be at least 16 characters long",
            )),
            Err(_) if is_production => Err(AppError::internal(
                "QR_SECRET_KEY environment variable must be set in production",
            )),
            Err(_) => {
                tracing::warn!("QR_SECRET_KEY not set, using development key");
                Ok(Self {
                    secret: "cardroom-development-qr-secret".to_string(),
                })
            }
        }
    }
}

/// Stateless codec for the access credential
#[derive(Clone)]
pub struct CredentialCodec {
    key: hmac::Key,
}

impl CredentialCodec {
    pub fn new(config: &CredentialConfig) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, config.secret.as_bytes()),
        }
    }

    /// Issue a credential for a subject
    ///
    /// Rejects ids containing the field separator - with it, two different
    /// (uid, loginId) pairs could produce the same signed message.
    pub fn issue(&self, uid: &str, login_id: &str, kind: CredentialKind) -> AppResult<QrCredential> {
        if uid.is_empty() || login_id.is_empty() {
            return Err(AppError::validation("uid and loginId must not be empty"));
        }
        if uid.contains(FIELD_SEPARATOR) || login_id.contains(FIELD_SEPARATOR) {
            return Err(AppError::validation(format!(
                "ids must not contain '{FIELD_SEPARATOR}'"
            )));
        }

        let issued_at = now_millis();
        let tag = hmac::sign(&self.key, Self::message(uid, login_id, issued_at).as_bytes());

        Ok(QrCredential {
            uid: uid.to_string(),
            login_id: login_id.to_string(),
            issued_at,
            kind,
            token: hex::encode(tag.as_ref()),
        })
    }

    /// Serialize a credential to its QR payload
    pub fn encode(&self, credential: &QrCredential) -> AppResult<String> {
        serde_json::to_string(credential)
            .map_err(|e| AppError::internal(format!("Failed to encode credential: {e}")))
    }

    /// Structural parse only; never fails loudly
    pub fn decode(&self, payload: &str) -> Option<QrCredential> {
        serde_json::from_str(payload).ok()
    }

    /// Validate a scanned payload against the current clock
    pub fn verify(&self, payload: &str) -> bool {
        self.verify_at(payload, now_millis())
    }

    /// Validate against an explicit clock (deterministic expiry tests)
    ///
    /// False when any field is missing or empty, when
    /// `now > issued_at + TTL`, or when the signature does not match.
    /// `ring::hmac::verify` is constant-time, so forged tokens learn nothing
    /// from response timing.
    pub fn verify_at(&self, payload: &str, now: i64) -> bool {
        let Some(data) = self.decode(payload) else {
            return false;
        };

        if data.uid.is_empty() || data.login_id.is_empty() || data.token.is_empty() {
            return false;
        }

        if now > data.issued_at + CREDENTIAL_TTL_MILLIS {
            return false;
        }

        let Ok(tag) = hex::decode(&data.token) else {
            return false;
        };

        hmac::verify(
            &self.key,
            Self::message(&data.uid, &data.login_id, data.issued_at).as_bytes(),
            &tag,
        )
        .is_ok()
    }

    /// Decode and validate in one step; `None` means invalid
    pub fn verify_decode(&self, payload: &str) -> Option<QrCredential> {
        if self.verify(payload) {
            self.decode(payload)
        } else {
            None
        }
    }

    fn message(uid: &str, login_id: &str, issued_at: i64) -> String {
        format!("{uid}{FIELD_SEPARATOR}{login_id}{FIELD_SEPARATOR}{issued_at}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> CredentialCodec {
        CredentialCodec::new(&CredentialConfig {
            secret: "test-secret-key-for-credentials".to_string(),
        })
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let cred = codec.issue("u1", "u1_0101", CredentialKind::Patron).unwrap();
        let payload = codec.encode(&cred).unwrap();

        assert!(codec.verify(&payload));
        let decoded = codec.verify_decode(&payload).unwrap();
        assert_eq!(decoded.uid, "u1");
        assert_eq!(decoded.login_id, "u1_0101");
        assert_eq!(decoded.kind, CredentialKind::Patron);
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let cred = codec.issue("u1", "u1_0101", CredentialKind::Patron).unwrap();
        let payload = codec.encode(&cred).unwrap();
        let issued = cred.issued_at;

        assert!(codec.verify_at(&payload, issued + CREDENTIAL_TTL_MILLIS - 1));
        assert!(codec.verify_at(&payload, issued + CREDENTIAL_TTL_MILLIS));
        assert!(!codec.verify_at(&payload, issued + CREDENTIAL_TTL_MILLIS + 1));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec();
        let mut cred = codec.issue("u1", "u1_0101", CredentialKind::Patron).unwrap();
        let flipped = if cred.token.starts_with("00") { "11" } else { "00" };
        cred.token = format!("{}{}", flipped, &cred.token[2..]);
        let payload = codec.encode(&cred).unwrap();
        assert!(!codec.verify(&payload));
    }

    #[test]
    fn test_tampered_field_rejected() {
        let codec = codec();
        let mut cred = codec.issue("u1", "u1_0101", CredentialKind::Patron).unwrap();
        cred.uid = "u2".to_string();
        let payload = codec.encode(&cred).unwrap();
        assert!(!codec.verify(&payload));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let codec_a = codec();
        let codec_b = CredentialCodec::new(&CredentialConfig {
            secret: "a-different-secret-entirely".to_string(),
        });
        let cred = codec_a
            .issue("u1", "u1_0101", CredentialKind::Patron)
            .unwrap();
        let payload = codec_a.encode(&cred).unwrap();
        assert!(!codec_b.verify(&payload));
    }

    #[test]
    fn test_malformed_payload() {
        let codec = codec();
        assert!(codec.decode("not json").is_none());
        assert!(codec.decode("{\"uid\": \"u1\"}").is_none());
        assert!(!codec.verify("not json"));
        assert!(!codec.verify("{\"uid\": \"u1\"}"));
    }

    #[test]
    fn test_separator_in_id_rejected() {
        let codec = codec();
        assert!(codec.issue("u:1", "login", CredentialKind::Patron).is_err());
        assert!(codec.issue("u1", "log:in", CredentialKind::Patron).is_err());
        assert!(codec.issue("", "login", CredentialKind::Patron).is_err());
    }
}
