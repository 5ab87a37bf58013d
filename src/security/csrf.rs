//! Session-bound CSRF tokens.
//!
//! One signing key and one verification contract. The payload carries the
//! owning session id, issue time and a nonce; tokens expire after
//! `csrf_ttl_secs` (1 hour by default).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::observability::metrics;
use crate::security::crypto::generate_secure_random;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfClaims {
    pub session_id: String,
    /// Issue time, epoch milliseconds.
    pub timestamp: i64,
    pub nonce: String,
    pub exp: i64,
}

pub struct CsrfService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl CsrfService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn generate(&self, session_id: &str) -> Result<String, TokenError> {
        self.generate_at(session_id, Utc::now().timestamp_millis())
    }

    pub fn generate_at(&self, session_id: &str, now_ms: i64) -> Result<String, TokenError> {
        let claims = CsrfClaims {
            session_id: session_id.to_string(),
            timestamp: now_ms,
            nonce: generate_secure_random(16),
            exp: now_ms / 1000 + self.ttl_secs,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Sign)
    }

    /// True only for an authentic, unexpired token minted for `session_id`.
    pub fn verify(&self, token: &str, session_id: &str) -> bool {
        match self.check_at(token, session_id, Utc::now().timestamp()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "CSRF token rejected");
                metrics::record_token_failure("csrf", &e);
                false
            }
        }
    }

    pub fn check_at(&self, token: &str, session_id: &str, now_secs: i64) -> Result<(), TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = jsonwebtoken::decode::<CsrfClaims>(token, &self.decoding, &validation)
            .map_err(TokenError::Invalid)?
            .claims;

        if claims.exp <= now_secs {
            return Err(TokenError::Expired);
        }
        if claims.session_id != session_id {
            return Err(TokenError::SessionMismatch);
        }
        Ok(())
    }
}
