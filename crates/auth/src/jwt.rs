//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm or undecodable payload.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Decode and verify a bearer token into claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// HMAC-SHA256 validator over a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The time window lives in `issued_at`/`expires_at` and is checked by
        // `validate_claims`, not by the registered `exp` claim.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tillstack_core::{TenantId, UserId};

    use super::*;
    use crate::Role;

    const SECRET: &[u8] = b"unit-test-secret";

    fn mint(secret: &[u8], claims: &JwtClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::new("cashier")],
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn valid_token_yields_claims() {
        let now = Utc::now();
        let c = claims(now);
        let token = mint(SECRET, &c);
        let decoded = Hs256JwtValidator::new(SECRET).validate(&token, now).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let now = Utc::now();
        let token = mint(b"someone-else", &claims(now));
        let err = Hs256JwtValidator::new(SECRET).validate(&token, now).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn expired_token_is_rejected_after_signature_check() {
        let now = Utc::now();
        let token = mint(SECRET, &claims(now));
        let later = now + Duration::hours(1);
        let err = Hs256JwtValidator::new(SECRET).validate(&token, later).unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = Hs256JwtValidator::new(SECRET)
            .validate("not.a.jwt", Utc::now())
            .unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }
}
