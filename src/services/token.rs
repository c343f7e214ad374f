// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token primitives.
//!
//! Access tokens are HS256 JWTs checked purely by signature and expiry;
//! there is no revocation list. Refresh tokens are random opaque strings
//! whose SHA-256 digest is what the session store keeps.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Random bytes in a refresh token before encoding.
const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Marks a user-facing token
    pub user: bool,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Issuer (service name)
    pub iss: String,
}

/// Why an access token was rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("token subject is empty")]
    EmptySubject,
}

/// Issues and validates access tokens. Cheap to clone.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenService {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    /// Sign a token for `user_id` valid for `ttl` from now.
    pub fn issue(&self, user_id: &str, ttl: Duration) -> anyhow::Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        let claims = Claims {
            sub: user_id.to_string(),
            user: true,
            iat: now,
            exp: now + ttl.as_secs(),
            iss: self.issuer.clone(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify signature, algorithm, issuer and expiry; return the claims.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        // Only HS256 is accepted, so a token declaring another algorithm
        // (including "none" or an asymmetric one) is rejected. This is
        // narrower than the HMAC family on purpose: HS384 and HS512 are
        // never issued here, so they are refused too.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    _ => TokenError::Malformed,
                }
            })?;

        if token_data.claims.sub.is_empty() {
            return Err(TokenError::EmptySubject);
        }

        Ok(token_data.claims)
    }
}

/// Generate a new opaque refresh token value.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Storage key for a refresh token value.
pub fn refresh_token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit_test_secret_32_bytes_long!!";

    fn service() -> TokenService {
        TokenService::new(SECRET, "account-service")
    }

    fn encode_claims(claims: &Claims, alg: Algorithm, secret: &[u8]) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn claims_at(sub: &str, iat: u64, exp: u64) -> Claims {
        Claims {
            sub: sub.to_string(),
            user: true,
            iat,
            exp,
            iss: "account-service".to_string(),
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn test_issue_then_validate() {
        let svc = service();
        let token = svc.issue("user-1", Duration::from_secs(900)).unwrap();
        let claims = svc.validate(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.iss, "account-service");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_expired_token_rejected() {
        let past = now() - 3600;
        let token = encode_claims(&claims_at("user-1", past, past + 60), Algorithm::HS256, SECRET);
        assert_eq!(service().validate(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = encode_claims(
            &claims_at("user-1", now(), now() + 60),
            Algorithm::HS256,
            b"some_other_secret_32_bytes_long!",
        );
        assert_eq!(
            service().validate(&token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let token = encode_claims(&claims_at("user-1", now(), now() + 60), Algorithm::HS512, SECRET);
        assert!(service().validate(&token).is_err());
    }

    #[test]
    fn test_empty_subject_rejected() {
        let token = encode_claims(&claims_at("", now(), now() + 60), Algorithm::HS256, SECRET);
        assert_eq!(
            service().validate(&token).unwrap_err(),
            TokenError::EmptySubject
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            service().validate("not.a.jwt").unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = claims_at("user-1", now(), now() + 60);
        claims.iss = "someone-else".to_string();
        let token = encode_claims(&claims, Algorithm::HS256, SECRET);
        assert_eq!(service().validate(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_refresh_tokens_are_unique_and_digest_stable() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert_eq!(refresh_token_digest(&a), refresh_token_digest(&a));
        assert_ne!(refresh_token_digest(&a), refresh_token_digest(&b));
    }
}
