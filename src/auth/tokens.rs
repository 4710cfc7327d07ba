// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session token issuing and verification.
//!
//! Tokens are stateless: there is no server-side revocation, logging out only
//! discards the token on the client.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, AuthenticatedUser, SessionClaims};
use crate::storage::StoredUser;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// Issue a token for `user`, valid for the configured lifetime.
    pub fn issue(&self, user: &StoredUser) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id.clone(),
            wallet_address: user.wallet_address.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature and expiry and return the caller.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                _ => AuthError::Malformed,
            }
        })?;
        Ok(data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support;

    #[test]
    fn issued_token_verifies() {
        let issuer = TokenIssuer::new("secret", 30);
        let user = test_support::user("alice@example.com", "alice", 'a');
        let token = issuer.issue(&user).unwrap();

        let verified = issuer.verify(&token).unwrap();
        assert_eq!(verified.user_id, user.id);
        assert_eq!(verified.wallet_address, user.wallet_address);
        let ttl = verified.expires_at - Utc::now().timestamp();
        assert!(ttl > 29 * 86_400 && ttl <= 30 * 86_400);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let user = test_support::user("alice@example.com", "alice", 'a');
        let token = TokenIssuer::new("other", 30).issue(&user).unwrap();
        assert!(matches!(
            TokenIssuer::new("secret", 30).verify(&token),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let issuer = TokenIssuer::new("secret", 30);
        let user = test_support::user("alice@example.com", "alice", 'a');
        let token = issuer.issue(&user).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = issuer
            .issue(&test_support::user("mallory@example.com", "mallory", 'f'))
            .unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");
        assert!(issuer.verify(&tampered).is_err());
    }

    #[test]
    fn rejects_expired_and_garbage_tokens() {
        let issuer = TokenIssuer::new("secret", 30);
        let claims = SessionClaims {
            sub: "user".into(),
            wallet_address: "0x0".into(),
            iat: 1_000,
            exp: 2_000,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(issuer.verify(&expired), Err(AuthError::Expired)));
        assert!(matches!(issuer.verify("not-a-jwt"), Err(AuthError::Malformed)));
    }
}
