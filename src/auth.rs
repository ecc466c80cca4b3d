//! JWT session tokens.
//!
//! Tokens are HS256 and carry the account uid as the subject. Issuance
//! happens on signup and login; every protected route verifies the token and
//! resolves it back to the requester's uid.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn sign(&self, uid: &str) -> Result<String> {
        let claims = Claims {
            sub: uid.to_string(),
            exp: (Utc::now() + chrono::Duration::days(TOKEN_VALIDITY_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to sign auth token")
    }

    /// Returns the uid carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<String> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims.sub)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_tokens_verify_back_to_the_uid() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.sign("user-1").unwrap();
        assert_eq!(issuer.verify(&token).as_deref(), Some("user-1"));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issuer = TokenIssuer::new("test-secret");
        let other = TokenIssuer::new("other-secret");
        let token = other.sign("user-1").unwrap();
        assert_eq!(issuer.verify(&token), None);
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let issuer = TokenIssuer::new("test-secret");
        assert_eq!(issuer.verify("not-a-jwt"), None);
    }
}
