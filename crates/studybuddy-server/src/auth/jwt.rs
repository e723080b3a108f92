//! Signed access and refresh tokens (HS256)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use studybuddy::AccountType;
use thiserror::Error;

/// Clock skew tolerated when checking `exp`
const LEEWAY_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub account_type: AccountType,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("expected a {expected:?} token")]
    WrongType { expected: TokenType },
}

/// Access plus refresh token, as returned by login, register and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Issues and verifies tokens with one shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, access_ttl_minutes: i64, refresh_ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    pub fn issue(
        &self,
        user_id: &str,
        email: &str,
        account_type: AccountType,
        typ: TokenType,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match typ {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        self.encode_claims(&Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            account_type,
            typ,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        })
    }

    pub fn issue_pair(
        &self,
        user_id: &str,
        email: &str,
        account_type: AccountType,
    ) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            token: self.issue(user_id, email, account_type, TokenType::Access)?,
            refresh_token: self.issue(user_id, email, account_type, TokenType::Refresh)?,
        })
    }

    /// Check signature, expiry and token type
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.typ != expected {
            return Err(TokenError::WrongType { expected });
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret-0123456789", 60, 7)
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let pair = keys
            .issue_pair("user-1", "a@example.com", AccountType::Paid)
            .unwrap();

        let claims = keys.verify(&pair.token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.account_type, AccountType::Paid);
        assert_eq!(claims.exp - claims.iat, 3600);

        let refresh = keys.verify(&pair.refresh_token, TokenType::Refresh).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let keys = keys();
        let pair = keys
            .issue_pair("user-1", "a@example.com", AccountType::Free)
            .unwrap();
        assert!(matches!(
            keys.verify(&pair.refresh_token, TokenType::Access),
            Err(TokenError::WrongType { .. })
        ));
    }

    #[test]
    fn test_rejects_expired_and_foreign_tokens() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let expired = keys
            .encode_claims(&Claims {
                sub: "user-1".to_string(),
                email: "a@example.com".to_string(),
                account_type: AccountType::Free,
                typ: TokenType::Access,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert!(matches!(
            keys.verify(&expired, TokenType::Access),
            Err(TokenError::Invalid(_))
        ));

        let other = JwtKeys::new("another-secret-0123456789", 60, 7)
            .issue("user-1", "a@example.com", AccountType::Free, TokenType::Access)
            .unwrap();
        assert!(keys.verify(&other, TokenType::Access).is_err());
        assert!(keys.verify("not.a.token", TokenType::Access).is_err());
    }
}
