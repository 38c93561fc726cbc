//! Signed, time-limited tokens.
//!
//! Access and refresh tokens are HS256 JWTs carrying `sub`, `power`, `exp`
//! and `typ`. Verification is a pure decode-and-validate step; nothing is
//! looked up or stored server-side, so a token stays valid until its own
//! expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::{
    errors::AuthResult,
    models::{Power, TokenClaims, TokenKind, UserId},
};

/// Encodes and verifies tokens with one process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `subject_id` expiring `ttl` from now.
    pub fn issue(
        &self,
        subject_id: UserId,
        power: Power,
        kind: TokenKind,
        ttl: Duration,
    ) -> AuthResult<String> {
        let claims = TokenClaims {
            sub: subject_id.to_string(),
            power,
            exp: (Utc::now() + ttl).timestamp(),
            typ: kind,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Decode and validate a token of the expected kind.
    ///
    /// Returns `None` for a bad signature, a malformed token, an unknown power
    /// level, a non-numeric subject, a kind mismatch, or `now >= exp`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Option<TokenClaims> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .ok()?
            .claims;

        if claims.typ != kind || claims.subject_id().is_none() {
            return None;
        }
        if Utc::now().timestamp() >= claims.exp {
            return None;
        }

        Some(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn codec() -> TokenCodec {
        TokenCodec::new(TEST_SECRET)
    }

    #[test]
    fn test_issue_and_verify() {
        let codec = codec();
        let token = codec
            .issue(42, Power::Admin, TokenKind::Access, Duration::minutes(15))
            .unwrap();

        let claims = codec.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.subject_id(), Some(42));
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.power, Power::Admin);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec();
        let past = codec
            .issue(1, Power::Normal, TokenKind::Access, Duration::seconds(-5))
            .unwrap();
        assert!(codec.verify(&past, TokenKind::Access).is_none());

        // Expiry equal to now is already expired.
        let now = codec
            .issue(1, Power::Normal, TokenKind::Access, Duration::zero())
            .unwrap();
        assert!(codec.verify(&now, TokenKind::Access).is_none());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec();
        let token = codec
            .issue(7, Power::Normal, TokenKind::Access, Duration::minutes(15))
            .unwrap();

        let payload_start = token.find('.').unwrap() + 1;
        let payload_end = token.rfind('.').unwrap();
        let target = payload_start + (payload_end - payload_start) / 2;

        let mut bytes = token.into_bytes();
        bytes[target] = if bytes[target] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(codec.verify(&tampered, TokenKind::Access).is_none());
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let codec = codec();
        let token = codec
            .issue(7, Power::Normal, TokenKind::Access, Duration::minutes(15))
            .unwrap();

        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(codec.verify(&tampered, TokenKind::Access).is_none());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = codec()
            .issue(7, Power::Normal, TokenKind::Access, Duration::minutes(15))
            .unwrap();
        let other = TokenCodec::new("another-secret-key-for-testing-minimum-32-chars");
        assert!(other.verify(&token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let codec = codec();
        let refresh = codec
            .issue(7, Power::Normal, TokenKind::Refresh, Duration::days(7))
            .unwrap();
        assert!(codec.verify(&refresh, TokenKind::Access).is_none());
        assert!(codec.verify(&refresh, TokenKind::Refresh).is_some());
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = codec();
        assert!(codec.verify("", TokenKind::Access).is_none());
        assert!(codec.verify("invalid.token.here", TokenKind::Access).is_none());
    }
}
