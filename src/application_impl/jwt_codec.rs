use crate::application_port::{SessionClaims, TokenCodec, TokenError};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub access_ttl: Duration,
    pub signing_key: Vec<u8>,
}

/// HS256 access tokens. Expiry is checked here at millisecond resolution;
/// the library's own `exp` validation is disabled.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn create_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let ttl = TimeDelta::from_std(self.cfg.access_ttl)
            .map_err(|e| TokenError::Signing(format!("access ttl out of range: {e}")))?;
        // `iat`/`exp` are whole seconds; sub-second parts of `now + ttl` are truncated.
        let exp_dt = now + ttl;
        let claims = SessionClaims {
            sub: subject.to_string(),
            jti: Self::gen_jti(),
            iat: now.timestamp(),
            exp: exp_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn parse_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = false;
        v.validate_aud = false;
        v.leeway = 0;
        v.set_issuer(&[self.cfg.issuer.as_str()]);

        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &v,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(e.to_string()),
        })?;

        if data.claims.exp.saturating_mul(1000) < now.timestamp_millis() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

impl TokenCodec for JwtHs256Codec {
    fn create(&self, subject: &str) -> Result<String, TokenError> {
        self.create_at(subject, Utc::now())
    }

    fn parse(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.parse_at(token, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(key: &str, ttl: Duration) -> JwtHs256Codec {
        JwtHs256Codec::new(JwtConfig {
            issuer: "todo-backend".to_string(),
            access_ttl: ttl,
            signing_key: key.as_bytes().to_vec(),
        })
    }

    fn at_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn created_token_parses_back_to_its_claims() {
        let codec = codec("secret", Duration::from_secs(15 * 60));
        let now = at_millis(1_700_000_000_000);

        let token = codec.create_at("1", now).unwrap();
        let claims = codec.parse_at(&token, now + TimeDelta::minutes(1)).unwrap();

        assert_eq!(claims.sub, "1");
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_000_000 + 15 * 60);
        assert_eq!(claims.expires_at(), now + TimeDelta::minutes(15));
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn every_token_gets_a_fresh_claim_id() {
        let codec = codec("secret", Duration::from_secs(60));
        let now = at_millis(1_700_000_000_000);

        let a = codec.parse_at(&codec.create_at("1", now).unwrap(), now).unwrap();
        let b = codec.parse_at(&codec.create_at("1", now).unwrap(), now).unwrap();

        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn token_parsed_after_its_lifetime_is_expired() {
        let codec = codec("secret", Duration::from_millis(10));
        let created = at_millis(1_700_000_000_500);

        let token = codec.create_at("1", created).unwrap();
        let err = codec
            .parse_at(&token, created + TimeDelta::milliseconds(20))
            .unwrap_err();

        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn expiry_is_compared_in_milliseconds_against_whole_second_exp() {
        let codec = codec("secret", Duration::from_secs(15 * 60));
        let created = at_millis(1_700_000_000_000);
        let exp = created + TimeDelta::minutes(15);
        let token = codec.create_at("1", created).unwrap();

        assert!(codec.parse_at(&token, exp - TimeDelta::minutes(1)).is_ok());
        assert!(codec.parse_at(&token, exp).is_ok());
        let err = codec
            .parse_at(&token, exp + TimeDelta::milliseconds(1))
            .unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn token_signed_with_another_key_has_invalid_signature() {
        let now = at_millis(1_700_000_000_000);
        let token = codec("secret-a", Duration::from_secs(60))
            .create_at("1", now)
            .unwrap();

        let err = codec("secret-b", Duration::from_secs(60))
            .parse_at(&token, now)
            .unwrap_err();

        assert!(matches!(err, TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec("secret", Duration::from_secs(60));
        let err = codec
            .parse_at("not-a-jwt", at_millis(1_700_000_000_000))
            .unwrap_err();

        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn wall_clock_round_trip() {
        let codec = codec("secret", Duration::from_secs(60));
        let token = codec.create("7").unwrap();

        assert_eq!(codec.parse(&token).unwrap().sub, "7");
    }
}
