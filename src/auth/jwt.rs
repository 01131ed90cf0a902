use std::fmt;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::JwtConfig;

/// HMAC family accepted on verification. Anything else, including `none`, is rejected.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Fixed claim schema. Tokens missing any field, or carrying one of the wrong type, do not decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub iat: i64,      // issued at (unix timestamp)
    pub exp: i64,      // expires at (unix timestamp)
    pub email: String, // email at issue time
}

/// Why a token was rejected. Only ever logged, never returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Expired,
    BadSignature,
    Algorithm,
    Malformed,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvalidReason::Expired => "expired",
            InvalidReason::BadSignature => "bad signature",
            InvalidReason::Algorithm => "disallowed algorithm",
            InvalidReason::Malformed => "malformed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token")]
    Invalid(InvalidReason),
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies HMAC-signed bearer tokens.
///
/// Built once from configuration at startup. Without a secret every
/// operation fails with [`TokenError::MissingSecret`].
#[derive(Clone)]
pub struct JwtKeys {
    keys: Option<SigningKeys>,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: Option<&str>, ttl: Duration) -> Self {
        let keys = secret.filter(|s| !s.is_empty()).map(|s| SigningKeys {
            encoding: EncodingKey::from_secret(s.as_bytes()),
            decoding: DecodingKey::from_secret(s.as_bytes()),
        });
        Self { keys, ttl }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self::new(cfg.secret.as_deref(), Duration::minutes(cfg.ttl_minutes))
    }

    fn signing_keys(&self) -> Result<&SigningKeys, TokenError> {
        self.keys.as_ref().ok_or_else(|| {
            warn!("token operation attempted without a configured secret");
            TokenError::MissingSecret
        })
    }

    pub fn issue(&self, user_id: Uuid, email: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        let keys = self.signing_keys()?;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
            email: email.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id = %user_id, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Verifies signature, algorithm, claim shape and expiry against `now`.
    /// A token whose `exp` is at or before `now` is rejected.
    pub fn verify(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let keys = self.signing_keys()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        // Expiry is checked below against the caller's clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::InvalidSignature => InvalidReason::BadSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    InvalidReason::Algorithm
                }
                ErrorKind::ExpiredSignature => InvalidReason::Expired,
                _ => InvalidReason::Malformed,
            };
            warn!(%reason, error = %e, "jwt rejected");
            TokenError::Invalid(reason)
        })?;

        let claims = data.claims;
        if claims.exp <= now.unix_timestamp() {
            warn!(reason = %InvalidReason::Expired, user_id = %claims.sub, exp = claims.exp, "jwt rejected");
            return Err(TokenError::Invalid(InvalidReason::Expired));
        }

        debug!(user_id = %claims.sub, "jwt verified");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const SECRET: &str = "dev-secret";

    fn keys() -> JwtKeys {
        JwtKeys::new(Some(SECRET), Duration::hours(24))
    }

    fn reason(err: TokenError) -> InvalidReason {
        match err {
            TokenError::Invalid(r) => r,
            other => panic!("expected invalid token, got {other:?}"),
        }
    }

    #[test]
    fn issue_and_verify_carries_claims() {
        let keys = keys();
        let now = datetime!(2024-05-01 12:00 UTC);
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "a@x.com", now).expect("sign");
        let claims = keys.verify(&token, now).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.exp, now.unix_timestamp() + 24 * 3600);
    }

    #[test]
    fn expiry_boundary() {
        let keys = keys();
        let issued = datetime!(2024-05-01 12:00 UTC);
        let token = keys.issue(Uuid::new_v4(), "a@x.com", issued).unwrap();

        let almost = issued + Duration::hours(23) + Duration::minutes(59);
        assert!(keys.verify(&token, almost).is_ok());

        let exactly = issued + Duration::hours(24);
        assert_eq!(reason(keys.verify(&token, exactly).unwrap_err()), InvalidReason::Expired);

        let after = issued + Duration::hours(24) + Duration::seconds(1);
        assert_eq!(reason(keys.verify(&token, after).unwrap_err()), InvalidReason::Expired);
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let other = JwtKeys::new(Some("another-secret"), Duration::hours(24));
        let token = other.issue(Uuid::new_v4(), "a@x.com", now).unwrap();
        assert_eq!(reason(keys().verify(&token, now).unwrap_err()), InvalidReason::BadSignature);
    }

    #[test]
    fn accepts_other_hmac_variants() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now.unix_timestamp(),
            exp: now.unix_timestamp() + 60,
            email: "a@x.com".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(keys().verify(&token, now).unwrap(), claims);
    }

    #[test]
    fn rejects_non_hmac_algorithm_header() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let token = keys().issue(Uuid::new_v4(), "a@x.com", now).unwrap();
        let (_, rest) = token.split_once('.').unwrap();

        // {"alg":"RS256","typ":"JWT"}
        let rs256 = format!("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{rest}");
        assert!(matches!(keys().verify(&rs256, now), Err(TokenError::Invalid(_))));

        // {"alg":"none","typ":"JWT"}
        let none = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{rest}");
        assert!(matches!(keys().verify(&none, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn rejects_missing_or_mistyped_claims() {
        #[derive(Serialize)]
        struct NoEmail {
            sub: Uuid,
            iat: i64,
            exp: i64,
        }
        #[derive(Serialize)]
        struct NumericSub {
            sub: u64,
            iat: i64,
            exp: i64,
            email: String,
        }

        let now = datetime!(2024-05-01 12:00 UTC);
        let enc = EncodingKey::from_secret(SECRET.as_bytes());
        let exp = now.unix_timestamp() + 60;

        let t1 = encode(
            &Header::default(),
            &NoEmail { sub: Uuid::new_v4(), iat: now.unix_timestamp(), exp },
            &enc,
        )
        .unwrap();
        assert_eq!(reason(keys().verify(&t1, now).unwrap_err()), InvalidReason::Malformed);

        let t2 = encode(
            &Header::default(),
            &NumericSub { sub: 42, iat: now.unix_timestamp(), exp, email: "a@x.com".into() },
            &enc,
        )
        .unwrap();
        assert!(matches!(keys().verify(&t2, now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn rejects_garbage() {
        let now = OffsetDateTime::now_utc();
        assert!(matches!(keys().verify("not.a.jwt", now), Err(TokenError::Invalid(_))));
        assert!(matches!(keys().verify("", now), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn missing_secret_refuses_both_directions() {
        let keys = JwtKeys::new(None, Duration::hours(24));
        let now = OffsetDateTime::now_utc();
        assert!(matches!(
            keys.issue(Uuid::new_v4(), "a@x.com", now),
            Err(TokenError::MissingSecret)
        ));
        assert!(matches!(keys.verify("a.b.c", now), Err(TokenError::MissingSecret)));
    }

    #[test]
    fn invalid_display_is_uniform() {
        for r in [
            InvalidReason::Expired,
            InvalidReason::BadSignature,
            InvalidReason::Algorithm,
            InvalidReason::Malformed,
        ] {
            assert_eq!(TokenError::Invalid(r).to_string(), "invalid token");
        }
    }
}
