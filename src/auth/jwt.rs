use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use serde::{Deserialize, Serialize};

use crate::{config::JwtConfig, db::object_id::ObjectId, state::AppState};

/// Access tokens authenticate requests; refresh tokens only mint new pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user the token was issued to.
    pub sub: ObjectId,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes.max(0) as u64) * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: &ObjectId, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: &ObjectId) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: &ObjectId) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Access {
            anyhow::bail!("not an access token");
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = ObjectId::new();
        let token = keys.sign_access(&user_id).expect("sign access");
        let claims = keys.verify_access(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn verify_refresh_rejects_access_token_and_vice_versa() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let access = keys.sign_access(&ObjectId::new()).expect("sign access");
        let refresh = keys.sign_refresh(&ObjectId::new()).expect("sign refresh");
        let err = keys.verify_refresh(&access).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
        assert!(keys.verify_access(&refresh).is_err());
        assert!(keys.verify_refresh(&refresh).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_secret_issuer_or_audience() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let token = good.sign_access(&ObjectId::new()).expect("sign access");
        assert!(make_keys("same-secret", "bad-iss", "good-aud").verify(&token).is_err());
        assert!(make_keys("same-secret", "good-iss", "bad-aud").verify(&token).is_err());
        assert!(make_keys("other-secret", "good-iss", "good-aud").verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let past = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let claims = Claims {
            sub: ObjectId::new(),
            iat: past.unix_timestamp() as usize,
            exp: (past + TimeDuration::minutes(5)).unix_timestamp() as usize,
            iss: "iss".into(),
            aud: "aud".into(),
            kind: TokenKind::Access,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn claims_carry_the_token_kind_as_typ() {
        let claims = Claims {
            sub: ObjectId::new(),
            iat: 0,
            exp: 1,
            iss: "iss".into(),
            aud: "aud".into(),
            kind: TokenKind::Refresh,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["typ"], "refresh");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign_access(&ObjectId::new()).unwrap();
        let other = keys.sign_access(&ObjectId::new()).unwrap();
        // Header and signature of one token, payload of another.
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert!(keys.verify(&forged).is_err());
    }
}
