use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::claims::{Claims, Principal, Role};
use crate::error::{TokenError, TokenResult};
use crate::secret::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

/// Only algorithm this codec will ever mint or accept.
const ALG: &str = "HS256";
const TYP: &str = "JWT";

/// Header bytes signed into every issued token.
const HEADER_JSON: &[u8] = br#"{"alg":"HS256","typ":"JWT"}"#;

/// Default maximum accepted token age in seconds.
pub const DEFAULT_MAX_TOKEN_AGE_SECONDS: i64 = 3600;

/// Header segment as read back during verification.
///
/// Unknown fields are ignored; the algorithm is pinned regardless of what
/// the header announces.
#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Issues and verifies compact signed tokens.
///
/// Wire form is `base64url(header) "." base64url(claims) "." base64url(mac)`
/// with no padding, single line. The MAC is HMAC-SHA256 over the first two
/// segments exactly as they appear on the wire, so verification never
/// re-serializes anything before checking integrity.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: SigningSecret,
    max_token_age: Duration,
}

impl TokenCodec {
    /// Creates a codec with the default one-hour token lifetime.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            max_token_age: Duration::seconds(DEFAULT_MAX_TOKEN_AGE_SECONDS),
        }
    }

    /// Overrides the maximum accepted token age.
    pub fn with_max_token_age(mut self, max_token_age: Duration) -> Self {
        self.max_token_age = max_token_age;
        self
    }

    /// Identifier of the signing key, safe to log.
    pub fn key_id(&self) -> String {
        self.secret.key_id()
    }

    pub fn max_token_age(&self) -> Duration {
        self.max_token_age
    }

    /// Issues a token for `subject_id` as of the current wall clock.
    pub fn issue(&self, subject_id: &str, role: Role) -> String {
        self.issue_at(Utc::now(), subject_id, role)
    }

    /// Issues a token with an explicit issue time.
    ///
    /// The issue time is truncated to whole seconds on the wire.
    pub fn issue_at(&self, now: DateTime<Utc>, subject_id: &str, role: Role) -> String {
        let claims = Claims {
            sub: subject_id.to_string(),
            role,
            iat: now.timestamp(),
        };
        let header_b64 = B64.encode(HEADER_JSON);
        let claims_b64 = B64.encode(serde_json::to_vec(&claims).expect("claims serialize to JSON"));

        let mut mac = self.keyed_mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        let tag = mac.finalize().into_bytes();

        format!("{header_b64}.{claims_b64}.{}", B64.encode(tag))
    }

    /// Verifies `token` against the current wall clock.
    pub fn verify(&self, token: &str) -> TokenResult<Principal> {
        self.verify_at(Utc::now(), token)
    }

    /// Verifies `token` as of `now`.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// 1. shape: exactly three non-empty dot-separated segments
    /// 2. header: base64url, JSON, algorithm pinned to HS256
    /// 3. signature segment: base64url
    /// 4. MAC, recomputed over the received header and claims bytes and
    ///    compared in constant time
    /// 5. claims: base64url, JSON, interpreted only after step 4 holds
    /// 6. lifetime: `now` at most `max_token_age` past `iat`
    pub fn verify_at(&self, now: DateTime<Utc>, token: &str) -> TokenResult<Principal> {
        // 1. Shape.
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::malformed(format!(
                "expected 3 segments, got {}",
                segments.len()
            )));
        }
        let (header_b64, claims_b64, sig_b64) = (segments[0], segments[1], segments[2]);
        if header_b64.is_empty() || claims_b64.is_empty() || sig_b64.is_empty() {
            return Err(TokenError::malformed("empty segment"));
        }

        // 2. Header. The algorithm is pinned before any MAC work so an
        //    attacker-chosen `alg` never selects the verification path.
        let header_bytes = B64
            .decode(header_b64)
            .map_err(|e| TokenError::malformed(format!("header is not base64url: {e}")))?;
        let header: Header = serde_json::from_slice(&header_bytes)
            .map_err(|e| TokenError::malformed(format!("header is not JSON: {e}")))?;
        if header.alg != ALG {
            return Err(TokenError::malformed(format!(
                "unsupported algorithm: {}",
                header.alg
            )));
        }
        if let Some(typ) = header.typ.as_deref() {
            if typ != TYP {
                return Err(TokenError::malformed(format!(
                    "unsupported token type: {typ}"
                )));
            }
        }

        // 3. Signature segment.
        let sig = B64
            .decode(sig_b64)
            .map_err(|e| TokenError::malformed(format!("signature is not base64url: {e}")))?;

        // 4. MAC over the received bytes, never over a re-serialization.
        let mut mac = self.keyed_mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::InvalidSignature)?;

        // 5. Claims are trusted only now that the MAC holds.
        let claims_bytes = B64
            .decode(claims_b64)
            .map_err(|e| TokenError::malformed(format!("claims are not base64url: {e}")))?;
        let claims: Claims = serde_json::from_slice(&claims_bytes)
            .map_err(|e| TokenError::malformed(format!("claims are not JSON: {e}")))?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| TokenError::malformed(format!("iat out of range: {}", claims.iat)))?;

        // 6. Lifetime. Valid through `iat + max_token_age`, rejected after.
        if now.signed_duration_since(issued_at) > self.max_token_age {
            return Err(TokenError::Expired { issued_at, now });
        }

        Ok(Principal {
            subject_id: claims.sub,
            role: claims.role,
            issued_at,
        })
    }

    fn keyed_mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC-SHA256 accepts keys of any length")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(SigningSecret::from_bytes([7u8; 32]))
    }

    /// Signs arbitrary header and claims JSON with the codec's own key, so
    /// tests can exercise the post-MAC parsing paths.
    fn craft(codec: &TokenCodec, header_json: &str, claims_json: &str) -> String {
        let header_b64 = B64.encode(header_json.as_bytes());
        let claims_b64 = B64.encode(claims_json.as_bytes());
        let mut mac = codec.keyed_mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        let tag = mac.finalize().into_bytes();
        format!("{header_b64}.{claims_b64}.{}", B64.encode(tag))
    }

    #[test]
    fn issued_token_round_trips() {
        let codec = codec();
        let token = codec.issue("2", Role::User);
        let principal = codec.verify(&token).unwrap();
        assert_eq!(principal.subject_id, "2");
        assert_eq!(principal.role, Role::User);
    }

    #[test]
    fn issued_token_is_url_safe() {
        let codec = codec();
        let token = codec.issue("999", Role::Admin);
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
        assert!(!token.contains('\n'));
    }

    #[test]
    fn issue_at_truncates_to_whole_seconds() {
        let codec = codec();
        let now = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let token = codec.issue_at(now, "1", Role::User);
        let principal = codec.verify_at(now, &token).unwrap();
        assert_eq!(principal.issued_at.timestamp(), 1_700_000_000);
        assert_eq!(principal.issued_at, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = codec().issue("2", Role::User);
        let other = TokenCodec::new(SigningSecret::from_bytes([8u8; 32]));
        assert!(matches!(
            other.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn two_segments_is_malformed() {
        let codec = codec();
        let token = codec.issue("2", Role::User);
        let truncated = token.rsplit_once('.').unwrap().0;
        assert!(matches!(
            codec.verify(truncated),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn four_segments_is_malformed() {
        let codec = codec();
        let token = format!("{}.extra", codec.issue("2", Role::User));
        assert!(matches!(
            codec.verify(&token),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn empty_segment_is_malformed() {
        let codec = codec();
        let token = codec.issue("2", Role::User);
        let (rest, sig) = token.rsplit_once('.').unwrap();
        let hollow = format!("{rest}..{sig}");
        // Four segments now, but the point stands with three as well.
        assert!(matches!(
            codec.verify(&hollow),
            Err(TokenError::Malformed { .. })
        ));
        let (header, _) = rest.split_once('.').unwrap();
        let empty_claims = format!("{header}..{sig}");
        assert!(matches!(
            codec.verify(&empty_claims),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn alg_none_is_rejected_even_with_a_valid_mac() {
        let codec = codec();
        let token = craft(
            &codec,
            r#"{"alg":"none","typ":"JWT"}"#,
            r#"{"sub":"2","role":"user","iat":1700000000}"#,
        );
        match codec.verify_at(DateTime::from_timestamp(1_700_000_000, 0).unwrap(), &token) {
            Err(TokenError::Malformed { reason }) => {
                assert!(reason.contains("unsupported algorithm"), "{reason}");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn foreign_typ_is_rejected() {
        let codec = codec();
        let token = craft(
            &codec,
            r#"{"alg":"HS256","typ":"SAML"}"#,
            r#"{"sub":"2","role":"user","iat":1700000000}"#,
        );
        assert!(matches!(
            codec.verify_at(
                DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                &token
            ),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_typ_is_accepted() {
        let codec = codec();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = craft(
            &codec,
            r#"{"alg":"HS256"}"#,
            r#"{"sub":"3","role":"user","iat":1700000000}"#,
        );
        let principal = codec.verify_at(now, &token).unwrap();
        assert_eq!(principal.subject_id, "3");
    }

    #[test]
    fn tampered_claims_fail_the_mac() {
        let codec = codec();
        let token = codec.issue("2", Role::User);
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = B64.encode(br#"{"sub":"999","role":"admin","iat":1700000000}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert!(matches!(
            codec.verify(&forged),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn garbage_claims_with_a_valid_mac_are_malformed() {
        let codec = codec();
        let token = craft(&codec, r#"{"alg":"HS256","typ":"JWT"}"#, "not json at all");
        assert!(matches!(
            codec.verify(&token),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn iat_beyond_datetime_range_is_malformed() {
        let codec = codec();
        let claims = format!(r#"{{"sub":"1","role":"user","iat":{}}}"#, i64::MAX);
        let token = craft(&codec, r#"{"alg":"HS256","typ":"JWT"}"#, &claims);
        assert!(matches!(
            codec.verify(&token),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn token_is_valid_through_the_full_lifetime() {
        let codec = codec();
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = codec.issue_at(issued, "2", Role::User);

        let at_limit = issued + Duration::seconds(DEFAULT_MAX_TOKEN_AGE_SECONDS);
        assert!(codec.verify_at(at_limit, &token).is_ok());

        let past_limit = at_limit + Duration::seconds(1);
        match codec.verify_at(past_limit, &token) {
            Err(TokenError::Expired { issued_at, now }) => {
                assert_eq!(issued_at, issued);
                assert_eq!(now, past_limit);
            }
            other => panic!("expected expired, got {other:?}"),
        }
    }

    #[test]
    fn custom_max_age_is_honored() {
        let secret = SigningSecret::from_bytes([7u8; 32]);
        let codec = TokenCodec::new(secret).with_max_token_age(Duration::seconds(60));
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = codec.issue_at(issued, "2", Role::User);
        assert!(codec.verify_at(issued + Duration::seconds(60), &token).is_ok());
        assert!(matches!(
            codec.verify_at(issued + Duration::seconds(61), &token),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn token_from_the_future_is_not_expired() {
        // Issue time ahead of the verifier's clock. The lifetime check only
        // bounds age, so this verifies; issuers and verifiers share a clock
        // in the intended deployment.
        let codec = codec();
        let issued = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = codec.issue_at(issued, "2", Role::User);
        assert!(codec
            .verify_at(issued - Duration::seconds(10), &token)
            .is_ok());
    }

    #[test]
    fn admin_role_survives_the_round_trip() {
        let codec = codec();
        let token = codec.issue("999", Role::Admin);
        let principal = codec.verify(&token).unwrap();
        assert!(principal.is_admin());
        assert_eq!(principal.subject_id, "999");
    }
}
