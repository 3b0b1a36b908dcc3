use jwt_simple::prelude::{Claims, Duration as JwtDuration, ECDSAP256KeyPairLike, ES256KeyPair};
use p256::SecretKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::codec::{base64url_decode, base64url_encode};
use crate::config;
use crate::error::PushError;
use crate::types::push::VapidConfig;

/// VAPID tokens are valid for this many hours after signing.
pub const VAPID_TOKEN_HOURS: u64 = 12;

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub(crate) enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

pub(crate) fn load_vapid_config(config: &config::AppConfig) -> VapidConfigStatus {
    let private_key = non_empty(config.vapid_private_key.as_deref());
    let public_key = non_empty(config.vapid_public_key.as_deref());
    let subject = non_empty(config.vapid_subject.as_deref());
    let has_any = private_key.is_some() || public_key.is_some() || subject.is_some();

    match (private_key, public_key, subject) {
        (Some(private_key), Some(public_key), Some(subject)) => {
            VapidConfigStatus::Ready(VapidConfig {
                private_key: private_key.to_string(),
                public_key: public_key.to_string(),
                subject: subject.to_string(),
            })
        }
        _ if has_any => VapidConfigStatus::Incomplete,
        _ => VapidConfigStatus::Missing,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// The sender identity every outbound request is signed with.
///
/// Parsed once from configuration and shared read-only between concurrent
/// deliveries; signing draws fresh randomness per call.
pub struct VapidIdentity {
    key_pair: ES256KeyPair,
    public_key: Vec<u8>,
    public_key_b64: String,
    subject: String,
}

impl VapidIdentity {
    pub fn from_config(config: &VapidConfig) -> Result<Self, PushError> {
        let private_key = base64url_decode(&config.private_key)?;
        if private_key.len() != 32 {
            return Err(PushError::InvalidKeyMaterial(format!(
                "VAPID private key must be a 32-byte scalar, got {} bytes",
                private_key.len()
            )));
        }
        let public_key = base64url_decode(&config.public_key)?;
        if public_key.len() != 65 || public_key[0] != 0x04 {
            return Err(PushError::InvalidKeyMaterial(
                "VAPID public key must be a 65-byte uncompressed P-256 point".to_string(),
            ));
        }

        let secret = SecretKey::from_slice(&private_key).map_err(|_| {
            PushError::InvalidKeyMaterial("VAPID private key is not a valid P-256 scalar".into())
        })?;
        let derived = secret.public_key().to_encoded_point(false);
        if derived.as_bytes() != public_key.as_slice() {
            return Err(PushError::InvalidKeyMaterial(
                "VAPID public key does not match the private key".to_string(),
            ));
        }

        let key_pair = ES256KeyPair::from_bytes(&private_key)
            .map_err(|err| PushError::InvalidKeyMaterial(err.to_string()))?;

        Ok(Self {
            key_pair,
            public_key_b64: base64url_encode(&public_key),
            public_key,
            subject: config.subject.trim().to_string(),
        })
    }

    /// Uncompressed public point, 65 bytes.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn public_key_b64(&self) -> &str {
        &self.public_key_b64
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sign(&self, audience: &str) -> Result<String, PushError> {
        sign_vapid_jwt(audience, &self.subject, &self.key_pair)
    }
}

impl std::fmt::Debug for VapidIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidIdentity")
            .field("public_key", &self.public_key_b64)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Signs `{aud, sub, iat, exp}` with ES256, returning a compact JWT whose
/// signature segment is the raw 64-byte `r || s` pair.
pub fn sign_vapid_jwt(
    audience: &str,
    subject: &str,
    key_pair: &ES256KeyPair,
) -> Result<String, PushError> {
    let claims = Claims::create(JwtDuration::from_hours(VAPID_TOKEN_HOURS))
        .with_audience(audience)
        .with_subject(subject);
    key_pair
        .sign(claims)
        .map_err(|err| PushError::InvalidKeyMaterial(err.to_string()))
}

/// The `aud` claim for an endpoint: its origin, never the full URL.
pub fn audience_for(endpoint: &str) -> Result<String, PushError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|err| PushError::InvalidEndpoint(format!("{endpoint}: {err}")))?;
    if !matches!(url.scheme(), "https" | "http") || url.host_str().is_none() {
        return Err(PushError::InvalidEndpoint(format!(
            "{endpoint}: expected an http(s) URL with a host"
        )));
    }
    Ok(url.origin().ascii_serialization())
}

pub fn generate_vapid_credentials() -> Result<VapidCredentials, PushError> {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub(crate) fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, PushError> {
    let secret = generate_secret_key_with_rng(rng);
    let private_key = base64url_encode(secret.to_bytes());
    let public_key = base64url_encode(secret.public_key().to_encoded_point(false).as_bytes());

    Ok(VapidCredentials {
        private_key,
        public_key,
    })
}

fn generate_secret_key_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> SecretKey {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(secret) = SecretKey::from_slice(&key_bytes) {
            return secret;
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use jwt_simple::prelude::{
        Audiences, ECDSAP256PublicKeyLike, ES256PublicKey, NoCustomClaims, VerificationOptions,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    pub(crate) const TEST_PRIVATE_KEY: &str = "9pKJeIXAyyCj5M0QagsVvDYHlPF-cymJCbB5iHPsdEE";
    pub(crate) const TEST_PUBLIC_KEY: &str =
        "BCRweRf_U5iQM4pKNucGRzM6OuLp8Hisa8yX0N2ePIf1oxKitvFT6qvuGgYoTxlMatMDaytXbZR3rVClc2w_p6U";

    pub(crate) fn test_vapid_config() -> VapidConfig {
        VapidConfig {
            private_key: TEST_PRIVATE_KEY.to_string(),
            public_key: TEST_PUBLIC_KEY.to_string(),
            subject: "mailto:ops@courtcall.test".to_string(),
        }
    }

    pub(crate) fn test_identity() -> VapidIdentity {
        VapidIdentity::from_config(&test_vapid_config()).expect("identity")
    }

    #[test]
    fn generate_vapid_credentials_with_rng__should_return_expected_fixture() {
        // Given
        let seed = [7u8; 32];
        let mut rng = StdRng::from_seed(seed);

        // When
        let credentials =
            generate_vapid_credentials_with_rng(&mut rng).expect("credentials should generate");

        // Then
        assert_eq!(credentials.private_key, TEST_PRIVATE_KEY);
        assert_eq!(credentials.public_key, TEST_PUBLIC_KEY);
    }

    #[test]
    fn load_vapid_config__should_report_missing_incomplete_and_ready() {
        // Given
        let mut config = config::AppConfig::default();

        // Then
        assert!(matches!(load_vapid_config(&config), VapidConfigStatus::Missing));

        config.vapid_private_key = Some(TEST_PRIVATE_KEY.to_string());
        assert!(matches!(
            load_vapid_config(&config),
            VapidConfigStatus::Incomplete
        ));

        config.vapid_public_key = Some(TEST_PUBLIC_KEY.to_string());
        config.vapid_subject = Some("   ".to_string());
        assert!(matches!(
            load_vapid_config(&config),
            VapidConfigStatus::Incomplete
        ));

        config.vapid_subject = Some("mailto:ops@courtcall.test".to_string());
        assert!(matches!(
            load_vapid_config(&config),
            VapidConfigStatus::Ready(vapid) if vapid.subject == "mailto:ops@courtcall.test"
        ));
    }

    #[test]
    fn from_config__should_reject_mismatched_public_key() {
        // Given
        let mut rng = StdRng::from_seed([9u8; 32]);
        let other = generate_vapid_credentials_with_rng(&mut rng).expect("credentials");
        let mut config = test_vapid_config();
        config.public_key = other.public_key;

        // When
        let result = VapidIdentity::from_config(&config);

        // Then
        assert!(matches!(result, Err(PushError::InvalidKeyMaterial(_))));
    }

    #[test]
    fn from_config__should_reject_wrong_lengths_and_bad_encoding() {
        let mut short = test_vapid_config();
        short.private_key = base64url_encode([1u8; 31]);
        assert!(matches!(
            VapidIdentity::from_config(&short),
            Err(PushError::InvalidKeyMaterial(_))
        ));

        let mut compressed = test_vapid_config();
        compressed.public_key = base64url_encode([2u8; 33]);
        assert!(matches!(
            VapidIdentity::from_config(&compressed),
            Err(PushError::InvalidKeyMaterial(_))
        ));

        let mut garbage = test_vapid_config();
        garbage.private_key = "not*base64".to_string();
        assert!(matches!(
            VapidIdentity::from_config(&garbage),
            Err(PushError::Decode(_))
        ));
    }

    #[test]
    fn from_config__should_reject_zero_scalar() {
        // Given
        let mut config = test_vapid_config();
        config.private_key = base64url_encode([0u8; 32]);

        // Then
        assert!(matches!(
            VapidIdentity::from_config(&config),
            Err(PushError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn sign__should_produce_verifiable_es256_token() {
        // Given
        let identity = test_identity();
        let audience = "https://fcm.googleapis.com";

        // When
        let token = identity.sign(audience).expect("sign");

        // Then
        let public_key = ES256PublicKey::from_bytes(identity.public_key()).expect("public key");
        let mut options = VerificationOptions::default();
        options.allowed_audiences = Some(HashSet::from([audience.to_string()]));
        let claims = public_key
            .verify_token::<NoCustomClaims>(&token, Some(options))
            .expect("token should verify");

        let issued_at = claims.issued_at.expect("iat");
        let expires_at = claims.expires_at.expect("exp");
        assert_eq!(expires_at - issued_at, JwtDuration::from_hours(12));
        assert_eq!(claims.subject.as_deref(), Some("mailto:ops@courtcall.test"));
        assert!(matches!(
            claims.audiences,
            Some(Audiences::AsString(ref aud)) if aud == audience
        ));
    }

    #[test]
    fn sign__should_use_jwt_es256_header_and_raw_signature() {
        // Given
        let identity = test_identity();

        // When
        let token = identity.sign("https://updates.push.services.mozilla.com").expect("sign");

        // Then
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        let header: serde_json::Value =
            serde_json::from_slice(&base64url_decode(segments[0]).expect("header"))
                .expect("header json");
        assert_eq!(header["alg"], "ES256");
        assert_eq!(header["typ"], "JWT");
        let signature = base64url_decode(segments[2]).expect("signature");
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn sign__should_fail_verification_with_another_key() {
        // Given
        let identity = test_identity();
        let token = identity.sign("https://push.example").expect("sign");
        let mut rng = StdRng::from_seed([3u8; 32]);
        let other = generate_vapid_credentials_with_rng(&mut rng).expect("credentials");
        let other_key =
            ES256PublicKey::from_bytes(&base64url_decode(&other.public_key).expect("decode"))
                .expect("public key");

        // Then
        assert!(other_key.verify_token::<NoCustomClaims>(&token, None).is_err());
    }

    #[test]
    fn audience_for__should_keep_scheme_and_host_only() {
        assert_eq!(
            audience_for("https://fcm.googleapis.com/fcm/send/abc:def?x=1").expect("audience"),
            "https://fcm.googleapis.com"
        );
        assert_eq!(
            audience_for("https://push.example:8443/wpush/v2/token").expect("audience"),
            "https://push.example:8443"
        );
        assert_eq!(
            audience_for("https://web.push.apple.com:443/QGuQ").expect("audience"),
            "https://web.push.apple.com"
        );
    }

    #[test]
    fn audience_for__should_reject_non_http_endpoints() {
        assert!(matches!(
            audience_for("not a url"),
            Err(PushError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            audience_for("mailto:someone@example.com"),
            Err(PushError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn sign__should_work_from_shared_identity_across_threads() {
        // Given
        let identity = std::sync::Arc::new(test_identity());
        let public_key = ES256PublicKey::from_bytes(identity.public_key()).expect("public key");
        let audiences = [
            "https://fcm.googleapis.com",
            "https://updates.push.services.mozilla.com",
        ];

        // When
        let tokens: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = audiences
                .into_iter()
                .map(|audience| {
                    let identity = std::sync::Arc::clone(&identity);
                    scope.spawn(move || identity.sign(audience).expect("sign"))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("join"))
                .collect()
        });

        // Then
        assert_eq!(tokens.len(), 2);
        for token in &tokens {
            assert!(
                public_key
                    .verify_token::<NoCustomClaims>(token, None)
                    .is_ok()
            );
        }
    }
}
