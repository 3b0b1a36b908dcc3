use crate::codec::base64url_decode;
use crate::error::PushError;
use crate::push::ece;
use crate::push::vapid::{VapidIdentity, audience_for};
use crate::types::push::Subscription;

pub const CONTENT_ENCODING_AES128GCM: &str = "aes128gcm";
pub const URGENCY_HIGH: &str = "high";

/// A fully prepared delivery: encrypted body plus VAPID credentials.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub endpoint: String,
    pub body: Vec<u8>,
    pub jwt: String,
    pub vapid_public_key: String,
    pub ttl: u32,
}

impl PushRequest {
    /// Encrypts `payload` for `subscription` and signs a token for its
    /// push service. Fails without touching the network.
    pub fn prepare(
        subscription: &Subscription,
        payload: &[u8],
        vapid: &VapidIdentity,
        ttl: u32,
    ) -> Result<Self, PushError> {
        let client_public_key = base64url_decode(&subscription.keys.p256dh)?;
        let client_auth_secret = base64url_decode(&subscription.keys.auth)?;
        let message = ece::encrypt(payload, &client_public_key, &client_auth_secret)?;
        let audience = audience_for(&subscription.endpoint)?;
        let jwt = vapid.sign(&audience)?;

        Ok(Self {
            endpoint: subscription.endpoint.clone(),
            body: message.to_body(),
            jwt,
            vapid_public_key: vapid.public_key_b64().to_string(),
            ttl,
        })
    }

    pub fn authorization(&self) -> String {
        format!("vapid t={}, k={}", self.jwt, self.vapid_public_key)
    }
}

/// Maps a push service response status onto the delivery contract.
pub fn check_status(status: u16) -> Result<(), PushError> {
    match status {
        200..=299 => Ok(()),
        404 | 410 => Err(PushError::SubscriptionExpired { status }),
        _ => Err(PushError::TransientFailure { status }),
    }
}
