//! Error types for the push delivery pipeline.

use thiserror::Error;

/// Failure of a single signing, encryption or delivery attempt.
///
/// Every variant is scoped to one subscription: the fan-out converts these
/// into delivery counters and never lets them escape to the caller that
/// raised the notification.
#[derive(Error, Debug)]
pub enum PushError {
    /// VAPID keys or subscriber keys that cannot be used on P-256.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Malformed base64url input from configuration or a stored subscription.
    #[error("base64url decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Plaintext that does not fit in a single aes128gcm record.
    #[error("payload of {len} bytes exceeds the {max} byte push limit")]
    PayloadTooLarge { len: usize, max: usize },

    /// Key derivation or cipher failure.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Subscription endpoint that is not an absolute http(s) URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The push service no longer knows the subscription (HTTP 404/410).
    #[error("subscription expired (HTTP {status})")]
    SubscriptionExpired { status: u16 },

    /// Any other non-2xx response from the push service.
    #[error("push service rejected delivery (HTTP {status})")]
    TransientFailure { status: u16 },

    /// The request never produced an HTTP status (connect error, timeout).
    #[error("push request failed: {0}")]
    Transport(String),
}

impl PushError {
    /// Whether the subscription behind this failure should be deleted.
    pub fn is_expired(&self) -> bool {
        matches!(self, PushError::SubscriptionExpired { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            PushError::SubscriptionExpired { status } | PushError::TransientFailure { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
