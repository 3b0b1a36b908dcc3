use serde::{Deserialize, Serialize};

/// VAPID key material as configured, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

/// A browser push subscription in the shape the Push API hands out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Subscriber key material, both base64url encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Uncompressed P-256 point (65 bytes decoded).
    pub p256dh: String,
    /// Authentication secret (16 bytes decoded).
    pub auth: String,
}

/// A stored subscription together with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub tournament_id: i64,
    pub participant_name: String,
    pub participant_phone: String,
    pub subscription: Subscription,
}

impl Subscription {
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }
}
