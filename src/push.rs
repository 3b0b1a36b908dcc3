use crate::adapters::{MemoryStore, ReqwestPushSender};
use crate::config;

pub mod dispatch;
pub mod ece;
pub mod fanout;
pub mod payload;
pub mod queue;
pub mod vapid;

use std::sync::Arc;

use fanout::{Fanout, FanoutSettings};
use payload::NotificationTexts;
use queue::NotificationQueue;
use vapid::VapidIdentity;
pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};

pub type PushQueue = NotificationQueue<ReqwestPushSender, MemoryStore, MemoryStore>;

/// Builds the delivery pipeline when VAPID is fully and validly configured.
pub fn maybe_start_push(config: &config::AppConfig, store: &MemoryStore) -> Option<PushQueue> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            tracing::warn!("push notifications disabled: incomplete VAPID configuration");
            return None;
        }
        VapidConfigStatus::Missing => {
            tracing::debug!("push notifications disabled: no VAPID configuration");
            return None;
        }
    };

    let identity = match VapidIdentity::from_config(&vapid) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!("push notifications disabled: {err}");
            return None;
        }
    };

    let sender = match ReqwestPushSender::new(config.push_timeout) {
        Ok(sender) => sender,
        Err(err) => {
            tracing::warn!("push notifications disabled: failed to build HTTP client ({err})");
            return None;
        }
    };

    let settings = FanoutSettings {
        ttl: config.push_ttl,
        participant_delimiter: config.participant_delimiter.clone(),
        texts: NotificationTexts::for_sport(config.sport),
    };
    tracing::info!(
        subject = identity.subject(),
        ttl = config.push_ttl,
        "push notifications enabled"
    );
    Some(NotificationQueue::new(Fanout::new(
        sender,
        store.clone(),
        store.clone(),
        Arc::new(identity),
        settings,
    )))
}
