use std::collections::{BTreeMap, HashSet};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};

use crate::error::PushError;
use crate::ports;
use crate::push::dispatch::{self, CONTENT_ENCODING_AES128GCM, PushRequest, URGENCY_HIGH};
use crate::types::notification::NotificationRecord;
use crate::types::push::SubscriptionRecord;

/// Posts push messages over HTTPS with a shared connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestPushSender {
    client: reqwest::Client,
}

impl ReqwestPushSender {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl ports::push::PushSender for ReqwestPushSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, request: &'a PushRequest) -> Self::Fut<'a> {
        Box::pin(async move {
            let response = self
                .client
                .post(&request.endpoint)
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(CONTENT_ENCODING, CONTENT_ENCODING_AES128GCM)
                .header("TTL", request.ttl.to_string())
                .header("Urgency", URGENCY_HIGH)
                .header(AUTHORIZATION, request.authorization())
                .body(request.body.clone())
                .send()
                .await
                .map_err(|err| PushError::Transport(err.to_string()))?;
            dispatch::check_status(response.status().as_u16())
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("store lock poisoned")]
pub struct StoreError;

#[derive(Debug, Default)]
struct StoreState {
    subscriptions: BTreeMap<String, SubscriptionRecord>,
    notifications: HashSet<NotificationRecord>,
}

/// Process-local subscription store and notification log.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state.lock().map_err(|_| StoreError)
    }

    #[cfg(test)]
    pub(crate) fn record_count(&self) -> usize {
        self.state.lock().expect("store lock").notifications.len()
    }
}

impl ports::store::SubscriptionStore for MemoryStore {
    type Error = StoreError;

    fn subscriptions_for(
        &self,
        tournament_id: i64,
        participant_name: &str,
    ) -> impl Future<Output = Result<Vec<SubscriptionRecord>, Self::Error>> + Send {
        let result: Result<Vec<SubscriptionRecord>, StoreError> = self.lock().map(|state| {
            state
                .subscriptions
                .values()
                .filter(|record| {
                    record.tournament_id == tournament_id
                        && record.participant_name == participant_name
                })
                .cloned()
                .collect()
        });
        std::future::ready(result)
    }

    fn upsert_subscription(
        &self,
        record: SubscriptionRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let result = self.lock().map(|mut state| {
            state
                .subscriptions
                .insert(record.subscription.endpoint.clone(), record);
        });
        std::future::ready(result)
    }

    fn delete_subscription(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let result = self
            .lock()
            .map(|mut state| state.subscriptions.remove(endpoint).is_some());
        std::future::ready(result)
    }

    fn remove_subscription(
        &self,
        tournament_id: i64,
        endpoint: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let result = self.lock().map(|mut state| {
            let owned = state
                .subscriptions
                .get(endpoint)
                .is_some_and(|record| record.tournament_id == tournament_id);
            if owned {
                state.subscriptions.remove(endpoint);
            }
            owned
        });
        std::future::ready(result)
    }
}

impl ports::store::NotificationLog for MemoryStore {
    type Error = StoreError;

    fn has_record(
        &self,
        record: &NotificationRecord,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let result = self
            .lock()
            .map(|state| state.notifications.contains(record));
        std::future::ready(result)
    }

    fn record(
        &self,
        record: NotificationRecord,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let result = self
            .lock()
            .map(|mut state| state.notifications.insert(record));
        std::future::ready(result)
    }
}
