use crate::error::PushError;
use crate::ports::push::PushSender;
use crate::ports::store::{NotificationLog, SubscriptionStore};
use crate::push::dispatch::PushRequest;
use crate::push::payload::{self, NotificationTexts};
use crate::push::vapid::VapidIdentity;
use crate::types::notification::{
    DeliveryReport, MatchEvent, NotificationPayload, NotificationRecord,
};
use crate::types::push::SubscriptionRecord;

use futures::future::join_all;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FanoutSettings {
    pub ttl: u32,
    pub participant_delimiter: String,
    pub texts: NotificationTexts,
}

/// Turns a match event into push deliveries for every player involved.
#[derive(Debug, Clone)]
pub struct Fanout<P, S, L> {
    sender: P,
    subscriptions: S,
    log: L,
    vapid: Arc<VapidIdentity>,
    settings: FanoutSettings,
}

impl<P, S, L> Fanout<P, S, L>
where
    P: PushSender,
    S: SubscriptionStore,
    L: NotificationLog,
{
    pub fn new(
        sender: P,
        subscriptions: S,
        log: L,
        vapid: Arc<VapidIdentity>,
        settings: FanoutSettings,
    ) -> Self {
        Self {
            sender,
            subscriptions,
            log,
            vapid,
            settings,
        }
    }

    pub fn vapid(&self) -> &VapidIdentity {
        &self.vapid
    }

    pub fn settings(&self) -> &FanoutSettings {
        &self.settings
    }

    /// Notifies each player of both teams at most once per match and kind.
    ///
    /// Per-subscription failures only show up in the returned counts.
    pub async fn notify(&self, event: &MatchEvent) -> DeliveryReport {
        let participants = resolve_participants(
            &[&event.team1, &event.team2],
            &self.settings.participant_delimiter,
        );
        let mut report = DeliveryReport::default();
        let payload = match encode_payload(&payload::match_payload(event, &self.settings.texts)) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(match_id = event.match_id, "failed to encode payload: {err}");
                return report;
            }
        };

        for participant in participants {
            let record = NotificationRecord {
                match_id: event.match_id,
                participant_name: participant.clone(),
                kind: event.kind,
            };
            match self.log.has_record(&record).await {
                Ok(false) => {}
                Ok(true) => {
                    tracing::debug!(
                        match_id = event.match_id,
                        participant = %participant,
                        kind = event.kind.as_str(),
                        "already notified"
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        match_id = event.match_id,
                        participant = %participant,
                        "notification log lookup failed, skipping: {err}"
                    );
                    report.skipped += 1;
                    continue;
                }
            }

            let subscriptions = match self
                .subscriptions
                .subscriptions_for(event.tournament_id, &participant)
                .await
            {
                Ok(subscriptions) => subscriptions,
                Err(err) => {
                    tracing::warn!(
                        tournament_id = event.tournament_id,
                        participant = %participant,
                        "subscription lookup failed: {err}"
                    );
                    continue;
                }
            };
            if subscriptions.is_empty() {
                continue;
            }

            report.absorb(self.deliver(&subscriptions, &payload).await);

            if let Err(err) = self.log.record(record).await {
                tracing::warn!(
                    match_id = event.match_id,
                    participant = %participant,
                    "failed to write notification record: {err}"
                );
            }
        }

        tracing::info!(
            match_id = event.match_id,
            kind = event.kind.as_str(),
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            removed = report.removed,
            "match notification fan-out finished"
        );
        report
    }

    /// Sends a test notification to every subscription of one participant.
    /// Returns `None` when the participant has no subscriptions.
    pub async fn notify_test(
        &self,
        tournament_id: i64,
        participant_name: &str,
    ) -> Result<Option<DeliveryReport>, S::Error> {
        let subscriptions = self
            .subscriptions
            .subscriptions_for(tournament_id, participant_name)
            .await?;
        if subscriptions.is_empty() {
            return Ok(None);
        }
        let payload = payload::test_payload(tournament_id, participant_name, &self.settings.texts);
        let payload = match encode_payload(&payload) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!("failed to encode test payload: {err}");
                return Ok(Some(DeliveryReport {
                    failed: subscriptions.len(),
                    ..DeliveryReport::default()
                }));
            }
        };
        Ok(Some(self.deliver(&subscriptions, &payload).await))
    }

    /// Attempts every subscription concurrently, waits for all of them and
    /// prunes the ones the push service reported gone.
    pub(crate) async fn deliver(
        &self,
        subscriptions: &[SubscriptionRecord],
        payload: &[u8],
    ) -> DeliveryReport {
        let attempts = subscriptions
            .iter()
            .map(|record| self.attempt(record, payload));
        let outcomes = join_all(attempts).await;

        let mut report = DeliveryReport::default();
        let mut expired = Vec::new();
        for (record, outcome) in subscriptions.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.sent += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        endpoint = %record.subscription.endpoint,
                        participant = %record.participant_name,
                        status = ?err.status_code(),
                        "push delivery error: {err}"
                    );
                    if err.is_expired() {
                        expired.push(record.subscription.endpoint.as_str());
                    }
                }
            }
        }

        report.removed = self.prune(&expired).await;
        report
    }

    async fn attempt(&self, record: &SubscriptionRecord, payload: &[u8]) -> Result<(), PushError> {
        let request =
            PushRequest::prepare(&record.subscription, payload, &self.vapid, self.settings.ttl)?;
        self.sender.send(&request).await
    }

    async fn prune(&self, endpoints: &[&str]) -> usize {
        let deletions = endpoints
            .iter()
            .map(|endpoint| self.subscriptions.delete_subscription(endpoint));
        let results = join_all(deletions).await;

        let mut removed = 0;
        for (endpoint, result) in endpoints.iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::info!(endpoint = %endpoint, "removed expired subscription");
                    removed += 1;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(endpoint = %endpoint, "failed to remove expired subscription: {err}");
                }
            }
        }
        removed
    }
}

fn encode_payload(payload: &NotificationPayload) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(payload)
}

/// Splits team labels such as `"Kim · Lee"` into player names.
///
/// Names are trimmed, empty pieces dropped and duplicates collapsed to their
/// first occurrence. A name that itself contains the delimiter is split too.
pub fn resolve_participants(team_labels: &[&str], delimiter: &str) -> Vec<String> {
    let mut participants: Vec<String> = Vec::new();
    for label in team_labels {
        for name in label.split(delimiter).map(str::trim) {
            if !name.is_empty() && !participants.iter().any(|existing| existing == name) {
                participants.push(name.to_string());
            }
        }
    }
    participants
}
