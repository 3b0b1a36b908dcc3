use crate::ports::push::PushSender;
use crate::ports::store::{NotificationLog, SubscriptionStore};
use crate::push::fanout::Fanout;
use crate::types::notification::{DeliveryReport, MatchEvent, NotificationKind};

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use tokio::task::JoinHandle;

pub(crate) const MAX_JOB_HISTORY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEntry {
    pub id: u64,
    pub event: MatchEvent,
    pub queued_at: OffsetDateTime,
    pub finished_at: Option<OffsetDateTime>,
    pub report: Option<DeliveryReport>,
}

#[derive(Debug, Default)]
struct JobBook {
    next_id: u64,
    in_flight: HashSet<(i64, NotificationKind)>,
    history: VecDeque<JobEntry>,
}

impl JobBook {
    fn finish(&mut self, id: u64, report: DeliveryReport) {
        if let Some(entry) = self.history.iter_mut().find(|entry| entry.id == id) {
            entry.finished_at = Some(OffsetDateTime::now_utc());
            entry.report = Some(report);
        }
    }
}

pub struct QueuedNotification {
    pub id: u64,
    handle: JoinHandle<DeliveryReport>,
}

impl QueuedNotification {
    /// Waits for the fan-out to finish.
    pub async fn join(self) -> Result<DeliveryReport, tokio::task::JoinError> {
        self.handle.await
    }
}

/// Hands match events to detached fan-out tasks so the code that changed
/// the match never waits on push delivery.
#[derive(Debug)]
pub struct NotificationQueue<P, S, L> {
    fanout: Arc<Fanout<P, S, L>>,
    jobs: Arc<Mutex<JobBook>>,
}

impl<P, S, L> Clone for NotificationQueue<P, S, L> {
    fn clone(&self) -> Self {
        Self {
            fanout: Arc::clone(&self.fanout),
            jobs: Arc::clone(&self.jobs),
        }
    }
}

impl<P, S, L> NotificationQueue<P, S, L>
where
    P: PushSender,
    S: SubscriptionStore,
    L: NotificationLog,
{
    pub fn new(fanout: Fanout<P, S, L>) -> Self {
        Self {
            fanout: Arc::new(fanout),
            jobs: Arc::new(Mutex::new(JobBook::default())),
        }
    }

    pub fn fanout(&self) -> &Fanout<P, S, L> {
        &self.fanout
    }

    /// Spawns the fan-out for `event`. Returns `None` when a job for the
    /// same match and kind is still running.
    pub fn enqueue(&self, event: MatchEvent) -> Option<QueuedNotification> {
        let key = (event.match_id, event.kind);
        let id = {
            let mut jobs = match self.jobs.lock() {
                Ok(jobs) => jobs,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !jobs.in_flight.insert(key) {
                tracing::debug!(
                    match_id = event.match_id,
                    kind = event.kind.as_str(),
                    "notification already in flight"
                );
                return None;
            }
            jobs.next_id += 1;
            let id = jobs.next_id;
            jobs.history.push_back(JobEntry {
                id,
                event: event.clone(),
                queued_at: OffsetDateTime::now_utc(),
                finished_at: None,
                report: None,
            });
            while jobs.history.len() > MAX_JOB_HISTORY {
                jobs.history.pop_front();
            }
            id
        };

        let fanout = Arc::clone(&self.fanout);
        let jobs = Arc::clone(&self.jobs);
        let handle = tokio::spawn(async move {
            let report = fanout.notify(&event).await;
            let mut jobs = match jobs.lock() {
                Ok(jobs) => jobs,
                Err(poisoned) => poisoned.into_inner(),
            };
            jobs.in_flight.remove(&key);
            jobs.finish(id, report);
            report
        });

        Some(QueuedNotification { id, handle })
    }

    /// Most recent jobs first.
    pub fn recent_jobs(&self) -> Vec<JobEntry> {
        let jobs = match self.jobs.lock() {
            Ok(jobs) => jobs,
            Err(poisoned) => poisoned.into_inner(),
        };
        jobs.history.iter().rev().cloned().collect()
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::push::fanout::tests::{TestSender, record, settings};
    use crate::push::vapid::tests::test_identity;

    fn queue(
        sender: TestSender,
        store: MemoryStore,
    ) -> NotificationQueue<TestSender, MemoryStore, MemoryStore> {
        NotificationQueue::new(Fanout::new(
            sender,
            store.clone(),
            store,
            Arc::new(test_identity()),
            settings(),
        ))
    }

    fn event(match_id: i64) -> MatchEvent {
        MatchEvent {
            tournament_id: 1,
            match_id,
            court_number: 4,
            team1: "Kim · Lee".to_string(),
            team2: "Park".to_string(),
            kind: NotificationKind::MatchStarting,
        }
    }

    #[tokio::test]
    async fn enqueue__should_run_fanout_in_background_and_record_report() {
        // Given
        let store = MemoryStore::default();
        store
            .upsert_subscription(record(1, "Kim", "https://push.example/kim", 1))
            .await
            .expect("upsert");
        let sender = TestSender::default();
        let queue = queue(sender.clone(), store);

        // When
        let job = queue.enqueue(event(42)).expect("queued");
        let id = job.id;
        let report = job.join().await.expect("join");

        // Then
        assert_eq!(report.sent, 1);
        assert_eq!(sender.endpoints(), vec!["https://push.example/kim"]);
        let jobs = queue.recent_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, id);
        assert_eq!(jobs[0].report, Some(report));
        assert!(jobs[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn enqueue__should_coalesce_duplicate_in_flight_events() {
        // Given
        let queue = queue(TestSender::default(), MemoryStore::default());

        // When
        let first = queue.enqueue(event(42)).expect("queued");
        let duplicate = queue.enqueue(event(42));
        let other = queue.enqueue(event(43)).expect("queued");

        // Then
        assert!(duplicate.is_none());
        first.join().await.expect("join");
        other.join().await.expect("join");
        assert!(queue.enqueue(event(42)).is_some());
    }

    #[tokio::test]
    async fn enqueue__should_skip_already_notified_event_on_retrigger() {
        // Given
        let store = MemoryStore::default();
        store
            .upsert_subscription(record(1, "Park", "https://push.example/park", 3))
            .await
            .expect("upsert");
        let sender = TestSender::default();
        let queue = queue(sender.clone(), store);

        // When
        let first = queue.enqueue(event(42)).expect("queued").join().await.expect("join");
        let second = queue.enqueue(event(42)).expect("queued").join().await.expect("join");

        // Then
        assert_eq!(first.sent, 1);
        assert_eq!(second.sent, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(sender.endpoints().len(), 1);
    }

    #[tokio::test]
    async fn recent_jobs__should_keep_bounded_history_newest_first() {
        // Given
        let queue = queue(TestSender::default(), MemoryStore::default());

        // When
        for match_id in 0..(MAX_JOB_HISTORY as i64 + 5) {
            queue
                .enqueue(event(match_id))
                .expect("queued")
                .join()
                .await
                .expect("join");
        }

        // Then
        let jobs = queue.recent_jobs();
        assert_eq!(jobs.len(), MAX_JOB_HISTORY);
        assert_eq!(jobs[0].event.match_id, MAX_JOB_HISTORY as i64 + 4);
        assert_eq!(jobs.last().expect("oldest").event.match_id, 5);
    }
}
