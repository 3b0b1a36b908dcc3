use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MatchStarting,
    MatchUpcoming,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::MatchStarting => "match_starting",
            NotificationKind::MatchUpcoming => "match_upcoming",
        }
    }
}

/// A match state change that should reach the players on court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub tournament_id: i64,
    pub match_id: i64,
    pub court_number: u32,
    pub team1: String,
    pub team2: String,
    pub kind: NotificationKind,
}

/// Idempotency key: at most one notification attempt per triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub match_id: i64,
    pub participant_name: String,
    pub kind: NotificationKind,
}

/// Aggregate outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Participants skipped because they were already notified.
    pub skipped: usize,
    /// Subscriptions pruned after the push service reported them gone.
    pub removed: usize,
}

impl DeliveryReport {
    pub(crate) fn absorb(&mut self, other: DeliveryReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.removed += other.removed;
    }
}

/// Plaintext JSON that the service worker receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub court_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}
