use crate::types::notification::NotificationRecord;
use crate::types::push::SubscriptionRecord;

/// Persistent subscriptions, uniquely keyed by endpoint.
pub trait SubscriptionStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn subscriptions_for(
        &self,
        tournament_id: i64,
        participant_name: &str,
    ) -> impl Future<Output = Result<Vec<SubscriptionRecord>, Self::Error>> + Send;

    /// Inserts or replaces the subscription with the same endpoint.
    fn upsert_subscription(
        &self,
        record: SubscriptionRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Removes a subscription regardless of owner. Returns whether it existed.
    fn delete_subscription(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Removes a subscription only if it belongs to the tournament.
    fn remove_subscription(
        &self,
        tournament_id: i64,
        endpoint: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}

/// Set of notification records used for at-most-once delivery.
pub trait NotificationLog: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn has_record(
        &self,
        record: &NotificationRecord,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Insert-if-absent. Returns whether the record was new.
    fn record(
        &self,
        record: NotificationRecord,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;
}
