// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing operations of the delivery pipeline.
//!
//! Every method is one storage transaction. Methods that queue work also
//! ensure the coordinator in that transaction, so a committed notification
//! always has a coordination step scheduled unless admission is closed.

use beacon_core::{
    BeaconError, Notification, NotificationFields, NotificationId, NotificationStatus,
    ShutdownOutcome, UserStatus,
};
use beacon_storage::Database;
use tracing::{debug, info};

use crate::coordinator::{self, EnsureOutcome};
use crate::lifecycle;
use crate::settings::DeliverySettings;

/// Default page size of [`DeliveryService::notifications_for_user`].
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Handle through which callers register tokens and queue notifications.
#[derive(Clone)]
pub struct DeliveryService {
    db: Database,
    settings: DeliverySettings,
}

impl DeliveryService {
    pub fn new(db: Database, settings: DeliverySettings) -> Self {
        Self { db, settings }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> DeliverySettings {
        self.settings
    }

    /// Registers a device token, replacing any previous one. An empty token
    /// is ignored.
    pub async fn record_token(&self, user_id: &str, token: &str) -> Result<(), BeaconError> {
        if token.is_empty() {
            debug!(user = user_id, "ignoring empty push token");
            return Ok(());
        }
        let (user, token) = (user_id.to_string(), token.to_string());
        let replaced = self
            .db
            .transact(move |txn| txn.upsert_token(&user, &token))
            .await?;
        debug!(user = user_id, replaced, "recorded push token");
        Ok(())
    }

    /// Returns true if a token was removed.
    pub async fn remove_token(&self, user_id: &str) -> Result<bool, BeaconError> {
        let user = user_id.to_string();
        self.db.transact(move |txn| txn.delete_token(&user)).await
    }

    pub async fn user_status(&self, user_id: &str) -> Result<UserStatus, BeaconError> {
        let user = user_id.to_string();
        let token = self.db.transact(move |txn| txn.get_token(&user)).await?;
        Ok(UserStatus {
            has_token: token.is_some(),
            paused: token.is_some_and(|t| t.notifications_paused),
        })
    }

    /// Pauses delivery to a user. A user without a token is left untouched.
    pub async fn pause(&self, user_id: &str) -> Result<bool, BeaconError> {
        self.set_paused(user_id, true).await
    }

    pub async fn unpause(&self, user_id: &str) -> Result<bool, BeaconError> {
        self.set_paused(user_id, false).await
    }

    async fn set_paused(&self, user_id: &str, paused: bool) -> Result<bool, BeaconError> {
        let user = user_id.to_string();
        let changed = self
            .db
            .transact(move |txn| txn.set_paused(&user, paused))
            .await?;
        if !changed {
            debug!(user = user_id, paused, "no push token, pause flag unchanged");
        }
        Ok(changed)
    }

    /// Queues a notification for delivery to the user's current token.
    ///
    /// Returns `None` when the user has paused notifications, or has no token
    /// and `allow_unregistered` is set. Without `allow_unregistered` a missing
    /// token is [`BeaconError::NoPushToken`].
    pub async fn send_notification(
        &self,
        user_id: &str,
        fields: NotificationFields,
        allow_unregistered: bool,
    ) -> Result<Option<NotificationId>, BeaconError> {
        fields.validate()?;

        let user = user_id.to_string();
        let settings = self.settings;
        let queued = self
            .db
            .transact(move |txn| {
                let Some(token) = txn.get_token(&user)? else {
                    if allow_unregistered {
                        return Ok(None);
                    }
                    return Err(BeaconError::NoPushToken { user_id: user });
                };
                if token.notifications_paused {
                    return Ok(None);
                }
                let id = txn.insert_notification(&user, &token.token, &fields)?;
                coordinator::ensure_coordinator(txn, &settings)?;
                Ok(Some(id))
            })
            .await?;

        match &queued {
            Some(id) => debug!(user = user_id, notification = %id, "queued notification"),
            None => debug!(user = user_id, "notification not queued"),
        }
        Ok(queued)
    }

    pub async fn get_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, BeaconError> {
        let id = id.clone();
        self.db.transact(move |txn| txn.get_notification(&id)).await
    }

    pub async fn notification_status(
        &self,
        id: &NotificationId,
    ) -> Result<Option<NotificationStatus>, BeaconError> {
        Ok(self.get_notification(id).await?.map(|n| NotificationStatus {
            state: n.state,
            num_previous_failures: n.num_previous_failures,
        }))
    }

    /// A user's notifications, newest first.
    pub async fn notifications_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>, BeaconError> {
        let user = user_id.to_string();
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        self.db
            .transact(move |txn| txn.notifications_for_user(&user, limit))
            .await
    }

    /// Returns the number of notifications deleted.
    pub async fn delete_notifications_for_user(&self, user_id: &str) -> Result<usize, BeaconError> {
        let user = user_id.to_string();
        let deleted = self
            .db
            .transact(move |txn| txn.delete_notifications_for_user(&user))
            .await?;
        info!(user = user_id, deleted, "deleted notification history");
        Ok(deleted)
    }

    /// Schedules a coordination step if none is live.
    pub async fn ensure_coordinator(&self) -> Result<EnsureOutcome, BeaconError> {
        let settings = self.settings;
        self.db
            .transact(move |txn| coordinator::ensure_coordinator(txn, &settings))
            .await
    }

    pub async fn shutdown(&self) -> Result<ShutdownOutcome, BeaconError> {
        self.db.transact(lifecycle::shutdown).await
    }

    /// Returns false while senders from a previous shutdown are still running.
    pub async fn restart(&self) -> Result<bool, BeaconError> {
        let settings = self.settings;
        self.db
            .transact(move |txn| lifecycle::restart(txn, &settings))
            .await
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::NotificationState;

    use super::*;

    async fn service() -> (tempfile::TempDir, DeliveryService) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db")).await.unwrap();
        (dir, DeliveryService::new(db, DeliverySettings::default()))
    }

    #[tokio::test]
    async fn empty_token_is_ignored() {
        let (_dir, service) = service().await;
        service.record_token("alice", "").await.unwrap();
        assert!(!service.user_status("alice").await.unwrap().has_token);
    }

    #[tokio::test]
    async fn send_to_unregistered_user() {
        let (_dir, service) = service().await;
        let err = service
            .send_notification("nobody", NotificationFields::titled("hi"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::NoPushToken { .. }));

        let queued = service
            .send_notification("nobody", NotificationFields::titled("hi"), true)
            .await
            .unwrap();
        assert!(queued.is_none());
    }

    #[tokio::test]
    async fn paused_user_gets_nothing_queued() {
        let (_dir, service) = service().await;
        service.record_token("alice", "ExponentPushToken[a]").await.unwrap();
        assert!(service.pause("alice").await.unwrap());

        let queued = service
            .send_notification("alice", NotificationFields::titled("hi"), false)
            .await
            .unwrap();
        assert!(queued.is_none());
        assert_eq!(
            service.user_status("alice").await.unwrap(),
            UserStatus {
                has_token: true,
                paused: true
            }
        );

        service.unpause("alice").await.unwrap();
        assert!(service
            .send_notification("alice", NotificationFields::titled("hi"), false)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn pause_without_token_is_a_no_op() {
        let (_dir, service) = service().await;
        assert!(!service.pause("ghost").await.unwrap());
        assert!(!service.user_status("ghost").await.unwrap().has_token);
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected_before_lookup() {
        let (_dir, service) = service().await;
        let err = service
            .send_notification("nobody", NotificationFields::titled(""), true)
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::InvalidNotification(_)));
    }

    #[tokio::test]
    async fn queued_notification_uses_current_token_and_schedules_coordinator() {
        let (_dir, service) = service().await;
        service.record_token("alice", "ExponentPushToken[old]").await.unwrap();
        service.record_token("alice", "ExponentPushToken[new]").await.unwrap();

        let id = service
            .send_notification("alice", NotificationFields::titled("hi"), false)
            .await
            .unwrap()
            .unwrap();
        let stored = service.get_notification(&id).await.unwrap().unwrap();
        assert_eq!(stored.token, "ExponentPushToken[new]");
        assert_eq!(
            service.notification_status(&id).await.unwrap(),
            Some(NotificationStatus {
                state: NotificationState::AwaitingDelivery,
                num_previous_failures: 0
            })
        );
        assert_eq!(
            service.ensure_coordinator().await.unwrap(),
            EnsureOutcome::AlreadyScheduled
        );
    }

    #[tokio::test]
    async fn history_is_newest_first_and_clearable() {
        let (_dir, service) = service().await;
        service.record_token("alice", "ExponentPushToken[a]").await.unwrap();
        for title in ["one", "two", "three"] {
            service
                .send_notification("alice", NotificationFields::titled(title), false)
                .await
                .unwrap();
        }

        let history = service.notifications_for_user("alice", None).await.unwrap();
        let titles: Vec<_> = history.iter().map(|n| n.metadata.title.as_str()).collect();
        assert_eq!(titles, ["three", "two", "one"]);
        assert_eq!(
            service.notifications_for_user("alice", Some(1)).await.unwrap().len(),
            1
        );

        assert_eq!(service.delete_notifications_for_user("alice").await.unwrap(), 3);
        assert!(service.notifications_for_user("alice", None).await.unwrap().is_empty());
    }
}
