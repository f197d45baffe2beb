// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end delivery tests.
//!
//! `TestHarness` assembles the delivery stack over a temp SQLite database
//! with a [`MockGateway`]. Tasks only run when a test drives the runner, so
//! every interleaving is explicit.

use std::sync::Arc;
use std::time::Duration;

use beacon_config::model::RunnerConfig;
use beacon_core::types::{CoordinatorRecord, SenderRecord};
use beacon_core::{BeaconError, NotificationFields, NotificationId, NotificationStatus, TaskId};
use beacon_delivery::{DeliveryService, DeliverySettings, TaskRunner};
use beacon_storage::{Database, StoredTask};
use tracing::debug;

use crate::mock_gateway::{MockGateway, MockReply};

/// Runner id used to simulate a process that claimed a task and died.
pub const CRASHED_RUNNER: &str = "crashed-runner";

/// Upper bound on runner rounds in [`TestHarness::run_until_idle`].
const MAX_ROUNDS: usize = 1000;

/// Builder for creating test environments with configurable limits.
pub struct TestHarnessBuilder {
    settings: DeliverySettings,
    replies: Vec<MockReply>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: DeliverySettings {
                coordinator_delay: Duration::ZERO,
                ..DeliverySettings::default()
            },
            replies: Vec::new(),
        }
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.settings.max_batch = max_batch;
        self
    }

    pub fn with_max_concurrent_senders(mut self, max: usize) -> Self {
        self.settings.max_concurrent_senders = max;
        self
    }

    pub fn with_max_retry_attempts(mut self, max: u32) -> Self {
        self.settings.max_retry_attempts = max;
        self
    }

    /// Set scripted gateway replies.
    pub fn with_replies(mut self, replies: Vec<MockReply>) -> Self {
        self.replies = replies;
        self
    }

    /// Build the test harness, creating the temp database.
    pub async fn build(self) -> Result<TestHarness, BeaconError> {
        let temp_dir = tempfile::TempDir::new().map_err(BeaconError::storage)?;
        let db = Database::open(temp_dir.path().join("test.db")).await?;

        let gateway = Arc::new(MockGateway::with_replies(self.replies));
        let service = DeliveryService::new(db.clone(), self.settings);
        let runner = TaskRunner::new(
            db.clone(),
            gateway.clone(),
            self.settings,
            RunnerConfig::default(),
        );

        Ok(TestHarness {
            gateway,
            db,
            service,
            runner,
            settings: self.settings,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete delivery stack with a mock gateway and temp storage.
pub struct TestHarness {
    /// The scripted push gateway.
    pub gateway: Arc<MockGateway>,
    /// Database handle (temp file, removed on drop).
    pub db: Database,
    /// Caller-facing service.
    pub service: DeliveryService,
    /// Task runner, driven manually by tests.
    pub runner: TaskRunner,
    pub settings: DeliverySettings,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default limits and no coordinator delay.
    pub async fn new() -> Result<Self, BeaconError> {
        Self::builder().build().await
    }

    /// Registers a token derived from the user id and returns it.
    pub async fn register(&self, user_id: &str) -> Result<String, BeaconError> {
        let token = format!("ExponentPushToken[{user_id}]");
        self.service.record_token(user_id, &token).await?;
        Ok(token)
    }

    /// Queues a title-only notification that must be accepted.
    pub async fn send(&self, user_id: &str, title: &str) -> Result<NotificationId, BeaconError> {
        self.service
            .send_notification(user_id, NotificationFields::titled(title), false)
            .await?
            .ok_or_else(|| BeaconError::Internal(format!("notification to {user_id} not queued")))
    }

    pub async fn status(&self, id: &NotificationId) -> Result<NotificationStatus, BeaconError> {
        self.service
            .notification_status(id)
            .await?
            .ok_or_else(|| BeaconError::Internal(format!("notification {id} not found")))
    }

    /// Runs due tasks until none are left. Returns the total run.
    ///
    /// Reconcile tasks are scheduled at the sender timeout, so they are not
    /// due here unless a test runs them explicitly.
    pub async fn run_until_idle(&self) -> Result<usize, BeaconError> {
        let mut total = 0;
        for _ in 0..MAX_ROUNDS {
            let ran = self.runner.run_due().await?;
            if ran == 0 {
                debug!(total, "runner idle");
                return Ok(total);
            }
            total += ran;
        }
        Err(BeaconError::Internal(format!(
            "tasks still due after {MAX_ROUNDS} rounds"
        )))
    }

    /// Runs the live coordination step now, if there is one.
    pub async fn run_coordinator(&self) -> Result<bool, BeaconError> {
        let live = self.coordinators().await?;
        match live.first() {
            Some(coordinator) => self.runner.run_task(&coordinator.dispatch_task_id).await,
            None => Ok(false),
        }
    }

    pub async fn senders(&self) -> Result<Vec<SenderRecord>, BeaconError> {
        self.db.transact(|txn| txn.list_senders()).await
    }

    pub async fn coordinators(&self) -> Result<Vec<CoordinatorRecord>, BeaconError> {
        self.db.transact(|txn| txn.list_coordinators()).await
    }

    pub async fn task(&self, id: &TaskId) -> Result<Option<StoredTask>, BeaconError> {
        let id = id.clone();
        self.db.transact(move |txn| txn.get_task(&id)).await
    }

    /// Claims a pending task under [`CRASHED_RUNNER`] without running it,
    /// as if its process died mid-call.
    pub async fn claim_as_crashed(&self, id: &TaskId) -> Result<bool, BeaconError> {
        let id = id.clone();
        let claimed = self
            .db
            .transact(move |txn| txn.claim_task(&id, CRASHED_RUNNER))
            .await?;
        Ok(claimed.is_some())
    }
}
