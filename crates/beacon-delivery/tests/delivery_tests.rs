// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end delivery scenarios driven through the test harness.

use std::collections::HashSet;
use std::time::Duration;

use beacon_config::model::RunnerConfig;
use beacon_core::{
    NotificationId, NotificationState, NotificationStatus, PushTicket, ServiceState,
    ShutdownOutcome, TaskStatus,
};
use beacon_delivery::sender::send_batch;
use beacon_delivery::{EnsureOutcome, ScheduledTask, TaskRunner};
use beacon_test_utils::{MockReply, TestHarness};
use tokio_util::sync::CancellationToken;

fn status(state: NotificationState, failures: u32) -> NotificationStatus {
    NotificationStatus {
        state,
        num_previous_failures: failures,
    }
}

async fn send_all(h: &TestHarness, user: &str, titles: &[&str]) -> Vec<NotificationId> {
    let mut ids = Vec::new();
    for title in titles {
        ids.push(h.send(user, title).await.unwrap());
    }
    ids
}

#[tokio::test]
async fn queued_notifications_are_delivered_in_one_batch() {
    let h = TestHarness::new().await.unwrap();
    h.register("alice").await.unwrap();
    let ids = send_all(&h, "alice", &["one", "two", "three"]).await;

    h.run_until_idle().await.unwrap();

    for id in &ids {
        assert_eq!(h.status(id).await.unwrap(), status(NotificationState::Delivered, 0));
    }
    let requests = h.gateway.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].len(), 3);
    assert_eq!(requests[0][0].to, "ExponentPushToken[alice]");
    assert_eq!(requests[0][0].sound, "default");
    assert!(h.senders().await.unwrap().is_empty());
}

#[tokio::test]
async fn transport_failure_is_retried_with_one_more_failure() {
    let h = TestHarness::builder()
        .with_replies(vec![MockReply::Transport("connection refused".into())])
        .build()
        .await
        .unwrap();
    h.register("alice").await.unwrap();
    let id = h.send("alice", "hello").await.unwrap();

    h.run_until_idle().await.unwrap();

    assert_eq!(h.status(&id).await.unwrap(), status(NotificationState::Delivered, 1));
    assert_eq!(h.gateway.call_count().await, 2);
}

#[tokio::test]
async fn failure_counter_grows_by_one_until_the_ceiling() {
    let h = TestHarness::builder()
        .with_max_retry_attempts(3)
        .with_replies(vec![
            MockReply::Transport("down".into()),
            MockReply::Transport("down".into()),
            MockReply::Transport("down".into()),
            MockReply::Transport("down".into()),
        ])
        .build()
        .await
        .unwrap();
    h.register("alice").await.unwrap();
    let id = h.send("alice", "hello").await.unwrap();

    let mut observed = Vec::new();
    loop {
        // coordinate, then send
        h.run_coordinator().await.unwrap();
        if h.runner.run_due().await.unwrap() == 0 {
            break;
        }
        observed.push(h.status(&id).await.unwrap());
    }

    assert_eq!(
        observed,
        vec![
            status(NotificationState::NeedsRetry, 1),
            status(NotificationState::NeedsRetry, 2),
            status(NotificationState::UnableToDeliver, 3),
        ]
    );
    assert_eq!(h.gateway.call_count().await, 3);
}

#[tokio::test]
async fn rejected_request_is_ambiguous_and_never_retried() {
    let h = TestHarness::builder()
        .with_replies(vec![MockReply::Reject {
            status: 500,
            body: "internal error".into(),
        }])
        .build()
        .await
        .unwrap();
    h.register("alice").await.unwrap();
    let ids = send_all(&h, "alice", &["a", "b"]).await;

    h.run_until_idle().await.unwrap();

    for id in &ids {
        assert_eq!(
            h.status(id).await.unwrap(),
            status(NotificationState::MaybeDelivered, 0)
        );
    }
    assert_eq!(h.gateway.call_count().await, 1);
}

#[tokio::test]
async fn mixed_tickets_retry_only_the_failed_position() {
    let h = TestHarness::builder()
        .with_replies(vec![MockReply::Tickets(vec![
            PushTicket::ok("t0"),
            PushTicket::error("MessageRateExceeded"),
            PushTicket::ok("t2"),
        ])])
        .build()
        .await
        .unwrap();
    h.register("alice").await.unwrap();
    let ids = send_all(&h, "alice", &["first", "second", "third"]).await;

    h.run_until_idle().await.unwrap();

    assert_eq!(h.status(&ids[0]).await.unwrap(), status(NotificationState::Delivered, 0));
    assert_eq!(h.status(&ids[1]).await.unwrap(), status(NotificationState::Delivered, 1));
    assert_eq!(h.status(&ids[2]).await.unwrap(), status(NotificationState::Delivered, 0));

    let requests = h.gateway.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].len(), 1);
    assert_eq!(requests[1][0].title, "second");
}

#[tokio::test]
async fn sender_pool_is_capped() {
    let h = TestHarness::builder()
        .with_max_batch(1)
        .with_max_concurrent_senders(2)
        .build()
        .await
        .unwrap();
    h.register("alice").await.unwrap();
    let ids = send_all(&h, "alice", &["n0", "n1", "n2", "n3"]).await;

    assert!(h.run_coordinator().await.unwrap());
    assert_eq!(h.senders().await.unwrap().len(), 1);

    assert!(matches!(
        h.service.ensure_coordinator().await.unwrap(),
        EnsureOutcome::Scheduled(_)
    ));
    assert!(h.run_coordinator().await.unwrap());
    assert_eq!(h.senders().await.unwrap().len(), 2);

    h.service.ensure_coordinator().await.unwrap();
    assert!(h.run_coordinator().await.unwrap());
    assert_eq!(h.senders().await.unwrap().len(), 2, "third sender must not start");

    let mut waiting = 0;
    for id in &ids {
        if h.status(id).await.unwrap().state == NotificationState::AwaitingDelivery {
            waiting += 1;
        }
    }
    assert_eq!(waiting, 2);

    h.run_until_idle().await.unwrap();
    for id in &ids {
        assert_eq!(h.status(id).await.unwrap().state, NotificationState::Delivered);
    }
    let titles = h.gateway.sent_titles().await;
    assert_eq!(titles.len(), 4);
    assert_eq!(titles.iter().collect::<HashSet<_>>().len(), 4);
}

#[tokio::test]
async fn at_most_one_coordinator_is_live() {
    let h = TestHarness::new().await.unwrap();
    for user in ["alice", "bob", "carol"] {
        h.register(user).await.unwrap();
        h.send(user, "hi").await.unwrap();
        h.send(user, "again").await.unwrap();
    }
    assert_eq!(h.coordinators().await.unwrap().len(), 1);
    assert_eq!(
        h.service.ensure_coordinator().await.unwrap(),
        EnsureOutcome::AlreadyScheduled
    );
}

#[tokio::test]
async fn concurrent_coordination_steps_never_share_a_notification() {
    let h = TestHarness::new().await.unwrap();
    h.register("alice").await.unwrap();
    send_all(&h, "alice", &["a", "b", "c", "d", "e"]).await;

    // Extra coordinate tasks outside the singleton guard.
    h.db.transact(|txn| {
        ScheduledTask::Coordinate.schedule(txn, Duration::ZERO)?;
        ScheduledTask::Coordinate.schedule(txn, Duration::ZERO)
    })
    .await
    .unwrap();

    assert_eq!(h.runner.run_due().await.unwrap(), 3);
    assert_eq!(h.senders().await.unwrap().len(), 1);

    h.run_until_idle().await.unwrap();
    let titles = h.gateway.sent_titles().await;
    assert_eq!(titles, ["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn reconciler_resolves_a_crashed_sender() {
    let h = TestHarness::new().await.unwrap();
    h.register("alice").await.unwrap();
    let ids = send_all(&h, "alice", &["a", "b"]).await;

    h.run_coordinator().await.unwrap();
    let sender = h.senders().await.unwrap().remove(0);
    assert!(h.claim_as_crashed(&sender.dispatch_task_id).await.unwrap());

    // A fresh runner finds the send task abandoned.
    let report = h.runner.recover().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(
        h.task(&sender.dispatch_task_id).await.unwrap().unwrap().state,
        TaskStatus::Failed
    );

    assert!(h.runner.run_task(&sender.reconcile_task_id).await.unwrap());
    for id in &ids {
        assert_eq!(
            h.status(id).await.unwrap(),
            status(NotificationState::MaybeDelivered, 0)
        );
    }
    assert_eq!(h.gateway.call_count().await, 0);
    assert_eq!(h.coordinators().await.unwrap().len(), 1);

    // The next dispatch prunes the dead sender.
    let next = h.send("alice", "c").await.unwrap();
    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(&next).await.unwrap().state, NotificationState::Delivered);
    assert!(h.senders().await.unwrap().is_empty());
}

#[tokio::test]
async fn late_outcome_after_reconciliation_changes_nothing() {
    let h = TestHarness::new().await.unwrap();
    h.register("alice").await.unwrap();
    let id = h.send("alice", "late").await.unwrap();

    h.run_coordinator().await.unwrap();
    let sender = h.senders().await.unwrap().remove(0);
    h.claim_as_crashed(&sender.dispatch_task_id).await.unwrap();
    h.runner.run_task(&sender.reconcile_task_id).await.unwrap();

    let stored = h.task(&sender.dispatch_task_id).await.unwrap().unwrap();
    let ScheduledTask::SendBatch(batch) = ScheduledTask::from_stored(&stored).unwrap() else {
        panic!("expected a send task");
    };
    let report = send_batch(
        &h.db,
        h.gateway.as_ref(),
        h.settings,
        stored.id.clone(),
        batch,
    )
    .await
    .unwrap();

    assert_eq!(report.stale, 1);
    assert_eq!(report.delivered, 0);
    assert_eq!(
        h.status(&id).await.unwrap(),
        status(NotificationState::MaybeDelivered, 0)
    );
}

#[tokio::test]
async fn shutdown_drains_and_restart_waits_for_running_senders() {
    let h = TestHarness::builder().with_max_batch(1).build().await.unwrap();
    h.register("alice").await.unwrap();

    let pending_id = h.send("alice", "pending").await.unwrap();
    h.run_coordinator().await.unwrap();
    let pending_sender = h.senders().await.unwrap().remove(0);

    let running_id = h.send("alice", "running").await.unwrap();
    h.run_coordinator().await.unwrap();
    let running_sender = h
        .senders()
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.id != pending_sender.id)
        .unwrap();
    h.claim_as_crashed(&running_sender.dispatch_task_id).await.unwrap();

    let outcome = h.service.shutdown().await.unwrap();
    assert_eq!(
        outcome,
        ShutdownOutcome::Draining {
            sender_ids: vec![running_sender.id.clone()]
        }
    );
    assert_eq!(
        h.status(&pending_id).await.unwrap(),
        status(NotificationState::NeedsRetry, 0)
    );
    assert_eq!(
        h.task(&pending_sender.dispatch_task_id).await.unwrap().unwrap().state,
        TaskStatus::Canceled
    );
    assert_eq!(
        h.task(&pending_sender.reconcile_task_id).await.unwrap().unwrap().state,
        TaskStatus::Canceled
    );
    assert!(h.coordinators().await.unwrap().is_empty());
    assert_eq!(
        h.db.transact(|txn| txn.service_state()).await.unwrap(),
        ServiceState::ShuttingDown
    );

    // Admission is closed: new work is stored but not coordinated.
    let queued_id = h.send("alice", "queued").await.unwrap();
    assert!(h.coordinators().await.unwrap().is_empty());
    assert!(!h.service.restart().await.unwrap());

    // The running sender finishes.
    let stored = h.task(&running_sender.dispatch_task_id).await.unwrap().unwrap();
    let ScheduledTask::SendBatch(batch) = ScheduledTask::from_stored(&stored).unwrap() else {
        panic!("expected a send task");
    };
    send_batch(&h.db, h.gateway.as_ref(), h.settings, stored.id.clone(), batch)
        .await
        .unwrap();
    assert_eq!(h.status(&running_id).await.unwrap().state, NotificationState::Delivered);
    assert!(h.coordinators().await.unwrap().is_empty());

    assert!(h.service.restart().await.unwrap());
    assert_eq!(h.coordinators().await.unwrap().len(), 1);
    assert_eq!(
        h.db.transact(|txn| txn.service_state()).await.unwrap(),
        ServiceState::Running
    );

    h.run_until_idle().await.unwrap();
    for id in [&pending_id, &queued_id] {
        assert_eq!(h.status(id).await.unwrap().state, NotificationState::Delivered);
    }
}

#[tokio::test]
async fn recovery_requeues_coordination() {
    let h = TestHarness::new().await.unwrap();
    h.register("alice").await.unwrap();
    let id = h.send("alice", "hi").await.unwrap();

    let coordinator = h.coordinators().await.unwrap().remove(0);
    h.claim_as_crashed(&coordinator.dispatch_task_id).await.unwrap();
    assert_eq!(h.runner.run_due().await.unwrap(), 0);

    let report = h.runner.recover().await.unwrap();
    assert_eq!(report.requeued, 1);

    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(&id).await.unwrap().state, NotificationState::Delivered);
}

#[tokio::test]
async fn runner_loop_delivers_until_cancelled() {
    let h = TestHarness::new().await.unwrap();
    h.register("alice").await.unwrap();

    let runner = TaskRunner::new(
        h.db.clone(),
        h.gateway.clone(),
        h.settings,
        RunnerConfig {
            poll_interval_ms: 50,
            drain_timeout_secs: 5,
            ..RunnerConfig::default()
        },
    );
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(runner.run(cancel.clone()));

    let id = h.send("alice", "live").await.unwrap();
    let delivered = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if h.status(&id).await.unwrap().state == NotificationState::Delivered {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(delivered.is_ok(), "notification was not delivered in time");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
