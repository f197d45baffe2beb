// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Beacon workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::BeaconError;

/// Sound used when a notification does not specify one.
pub const DEFAULT_SOUND: &str = "default";

/// Unique identifier for a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

/// Unique identifier for a durable scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

/// Unique identifier for one in-flight delivery batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderId(pub String);

macro_rules! id_impls {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                /// Generates a fresh random identifier.
                pub fn generate() -> Self {
                    Self(uuid_string())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $ty {
                fn from(s: &str) -> Self {
                    Self(s.to_string())
                }
            }
        )*
    };
}

id_impls!(NotificationId, TaskId, SenderId);

fn uuid_string() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lifecycle state of a notification.
///
/// `awaiting_delivery -> in_progress -> {delivered, needs_retry,
/// maybe_delivered, unable_to_deliver}`, with `needs_retry -> in_progress`
/// forming a cycle bounded by the retry ceiling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationState {
    AwaitingDelivery,
    InProgress,
    Delivered,
    NeedsRetry,
    MaybeDelivered,
    UnableToDeliver,
}

impl NotificationState {
    /// Terminal states are never left again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NotificationState::Delivered
                | NotificationState::MaybeDelivered
                | NotificationState::UnableToDeliver
        )
    }
}

/// Live status of a durable scheduled task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Canceled,
    /// The task id does not resolve to any known task.
    Unknown,
}

impl TaskStatus {
    /// A task is live while it may still run or is running.
    pub fn is_live(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

/// Process-wide admission toggle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceState {
    #[default]
    Running,
    ShuttingDown,
}

/// Caller-supplied notification content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationFields {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Opaque payload passed to the device unexamined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl NotificationFields {
    /// Convenience constructor for a title-only notification.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            sound: None,
            data: None,
        }
    }

    /// Rejects payloads the gateway would refuse outright.
    pub fn validate(&self) -> Result<(), BeaconError> {
        if self.title.trim().is_empty() {
            return Err(BeaconError::InvalidNotification(
                "title must not be empty".into(),
            ));
        }
        if let Some(data) = &self.data
            && !data.is_object()
        {
            return Err(BeaconError::InvalidNotification(
                "data must be a JSON object".into(),
            ));
        }
        Ok(())
    }
}

/// One message in the gateway request array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub sound: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl PushMessage {
    /// Renders stored notification content for a device token.
    pub fn render(token: &str, fields: &NotificationFields) -> Self {
        Self {
            to: token.to_string(),
            title: fields.title.clone(),
            body: fields.body.clone(),
            sound: fields
                .sound
                .clone()
                .unwrap_or_else(|| DEFAULT_SOUND.to_string()),
            data: fields.data.clone(),
        }
    }
}

/// A queued notification with its delivery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: String,
    pub token: String,
    pub metadata: NotificationFields,
    pub state: NotificationState,
    pub num_previous_failures: u32,
    /// Batch currently owning an `in_progress` record.
    pub sender_id: Option<SenderId>,
    pub created_at: String,
    pub updated_at: String,
}

/// Delivery status summary returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStatus {
    pub state: NotificationState,
    pub num_previous_failures: u32,
}

/// A registered device token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushToken {
    pub user_id: String,
    pub token: String,
    pub notifications_paused: bool,
}

/// Registration summary for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub has_token: bool,
    pub paused: bool,
}

/// One in-flight delivery batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRecord {
    pub id: SenderId,
    pub dispatch_task_id: TaskId,
    pub reconcile_task_id: TaskId,
    pub created_at: String,
}

/// "A coordination step is scheduled."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorRecord {
    pub id: String,
    pub dispatch_task_id: TaskId,
    pub created_at: String,
}

/// Per-item result status returned by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Ok,
    Error,
}

/// Per-item gateway result, positionally aligned with the request array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTicket {
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PushTicket {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            status: TicketStatus::Ok,
            id: Some(id.into()),
            message: None,
            details: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TicketStatus::Error,
            id: None,
            message: Some(message.into()),
            details: None,
        }
    }
}

/// A gateway response that arrived (transport failures are errors instead).
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    /// 2xx with one ticket per request message.
    Accepted(Vec<PushTicket>),
    /// Non-2xx status, or a 2xx body that could not be parsed.
    Rejected { status: u16, body: String },
}

/// Result of a shutdown request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// Nothing is running any more.
    Stopped,
    /// Senders already calling the gateway were left to finish.
    Draining { sender_ids: Vec<SenderId> },
}

impl ShutdownOutcome {
    /// Human-readable summary for operators.
    pub fn message(&self) -> String {
        match self {
            ShutdownOutcome::Stopped => "success".to_string(),
            ShutdownOutcome::Draining { sender_ids } => format!(
                "There are {} jobs currently sending notifications that will continue running. \
                 Wait a few seconds for them to finish and then restart the service.",
                sender_ids.len()
            ),
        }
    }
}
