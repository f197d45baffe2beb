// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot caller operations: `beacon token`, `beacon send` and friends.
//!
//! Each command opens the database, runs one service operation and prints
//! the result as pretty JSON. Work queued here is picked up by a running
//! `beacon serve` on its next poll.

use beacon_config::model::BeaconConfig;
use beacon_core::{BeaconError, NotificationFields, NotificationId, ShutdownOutcome};
use beacon_delivery::{DeliveryService, DeliverySettings};
use beacon_storage::Database;
use clap::Subcommand;
use serde_json::{json, Value};

/// Caller operations against the delivery database.
#[derive(Subcommand, Debug)]
pub enum DeliveryCommand {
    /// Manage a user's push token.
    #[command(subcommand)]
    Token(TokenCommand),
    /// Queue a notification for a user.
    Send {
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: Option<String>,
        /// Sound name; the device default when omitted.
        #[arg(long)]
        sound: Option<String>,
        /// JSON object delivered to the app with the notification.
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
        /// Succeed without queueing when the user has no token.
        #[arg(long)]
        allow_unregistered: bool,
    },
    /// Show a notification's delivery state and failure count.
    Status { id: String },
    /// Show a stored notification.
    Show { id: String },
    /// List a user's notifications, newest first.
    History {
        user: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a user's notifications.
    ClearHistory { user: String },
    /// Stop delivering notifications to a user.
    Pause { user: String },
    /// Resume delivering notifications to a user.
    Unpause { user: String },
    /// Show whether a user has a token and has paused notifications.
    User { user: String },
    /// Stop the delivery pipeline, letting running senders finish.
    Shutdown,
    /// Restart the delivery pipeline after a shutdown.
    Restart,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Register or replace a user's device token.
    Register { user: String, token: String },
    /// Remove a user's device token.
    Remove { user: String },
}

/// Runs one command against the configured database and prints the result.
pub async fn run_command(config: &BeaconConfig, command: DeliveryCommand) -> Result<(), BeaconError> {
    let db = Database::open_with_config(&config.storage).await?;
    let service = DeliveryService::new(db.clone(), DeliverySettings::from(&config.delivery));

    let output = execute(&service, command).await?;
    let rendered = serde_json::to_string_pretty(&output).map_err(BeaconError::serialization)?;
    println!("{rendered}");

    db.close().await
}

/// Executes a command and returns its JSON result.
pub async fn execute(service: &DeliveryService, command: DeliveryCommand) -> Result<Value, BeaconError> {
    match command {
        DeliveryCommand::Token(TokenCommand::Register { user, token }) => {
            service.record_token(&user, &token).await?;
            Ok(json!({ "user_id": user, "registered": !token.is_empty() }))
        }
        DeliveryCommand::Token(TokenCommand::Remove { user }) => {
            let removed = service.remove_token(&user).await?;
            Ok(json!({ "user_id": user, "removed": removed }))
        }
        DeliveryCommand::Send {
            user,
            title,
            body,
            sound,
            data,
            allow_unregistered,
        } => {
            let data = data
                .map(|raw| {
                    serde_json::from_str::<Value>(&raw).map_err(|e| {
                        BeaconError::InvalidNotification(format!("data is not valid JSON: {e}"))
                    })
                })
                .transpose()?;
            let fields = NotificationFields {
                title,
                body,
                sound,
                data,
            };
            let id = service.send_notification(&user, fields, allow_unregistered).await?;
            Ok(json!({
                "queued": id.is_some(),
                "notification_id": id,
            }))
        }
        DeliveryCommand::Status { id } => {
            to_json(&service.notification_status(&NotificationId(id)).await?)
        }
        DeliveryCommand::Show { id } => {
            to_json(&service.get_notification(&NotificationId(id)).await?)
        }
        DeliveryCommand::History { user, limit } => {
            to_json(&service.notifications_for_user(&user, limit).await?)
        }
        DeliveryCommand::ClearHistory { user } => {
            let deleted = service.delete_notifications_for_user(&user).await?;
            Ok(json!({ "user_id": user, "deleted": deleted }))
        }
        DeliveryCommand::Pause { user } => {
            let changed = service.pause(&user).await?;
            Ok(json!({ "user_id": user, "paused": changed }))
        }
        DeliveryCommand::Unpause { user } => {
            service.unpause(&user).await?;
            Ok(json!({ "user_id": user, "paused": false }))
        }
        DeliveryCommand::User { user } => to_json(&service.user_status(&user).await?),
        DeliveryCommand::Shutdown => {
            let outcome = service.shutdown().await?;
            let message = outcome.message();
            Ok(match outcome {
                ShutdownOutcome::Stopped => json!({ "outcome": "stopped", "message": message }),
                ShutdownOutcome::Draining { sender_ids } => json!({
                    "outcome": "draining",
                    "sender_ids": sender_ids,
                    "message": message,
                }),
            })
        }
        DeliveryCommand::Restart => {
            let restarted = service.restart().await?;
            let message = if restarted {
                "success"
            } else {
                "senders are still running; wait for them to finish and restart again"
            };
            Ok(json!({ "restarted": restarted, "message": message }))
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, BeaconError> {
    serde_json::to_value(value).map_err(BeaconError::serialization)
}
