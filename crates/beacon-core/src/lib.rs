// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Beacon push delivery service.
//!
//! This crate provides the domain types, the error taxonomy and the push
//! gateway trait used throughout the Beacon workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BeaconError;
pub use traits::PushGateway;
pub use types::{
    CoordinatorRecord, GatewayResponse, Notification, NotificationFields, NotificationId,
    NotificationState, NotificationStatus, PushMessage, PushTicket, PushToken, SenderId,
    SenderRecord, ServiceState, ShutdownOutcome, TaskId, TaskStatus, TicketStatus, UserStatus,
};
