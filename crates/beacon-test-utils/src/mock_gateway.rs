// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock push gateway for deterministic testing.
//!
//! `MockGateway` implements `PushGateway` with scripted replies, so sender
//! behaviour can be exercised without calling the Expo service.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use beacon_core::{BeaconError, GatewayResponse, PushGateway, PushMessage, PushTicket};

/// One scripted gateway reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 2xx with exactly these tickets, regardless of the request length.
    Tickets(Vec<PushTicket>),
    /// 2xx with one `ok` ticket per message.
    AcceptAll,
    /// A non-2xx response.
    Reject { status: u16, body: String },
    /// The request never completed.
    Transport(String),
}

/// A mock push gateway that replays scripted replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty every
/// message is accepted.
pub struct MockGateway {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<Vec<PushMessage>>>>,
}

impl MockGateway {
    /// Create a gateway that accepts everything.
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    /// Create a gateway pre-loaded with the given replies.
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a reply to the end of the queue.
    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<Vec<PushMessage>> {
        self.requests.lock().await.clone()
    }

    /// Number of gateway calls made.
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Titles of every message sent, across all requests.
    pub async fn sent_titles(&self) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .flatten()
            .map(|message| message.title.clone())
            .collect()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, messages: &[PushMessage]) -> Result<GatewayResponse, BeaconError> {
        self.requests.lock().await.push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(MockReply::AcceptAll);

        match reply {
            MockReply::Tickets(tickets) => Ok(GatewayResponse::Accepted(tickets)),
            MockReply::AcceptAll => Ok(GatewayResponse::Accepted(
                (0..messages.len())
                    .map(|idx| PushTicket::ok(format!("ticket-{idx}")))
                    .collect(),
            )),
            MockReply::Reject { status, body } => Ok(GatewayResponse::Rejected { status, body }),
            MockReply::Transport(message) => Err(BeaconError::Gateway {
                message,
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::{NotificationFields, TicketStatus};

    use super::*;

    fn message(title: &str) -> PushMessage {
        PushMessage::render("ExponentPushToken[t]", &NotificationFields::titled(title))
    }

    #[tokio::test]
    async fn replies_are_replayed_in_order_then_accept_all() {
        let gateway = MockGateway::with_replies(vec![
            MockReply::Transport("down".into()),
            MockReply::Reject {
                status: 503,
                body: "busy".into(),
            },
        ]);
        let batch = [message("a"), message("b")];

        assert!(gateway.send(&batch).await.is_err());
        assert_eq!(
            gateway.send(&batch).await.unwrap(),
            GatewayResponse::Rejected {
                status: 503,
                body: "busy".into()
            }
        );
        match gateway.send(&batch).await.unwrap() {
            GatewayResponse::Accepted(tickets) => {
                assert_eq!(tickets.len(), 2);
                assert!(tickets.iter().all(|t| t.status == TicketStatus::Ok));
            }
            other => panic!("expected accepted, got {other:?}"),
        }
        assert_eq!(gateway.call_count().await, 3);
    }

    #[tokio::test]
    async fn records_sent_titles() {
        let gateway = MockGateway::new();
        gateway.send(&[message("one")]).await.unwrap();
        gateway.send(&[message("two"), message("three")]).await.unwrap();
        assert_eq!(gateway.sent_titles().await, ["one", "two", "three"]);
    }
}
