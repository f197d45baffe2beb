// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Expo push API.
//!
//! The client never retries: whether a batch is retried is decided by the
//! delivery state machine from the outcome this client reports.

use std::time::Duration;

use async_trait::async_trait;
use beacon_config::model::GatewayConfig;
use beacon_core::{BeaconError, GatewayResponse, PushGateway, PushMessage};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::types::SendResponse;

/// Push gateway backed by Expo's HTTP API.
#[derive(Debug, Clone)]
pub struct ExpoGateway {
    client: reqwest::Client,
    url: String,
}

impl ExpoGateway {
    /// Builds a client from the `[gateway]` config section.
    ///
    /// `Accept-Encoding: gzip, deflate` is added by reqwest, which also
    /// decompresses the response.
    pub fn new(config: &GatewayConfig) -> Result<Self, BeaconError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                BeaconError::Config(format!("invalid gateway access token header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BeaconError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl PushGateway for ExpoGateway {
    fn name(&self) -> &str {
        "expo"
    }

    async fn send(&self, messages: &[PushMessage]) -> Result<GatewayResponse, BeaconError> {
        let response = self
            .client
            .post(&self.url)
            .json(messages)
            .send()
            .await
            .map_err(|e| BeaconError::Gateway {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, messages = messages.len(), "push response received");

        // From here on the request reached the gateway; a failure to read or
        // parse the body is an ambiguous outcome, not a transport error.
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(status = %status, error = %e, "failed to read push response body");
                return Ok(GatewayResponse::Rejected {
                    status: status.as_u16(),
                    body: String::new(),
                });
            }
        };

        if !status.is_success() {
            return Ok(GatewayResponse::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<SendResponse>(&body) {
            Ok(parsed) => Ok(GatewayResponse::Accepted(parsed.data)),
            Err(e) => {
                warn!(status = %status, error = %e, "unparseable push response");
                Ok(GatewayResponse::Rejected {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{NotificationFields, PushTicket, TicketStatus};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_gateway(server: &MockServer, access_token: Option<&str>) -> ExpoGateway {
        let config = GatewayConfig {
            url: format!("{}/--/api/v2/push/send", server.uri()),
            access_token: access_token.map(String::from),
            request_timeout_secs: 5,
        };
        ExpoGateway::new(&config).unwrap()
    }

    fn messages() -> Vec<PushMessage> {
        vec![
            PushMessage::render("ExponentPushToken[a]", &NotificationFields::titled("one")),
            PushMessage::render("ExponentPushToken[b]", &NotificationFields::titled("two")),
        ]
    }

    #[tokio::test]
    async fn accepted_response_yields_tickets_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/--/api/v2/push/send"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!([
                {"to": "ExponentPushToken[a]", "title": "one", "sound": "default"},
                {"to": "ExponentPushToken[b]", "title": "two", "sound": "default"}
            ])))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"status": "ok", "id": "ticket-1"},
                    {"status": "error", "message": "DeviceNotRegistered",
                     "details": {"error": "DeviceNotRegistered"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = test_gateway(&server, None).send(&messages()).await.unwrap();
        let GatewayResponse::Accepted(tickets) = response else {
            panic!("expected accepted response, got {response:?}");
        };
        assert_eq!(tickets[0], PushTicket::ok("ticket-1"));
        assert_eq!(tickets[1].status, TicketStatus::Error);
    }

    #[tokio::test]
    async fn server_error_is_rejected_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let response = test_gateway(&server, None).send(&messages()).await.unwrap();
        assert_eq!(
            response,
            GatewayResponse::Rejected {
                status: 500,
                body: "upstream down".into()
            }
        );
    }

    #[tokio::test]
    async fn unparseable_success_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let response = test_gateway(&server, None).send(&messages()).await.unwrap();
        assert!(matches!(response, GatewayResponse::Rejected { status: 200, .. }));
    }

    #[tokio::test]
    async fn access_token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = test_gateway(&server, Some("secret"))
            .send(&messages()[..0])
            .await
            .unwrap();
        assert_eq!(response, GatewayResponse::Accepted(vec![]));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = GatewayConfig {
            url: format!("http://127.0.0.1:{port}/push"),
            access_token: None,
            request_timeout_secs: 2,
        };
        let err = ExpoGateway::new(&config)
            .unwrap()
            .send(&messages())
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::Gateway { .. }));
    }
}
