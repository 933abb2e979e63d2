// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT session using mockforge-mqtt.

use std::sync::Arc;
use std::time::Duration;

use merosync::error::ProtocolError;
use merosync::protocol::MqttSession;
use merosync::{Manager, ReconnectionPolicy, StaticDirectory, Transport};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18850);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to bind and accept connections
    sleep(Duration::from_millis(500)).await;
}

fn session(port: u16, client_id: &str) -> MqttSession {
    MqttSession::builder()
        .host("127.0.0.1")
        .port(port)
        .client_id(client_id)
        .connection_timeout(Duration::from_secs(2))
        .reconnection(ReconnectionPolicy::disabled())
        .build()
        .unwrap()
}

// ============================================================================
// Session Tests
// ============================================================================

mod session_lifecycle {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let session = session(port, "merosync_connect");
        let result = session.connect().await;

        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
        assert!(session.is_connected());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let session = session(port, "merosync_twice");
        let _inbound = session.connect().await.unwrap();

        let again = session.connect().await;
        assert!(matches!(again, Err(ProtocolError::ConnectionFailed(_))));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn subscriptions_are_tracked_once() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let session = session(port, "merosync_subscribe");
        let _inbound = session.connect().await.unwrap();

        let topics = vec![
            "/app/merosync_subscribe/subscribe".to_string(),
            "/appliance/0123456789abcdef/publish".to_string(),
        ];
        session.subscribe(&topics).await.unwrap();
        session.subscribe(&topics[..1]).await.unwrap();
        assert_eq!(session.subscription_count(), 2);

        session.close().await.unwrap();
        assert_eq!(session.subscription_count(), 0);
    }

    #[tokio::test]
    async fn publish_after_close_fails_fast() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let session = session(port, "merosync_publish");
        let _inbound = session.connect().await.unwrap();
        session
            .publish("/appliance/0123456789abcdef/subscribe", "{}".to_string())
            .await
            .unwrap();

        session.close().await.unwrap();
        assert!(!session.is_connected());
        let result = session
            .publish("/appliance/0123456789abcdef/subscribe", "{}".to_string())
            .await;
        assert!(matches!(result, Err(ProtocolError::NotConnected)));

        // Closing again is a no-op.
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_broker_fails_to_connect() {
        // Nothing listens on this port.
        let port = get_test_port();

        let session = session(port, "merosync_refused");
        let result = session.connect().await;

        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
        assert!(!session.is_connected());
    }
}

// ============================================================================
// Manager Tests
// ============================================================================
//
// NOTE: The mockforge-mqtt broker does not forward messages between
// clients, so command round trips are covered by the in-memory broker
// tests (spray_scenario.rs, push_convergence.rs, manager_lifecycle.rs).

mod manager_over_mqtt {
    use super::*;

    #[tokio::test]
    async fn init_and_close() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let manager = Manager::builder(
            Arc::new(session(port, "merosync_manager")),
            Arc::new(StaticDirectory::new(Vec::new())),
        )
        .client_id("merosync_manager")
        .build();

        manager.init().await.unwrap();
        assert!(manager.is_initialized());
        assert!(manager.is_connected());
        assert!(manager.discover().await.unwrap().is_empty());

        manager.close().await.unwrap();
        assert!(!manager.is_connected());
    }
}
