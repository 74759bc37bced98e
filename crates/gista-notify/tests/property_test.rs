//! Property-based tests for retry accounting and request construction.
//!
//! Runs the client over the in-memory transport so each case is fast and
//! deterministic.

#![allow(clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use gista_core::{ProductionStatus, TestClock};
use gista_notify::{
    transport::mock::MockTransport, ClientConfig, NotificationClient, NotifyError,
    TransportError,
};
use proptest::prelude::*;
use serde_json::json;

fn client(max_retries: u32, transport: &MockTransport, clock: &TestClock) -> NotificationClient {
    let config = ClientConfig {
        max_retries,
        retry_delay: Duration::from_millis(500),
        ..ClientConfig::new("https://crew.example.com", "k")
    };
    NotificationClient::with_transport(config, Arc::new(transport.clone()), Arc::new(clock.clone()))
        .unwrap()
}

fn transport_error() -> impl Strategy<Value = TransportError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(TransportError::network),
        (1u64..60_000).prop_map(TransportError::timeout),
        (400u16..600, "[a-z]{0,10}").prop_map(|(code, body)| TransportError::status(code, body)),
        "[a-z ]{1,20}".prop_map(TransportError::decode),
    ]
}

proptest! {
    /// N failures followed by success within budget costs exactly N+1 calls
    /// and N sleeps.
    #[test]
    fn recovers_within_budget(max_retries in 1u32..6, seed in any::<u32>(), error in transport_error()) {
        let failures = seed % max_retries;
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let transport = MockTransport::failing_then(
                failures as usize,
                error,
                json!({"link": "https://x.com/a"}),
            );
            let clock = TestClock::new();

            let result = client(max_retries, &transport, &clock)
                .notify_status_change_strict("u1", "g1")
                .await;

            prop_assert!(result.is_ok());
            prop_assert_eq!(transport.call_count(), failures as usize + 1);
            prop_assert_eq!(clock.sleeps().len(), failures as usize);
            Ok(())
        })?;
    }

    /// Persistent failure costs exactly `max_retries` calls, and both result
    /// shapes report it.
    #[test]
    fn exhausts_budget_exactly(max_retries in 1u32..6, error in transport_error()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let transport = MockTransport::always_failing(error.clone());
            let clock = TestClock::new();
            let client = client(max_retries, &transport, &clock);

            let strict = client.notify_status_change_strict("u1", "g1").await;
            match strict {
                Err(NotifyError::RetryExhausted { attempts, last_error, .. }) => {
                    prop_assert_eq!(attempts, max_retries);
                    prop_assert_eq!(last_error, error);
                },
                other => prop_assert!(false, "expected exhausted retries, got {:?}", other),
            }
            prop_assert_eq!(transport.call_count(), max_retries as usize);

            let soft = client.notify_status_change("u1", "g1").await;
            prop_assert!(!soft.is_delivered());
            prop_assert_eq!(transport.call_count(), 2 * max_retries as usize);
            Ok(())
        })?;
    }

    /// Identifiers land in the path verbatim between single slashes.
    #[test]
    fn status_path_embeds_identifiers(user_id in "[A-Za-z0-9_-]{1,24}", gist_id in "[A-Za-z0-9_-]{1,24}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let transport = MockTransport::responding_with(|_| Ok(json!({})));
            let clock = TestClock::new();

            client(3, &transport, &clock).notify_status_change(&user_id, &gist_id).await;

            let url = transport.requests()[0].url.clone();
            prop_assert_eq!(
                url,
                format!("https://crew.example.com/api/gists/{user_id}/{gist_id}/status")
            );
            Ok(())
        })?;
    }

    /// The batch payload always carries one of the three known statuses.
    #[test]
    fn batch_status_always_valid(status in ".{0,16}", in_production in any::<bool>()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let transport = MockTransport::responding_with(|_| Ok(json!({})));
            let clock = TestClock::new();

            client(1, &transport, &clock)
                .batch_notify("u1", &["g1".to_string()], in_production, &status)
                .await;

            let body = transport.requests()[0].body.clone().unwrap();
            let sent = body["production_status"].as_str().unwrap().to_string();
            prop_assert!(ProductionStatus::ALL.iter().any(|s| s.as_str() == sent));
            if ProductionStatus::ALL.iter().all(|s| s.as_str() != status) {
                prop_assert_eq!(sent, "review");
            }
            prop_assert_eq!(body["inProduction"].as_bool(), Some(in_production));
            Ok(())
        })?;
    }
}
