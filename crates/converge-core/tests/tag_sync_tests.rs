//! Tag synchronization driver tests against a mock tag client.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use converge_core::{sync_tags, BackendError, BackendResult, TagClient};

#[derive(Debug, Default)]
struct MockTagClient {
    calls: Mutex<Vec<String>>,
    fail_remove: bool,
}

impl MockTagClient {
    fn failing_remove() -> Self {
        Self {
            fail_remove: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TagClient for MockTagClient {
    async fn add_or_update_tags(
        &self,
        _resource_ref: &str,
        tags: &BTreeMap<String, String>,
    ) -> BackendResult<()> {
        let keys: Vec<&str> = tags.keys().map(String::as_str).collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("upsert:{}", keys.join(",")));
        Ok(())
    }

    async fn remove_tags(&self, _resource_ref: &str, keys: &[String]) -> BackendResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("remove:{}", keys.join(",")));
        if self.fail_remove {
            return Err(BackendError::api("TooManyRequestsException", "slow down"));
        }
        Ok(())
    }

    async fn list_tags(&self, _resource_ref: &str) -> BackendResult<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }
}

fn tag_map<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn removal_applies_before_upsert() {
    let client = MockTagClient::default();
    let desired = tag_map([("b", "9"), ("c", "3")]);
    let observed = tag_map([("a", "1"), ("b", "2")]);

    sync_tags(&client, "restapis/abc", &desired, &observed)
        .await
        .unwrap();

    assert_eq!(client.calls(), vec!["remove:a", "upsert:b,c"]);
}

#[tokio::test]
async fn remove_failure_prevents_upsert() {
    let client = MockTagClient::failing_remove();
    let desired = tag_map([("b", "9")]);
    let observed = tag_map([("a", "1"), ("b", "2")]);

    let err = sync_tags(&client, "restapis/abc", &desired, &observed)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("TooManyRequestsException"));
    assert_eq!(client.calls(), vec!["remove:a"], "upsert must not run");
}

#[tokio::test]
async fn synced_tags_perform_no_calls() {
    let client = MockTagClient::default();
    let tags = tag_map([("env", "prod")]);

    sync_tags(&client, "restapis/abc", &tags, &tags.clone())
        .await
        .unwrap();

    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn upsert_only_skips_the_remove_call() {
    let client = MockTagClient::default();
    let desired = tag_map([("env", "prod"), ("team", "platform")]);
    let observed = tag_map([("env", "prod")]);

    sync_tags(&client, "restapis/abc", &desired, &observed)
        .await
        .unwrap();

    assert_eq!(client.calls(), vec!["upsert:team"]);
}
