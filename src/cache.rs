//! Session-scoped memo of decoded API responses, keyed by request URL.
//!
//! Chapter and verse data is static reference content, so entries never
//! expire and are never evicted. Only successful fetches are stored.
//!
//! Two callers racing on the same uncached key both hit the network; the
//! second result simply overwrites the first with an identical value.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Return the stored value for `key`, or run `fetch` and store its
    /// result if it succeeds.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.get(key) {
            debug!(%key, "cache hit");
            return Ok(hit);
        }
        debug!(%key, "cache miss");

        // lock is not held across the fetch
        let value = fetch().await?;
        self.entries.lock().insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[tokio::test]
    async fn second_lookup_is_served_from_memory() {
        let cache = ResponseCache::new();
        let counter = Cell::new(0);
        let calls = &counter;
        let fetch = || async move {
            calls.set(calls.get() + 1);
            Ok::<_, ()>(json!({ "chapters": [] }))
        };

        let a = cache.get_or_fetch("k", fetch).await.unwrap();
        let b = cache.get_or_fetch("k", fetch).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_stored() {
        let cache = ResponseCache::new();
        let counter = Cell::new(0);
        let calls = &counter;

        let err = cache
            .get_or_fetch("k", || async move {
                calls.set(calls.get() + 1);
                Err::<Value, _>("boom")
            })
            .await;
        assert_eq!(err, Err("boom"));
        assert!(cache.is_empty());

        let ok = cache
            .get_or_fetch("k", || async move {
                calls.set(calls.get() + 1);
                Ok::<_, &str>(json!(1))
            })
            .await;
        assert_eq!(ok, Ok(json!(1)));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = ResponseCache::new();
        cache.get_or_fetch("a", || async { Ok::<_, ()>(json!("a")) }).await.unwrap();
        cache.get_or_fetch("b", || async { Ok::<_, ()>(json!("b")) }).await.unwrap();
        assert_eq!(cache.get("a"), Some(json!("a")));
        assert_eq!(cache.get("b"), Some(json!("b")));
        assert_eq!(cache.get("c"), None);
    }
}
