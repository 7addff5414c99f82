//! One-key in-flight memoization of idempotent writes.
//!
//! Concurrent callers with the same key share a single request. A
//! successful result stays cached for the life of the cache; a failed one
//! is evicted so the next caller tries again.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::ApiError;

type SharedCall = Shared<BoxFuture<'static, Result<(), ApiError>>>;

pub struct InflightCache<K> {
    calls: Mutex<HashMap<K, SharedCall>>,
}

impl<K> Default for InflightCache<K> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> std::fmt::Debug for InflightCache<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.calls.lock().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("InflightCache").field("keys", &len).finish()
    }
}

impl<K> InflightCache<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make()` for `key` unless a call for it is running or succeeded.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Result<(), ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>> + Send + 'static,
    {
        let call = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            calls
                .entry(key.clone())
                .or_insert_with(|| make().boxed().shared())
                .clone()
        };

        let result = call.clone().await;
        if result.is_err() {
            self.evict(&key, &call);
        }
        result
    }

    /// Drop `key` only while it still maps to `call`; a newer call under the
    /// same key stays.
    fn evict(&self, key: &K, call: &SharedCall) {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        if calls.get(key).is_some_and(|current| current.ptr_eq(call)) {
            calls.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
