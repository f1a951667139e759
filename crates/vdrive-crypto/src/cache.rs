//! Bounded per-user cache of unlocked content keys
//!
//! Cache capacity is injected at construction and applies per user. Each
//! user's map sits behind its own async mutex, so concurrent uploads for
//! independent users never contend on a shared lock; the outer registry
//! lock is only held long enough to clone the per-user handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::content_key::ContentKey;

pub struct ContentKeyCache {
    capacity: usize,
    users: Mutex<HashMap<String, Arc<AsyncMutex<UserKeys>>>>,
}

#[derive(Default)]
struct UserKeys {
    entries: HashMap<String, Entry>,
    tick: u64,
}

struct Entry {
    key: ContentKey,
    last_used: u64,
}

impl ContentKeyCache {
    /// `capacity` is the max entries kept per user; the least recently used
    /// entry is evicted on overflow.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            users: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: &str, file_id: &str) -> Option<ContentKey> {
        let user = self.user_handle(user_id);
        let mut keys = user.lock().await;
        keys.tick += 1;
        let tick = keys.tick;
        let entry = keys.entries.get_mut(file_id)?;
        entry.last_used = tick;
        Some(entry.key.clone())
    }

    pub async fn insert(&self, user_id: &str, file_id: &str, key: ContentKey) {
        let user = self.user_handle(user_id);
        let mut keys = user.lock().await;
        keys.tick += 1;
        let tick = keys.tick;
        keys.entries
            .insert(file_id.to_string(), Entry { key, last_used: tick });

        while keys.entries.len() > self.capacity {
            let oldest = keys
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| id.clone());
            // non-empty here since len > capacity >= 1
            if let Some(id) = oldest {
                keys.entries.remove(&id);
                debug!(user_id, file_id = %id, "evicted content key");
            }
        }
    }

    pub async fn remove(&self, user_id: &str, file_id: &str) {
        let user = self.user_handle(user_id);
        user.lock().await.entries.remove(file_id);
    }

    pub async fn len(&self, user_id: &str) -> usize {
        let user = self.user_handle(user_id);
        let len = user.lock().await.entries.len();
        len
    }

    pub async fn is_empty(&self, user_id: &str) -> bool {
        self.len(user_id).await == 0
    }

    fn user_handle(&self, user_id: &str) -> Arc<AsyncMutex<UserKeys>> {
        // Registry mutations are infallible, so a poisoned lock is still usable.
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(UserKeys::default())))
            .clone()
    }
}
