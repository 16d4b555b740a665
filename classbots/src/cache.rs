//! Process-local TTL cache with tag-based invalidation.
//!
//! Entries expire after a fixed TTL and the cache holds at most `max_capacity` entries.
//! Every entry carries a set of tags; [`TaggedCache::invalidate_tag`] drops all entries
//! carrying a tag. Room lookups are cached under their code and tagged with the room id,
//! so any update or delete of a room clears every cached view of it.
//!
//! The cache is best-effort and not shared between processes. It is constructed once in
//! [`Application::new`](crate::Application::new) and handed to handlers through
//! [`AppState`](crate::AppState).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;

use crate::config::CacheConfig;

#[derive(Clone)]
struct Entry<V> {
    value: V,
    tags: Arc<[String]>,
    // Matches the generation recorded in the tag index while this entry is current
    generation: u64,
}

// tag -> (key -> generation of the entry that registered it)
type TagIndex = DashMap<String, HashMap<String, u64>>;

/// TTL cache keyed by string with tag invalidation
#[derive(Clone)]
pub struct TaggedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: Cache<String, Entry<V>>,
    index: Arc<TagIndex>,
    next_generation: Arc<AtomicU64>,
}

impl<V> TaggedCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let index: Arc<TagIndex> = Arc::new(DashMap::new());

        let listener_index = index.clone();
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .eviction_listener(move |key: Arc<String>, entry: Entry<V>, _cause| {
                // Whatever the cause, a newer insert of the same key owns the registration
                for tag in entry.tags.iter() {
                    if let Some(mut keys) = listener_index.get_mut(tag) {
                        if keys.get(key.as_str()) == Some(&entry.generation) {
                            keys.remove(key.as_str());
                        }
                    }
                    listener_index.remove_if(tag, |_, keys| keys.is_empty());
                }
            })
            .build();

        Self {
            entries,
            index,
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl, config.max_capacity)
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    pub async fn insert(&self, key: impl Into<String>, value: V, tags: Vec<String>) {
        let key = key.into();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        for tag in &tags {
            self.index.entry(tag.clone()).or_default().insert(key.clone(), generation);
        }
        self.entries
            .insert(
                key,
                Entry {
                    value,
                    tags: tags.into(),
                    generation,
                },
            )
            .await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Drop every entry tagged with `tag`, returning how many keys were registered under it
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let Some((_, keys)) = self.index.remove(tag) else {
            return 0;
        };
        for key in keys.keys() {
            self.entries.invalidate(key).await;
        }
        tracing::debug!(tag, count = keys.len(), "Invalidated cache tag");
        keys.len()
    }
}
