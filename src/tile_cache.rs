//! Tile texture cache with LRU eviction.
//!
//! The cache only tracks bookkeeping; textures are created and destroyed by
//! the engine through its render backend. Every id handed back from
//! [`TileCache::evict`] or [`TileCache::drain`] must be destroyed by the caller.
//!
//! A tile that is still loading lives only in the pending set. Its entry is
//! created by [`TileCache::insert`] once the texture is uploaded, so every
//! entry is drawable.

use std::collections::{HashMap, HashSet};

use tileview_gpu::TextureId;
use web_time::Instant;

use crate::constants::EVICTION_SLACK_DIVISOR;
use crate::lod::{TileKey, VisibleTile};

/// One cached tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileInfo {
    pub texture: TextureId,
    pub last_used: Instant,
    /// Distance from the viewport centre when last visible.
    pub priority: f64,
}

/// Outcome of one visibility update.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheUpdate {
    /// Keys newly marked pending, to be sent to the worker.
    pub requests: Vec<TileKey>,
    pub evicted: Vec<TextureId>,
}

#[derive(Debug)]
pub struct TileCache {
    entries: HashMap<TileKey, TileInfo>,
    /// Requested from the worker, no entry yet.
    pending: HashSet<TileKey>,
    /// Current visible set; pinned against eviction.
    visible: HashSet<TileKey>,
    max_cached: usize,
}

impl TileCache {
    pub fn new(max_cached: usize) -> Self {
        Self {
            entries: HashMap::new(),
            pending: HashSet::new(),
            visible: HashSet::new(),
            max_cached: max_cached.max(1),
        }
    }

    pub fn set_budget(&mut self, max_cached: usize) {
        self.max_cached = max_cached.max(1);
    }

    pub fn budget(&self) -> usize {
        self.max_cached
    }

    /// Replace the visible set, refresh recency of visible cached tiles and
    /// pick at most `max_requests` misses to fetch, nearest first.
    pub fn update_visible(
        &mut self,
        tiles: &[VisibleTile],
        now: Instant,
        max_requests: usize,
    ) -> CacheUpdate {
        self.visible = tiles.iter().map(|t| t.key).collect();

        let mut requests = Vec::new();
        for tile in tiles {
            if let Some(info) = self.entries.get_mut(&tile.key) {
                info.last_used = now;
                info.priority = tile.priority;
            } else if requests.len() < max_requests && self.pending.insert(tile.key) {
                requests.push(tile.key);
            }
        }

        let evicted = self.evict();
        CacheUpdate { requests, evicted }
    }

    /// Register a tile's texture. Returns a texture this replaced, if any.
    pub fn insert(&mut self, key: TileKey, texture: TextureId, now: Instant) -> Option<TextureId> {
        self.pending.remove(&key);
        self.entries
            .insert(
                key,
                TileInfo {
                    texture,
                    last_used: now,
                    priority: 0.0,
                },
            )
            .map(|old| old.texture)
    }

    /// Forget an in-flight request so the tile can be asked for again.
    pub fn cancel_pending(&mut self, key: &TileKey) -> bool {
        self.pending.remove(key)
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Evict non-visible tiles, least recently used first, once the cache is
    /// over budget. Stops at `max_cached - max_cached / 8` or when only
    /// visible tiles remain.
    pub fn evict(&mut self) -> Vec<TextureId> {
        if self.entries.len() <= self.max_cached {
            return Vec::new();
        }
        let target = self.max_cached - self.max_cached / EVICTION_SLACK_DIVISOR;

        let mut candidates: Vec<(TileKey, Instant)> = self
            .entries
            .iter()
            .filter(|(key, _)| !self.visible.contains(key))
            .map(|(key, info)| (*key, info.last_used))
            .collect();
        candidates.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

        let excess = self.entries.len().saturating_sub(target);
        let evicted: Vec<TextureId> = candidates
            .into_iter()
            .take(excess)
            .filter_map(|(key, _)| self.entries.remove(&key))
            .map(|info| info.texture)
            .collect();

        if !evicted.is_empty() {
            log::debug!(
                "Evicted {} tiles, {} cached ({} pinned)",
                evicted.len(),
                self.entries.len(),
                self.visible.len()
            );
        }
        evicted
    }

    /// Drop everything, returning every texture to destroy.
    pub fn drain(&mut self) -> Vec<TextureId> {
        self.pending.clear();
        self.visible.clear();
        self.entries.drain().map(|(_, info)| info.texture).collect()
    }

    pub fn get(&self, key: &TileKey) -> Option<&TileInfo> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_pending(&self, key: &TileKey) -> bool {
        self.pending.contains(key)
    }

    pub fn is_visible(&self, key: &TileKey) -> bool {
        self.visible.contains(key)
    }

    /// Uploaded tiles, any order.
    pub fn ready(&self) -> impl Iterator<Item = (&TileKey, &TileInfo)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }
}
