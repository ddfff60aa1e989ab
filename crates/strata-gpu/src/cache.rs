//! Byte-budgeted cache of per-geometry derived data.
//!
//! Entries are keyed by `GeometryBuffer::unique_id`, which never repeats
//! within a process, so a cached value cannot be confused with data derived
//! from a different buffer. Volatile geometry is expected to be drawn once and
//! is never retained.

use core::num::NonZeroU32;
use std::collections::HashMap;

use strata_geometry::GeometryBuffer;

/// Cache sizing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Upper bound on the summed `approximate_size` of cached geometry.
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_bytes: 32 * 1024 * 1024 }
    }
}

struct Entry<T> {
    value: T,
    size_bytes: usize,
    last_access: u64,
}

/// LRU cache from geometry identity to a value derived from it (typically a
/// [`GpuGeometry`](crate::device::GpuGeometry)).
pub struct GeometryCache<T> {
    config: CacheConfig,
    entries: HashMap<NonZeroU32, Entry<T>>,
    current_bytes: usize,
    access_counter: u64,
}

impl<T> GeometryCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            current_bytes: 0,
            access_counter: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed `approximate_size` of the geometry behind cached entries.
    #[inline]
    pub fn current_bytes(&self) -> usize {
        self.current_bytes
    }

    #[inline]
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn contains(&self, id: NonZeroU32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Looks up `id` and marks it most recently used.
    pub fn get(&mut self, id: NonZeroU32) -> Option<&T> {
        self.touch(id);
        self.entries.get(&id).map(|e| &e.value)
    }

    /// Stores `value` for `geometry`, evicting older entries to stay in budget.
    ///
    /// Returns false (and drops `value`) for volatile geometry or geometry
    /// larger than the whole budget.
    pub fn insert(&mut self, geometry: &GeometryBuffer, value: T) -> bool {
        self.try_insert(geometry, value).is_ok()
    }

    /// Returns the cached value for `geometry`, creating it with `make` on a miss.
    ///
    /// Volatile geometry is never stored, so `make` runs on every call and the
    /// value is handed back to the caller instead.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        geometry: &GeometryBuffer,
        make: impl FnOnce(&GeometryBuffer) -> Result<T, E>,
    ) -> Result<Lookup<'_, T>, E> {
        let id = geometry.unique_id();
        if !self.contains(id) {
            let value = make(geometry)?;
            if let Err(value) = self.try_insert(geometry, value) {
                return Ok(Lookup::Uncached(value));
            }
        }
        self.touch(id);
        Ok(Lookup::Cached(&self.entries[&id].value))
    }

    pub fn remove(&mut self, id: NonZeroU32) -> Option<T> {
        let entry = self.entries.remove(&id)?;
        self.current_bytes -= entry.size_bytes;
        Some(entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_bytes = 0;
    }

    /// Hands `value` back when it must not be retained.
    fn try_insert(&mut self, geometry: &GeometryBuffer, value: T) -> Result<(), T> {
        if geometry.is_volatile() {
            return Err(value);
        }
        let size_bytes = geometry.approximate_size();
        if size_bytes > self.config.max_bytes {
            log::debug!(
                "geometry cache: {} ({size_bytes} bytes) exceeds budget of {} bytes",
                geometry.unique_id(),
                self.config.max_bytes
            );
            return Err(value);
        }

        self.remove(geometry.unique_id());
        self.evict_lru(size_bytes);

        let last_access = self.tick();
        self.entries.insert(geometry.unique_id(), Entry { value, size_bytes, last_access });
        self.current_bytes += size_bytes;
        Ok(())
    }

    fn touch(&mut self, id: NonZeroU32) {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.last_access = tick;
        }
    }

    fn tick(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    /// Evicts least recently used entries until `needed_bytes` more fit.
    fn evict_lru(&mut self, needed_bytes: usize) {
        if self.current_bytes + needed_bytes <= self.config.max_bytes {
            return;
        }

        let mut by_age: Vec<(u64, NonZeroU32)> =
            self.entries.iter().map(|(id, e)| (e.last_access, *id)).collect();
        by_age.sort_unstable_by_key(|&(access, _)| access);

        for (_, id) in by_age {
            if self.current_bytes + needed_bytes <= self.config.max_bytes {
                break;
            }
            if let Some(entry) = self.entries.remove(&id) {
                self.current_bytes -= entry.size_bytes;
                log::debug!("geometry cache: evicted {id} ({} bytes)", entry.size_bytes);
            }
        }
    }
}

impl<T> Default for GeometryCache<T> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Result of [`GeometryCache::get_or_try_insert_with`].
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Cached(&'a T),
    /// Value built for volatile or oversized geometry; not retained.
    Uncached(T),
}

impl<T> Lookup<'_, T> {
    pub fn get(&self) -> &T {
        match self {
            Lookup::Cached(v) => v,
            Lookup::Uncached(v) => v,
        }
    }
}
