//! Handle pool - per-key allocation of playback handles
//!
//! Every cached asset owns a fixed set of interchangeable handles. A handle is
//! in use exactly when a sound instance owns it; the pool records that owner
//! per slot, so the in-use flag and the owning reference can never disagree.
//!
//! When no handle is free, the manager may steal one from another instance
//! of the same key (see [`select_victim`]).

use crate::error::{ChannelError, Result};
use crate::handle::PlaybackHandle;
use crate::types::{SoundId, SoundKey};
use std::cmp::Ordering;
use std::collections::HashMap;

struct Slot {
    handle: Box<dyn PlaybackHandle>,
    owner: Option<SoundId>,
}

/// Fixed set of interchangeable handles for one asset
pub struct HandlePool {
    key: SoundKey,
    slots: Vec<Slot>,
}

impl HandlePool {
    pub fn new(key: SoundKey, handles: Vec<Box<dyn PlaybackHandle>>) -> Self {
        Self {
            key,
            slots: handles
                .into_iter()
                .map(|handle| Slot {
                    handle,
                    owner: None,
                })
                .collect(),
        }
    }

    pub fn key(&self) -> &SoundKey {
        &self.key
    }

    /// Total number of handles
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Natural length of the asset, read from the first handle
    pub fn duration(&self) -> f64 {
        self.slots.first().map_or(0.0, |slot| slot.handle.duration())
    }

    /// First slot not owned by any instance
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.owner.is_none())
    }

    /// Number of slots currently owned
    pub fn in_use_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.owner.is_some()).count()
    }

    pub fn is_in_use(&self, slot: usize) -> bool {
        self.owner(slot).is_some()
    }

    pub fn owner(&self, slot: usize) -> Option<SoundId> {
        self.slots.get(slot).and_then(|s| s.owner)
    }

    pub fn handle(&self, slot: usize) -> Option<&dyn PlaybackHandle> {
        self.slots.get(slot).map(|s| s.handle.as_ref())
    }

    pub fn handle_mut(&mut self, slot: usize) -> Option<&mut (dyn PlaybackHandle + 'static)> {
        self.slots.get_mut(slot).map(|s| s.handle.as_mut())
    }

    /// Mark a free slot as owned by `owner`
    ///
    /// Returns false if the slot does not exist or is already owned.
    pub fn claim(&mut self, slot: usize, owner: SoundId) -> bool {
        match self.slots.get_mut(slot) {
            Some(s) if s.owner.is_none() => {
                s.owner = Some(owner);
                true
            }
            _ => false,
        }
    }

    /// Hand an owned slot directly to a new owner, without freeing it
    pub fn transfer(&mut self, slot: usize, new_owner: SoundId) -> Option<SoundId> {
        let s = self.slots.get_mut(slot)?;
        let previous = s.owner?;
        s.owner = Some(new_owner);
        Some(previous)
    }

    /// Pause the slot's native playback and mark it free
    pub fn release(&mut self, slot: usize) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.handle.pause();
            s.owner = None;
        }
    }
}

/// Asset cache: the handle pools of every loaded key
#[derive(Default)]
pub struct AudioCache {
    pools: HashMap<SoundKey, HandlePool>,
}

impl AudioCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handles of a loaded asset
    pub fn insert(
        &mut self,
        key: impl Into<SoundKey>,
        handles: Vec<Box<dyn PlaybackHandle>>,
    ) -> Result<()> {
        let key = key.into();
        if self.pools.contains_key(&key) {
            return Err(ChannelError::DuplicateAsset { key });
        }
        self.pools.insert(key.clone(), HandlePool::new(key, handles));
        Ok(())
    }

    pub fn contains(&self, key: &SoundKey) -> bool {
        self.pools.contains_key(key)
    }

    pub fn get(&self, key: &SoundKey) -> Option<&HandlePool> {
        self.pools.get(key)
    }

    pub fn get_mut(&mut self, key: &SoundKey) -> Option<&mut HandlePool> {
        self.pools.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// An instance that currently owns a handle, considered for preemption
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: SoundId,
    pub looping: bool,
    /// Playback progress, `position / duration`
    pub progress: f64,
}

/// Choose which instance loses its handle
///
/// Non-looping instances go first; among equals, the one closest to finishing
/// (highest progress) is taken. Ties keep the order of `candidates`.
pub fn select_victim(candidates: &[Candidate]) -> Option<SoundId> {
    let mut ordered = candidates.to_vec();
    ordered.sort_by(|a, b| match (a.looping, b.looping) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => progress_key(b.progress)
            .partial_cmp(&progress_key(a.progress))
            .unwrap_or(Ordering::Equal),
    });
    ordered.first().map(|candidate| candidate.id)
}

// Unknown durations yield NaN progress; those rank as not started.
fn progress_key(progress: f64) -> f64 {
    if progress.is_finite() {
        progress
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::VirtualHandle;

    fn pool_of(count: usize) -> (HandlePool, Vec<VirtualHandle>) {
        let handles = VirtualHandle::pool(5.0, count);
        let boxed = handles.iter().map(VirtualHandle::boxed).collect();
        (HandlePool::new(SoundKey::from("hit"), boxed), handles)
    }

    fn candidate(id: u64, looping: bool, progress: f64) -> Candidate {
        Candidate {
            id: SoundId(id),
            looping,
            progress,
        }
    }

    #[test]
    fn claims_first_free_slot() {
        let (mut pool, _) = pool_of(2);
        assert_eq!(pool.free_slot(), Some(0));
        assert!(pool.claim(0, SoundId(1)));
        assert_eq!(pool.free_slot(), Some(1));
        assert!(pool.claim(1, SoundId(2)));
        assert_eq!(pool.free_slot(), None);
        assert_eq!(pool.in_use_count(), 2);
    }

    #[test]
    fn claim_refuses_owned_slot() {
        let (mut pool, _) = pool_of(1);
        assert!(pool.claim(0, SoundId(1)));
        assert!(!pool.claim(0, SoundId(2)));
        assert_eq!(pool.owner(0), Some(SoundId(1)));
        assert!(!pool.claim(5, SoundId(2)));
    }

    #[test]
    fn release_pauses_and_frees() {
        let (mut pool, handles) = pool_of(1);
        pool.claim(0, SoundId(1));
        pool.handle_mut(0).unwrap().play();
        assert!(!handles[0].is_paused());

        pool.release(0);
        assert!(handles[0].is_paused());
        assert!(!pool.is_in_use(0));
    }

    #[test]
    fn transfer_keeps_slot_in_use() {
        let (mut pool, _) = pool_of(1);
        pool.claim(0, SoundId(1));
        assert_eq!(pool.transfer(0, SoundId(2)), Some(SoundId(1)));
        assert_eq!(pool.owner(0), Some(SoundId(2)));
        assert_eq!(pool.in_use_count(), 1);
    }

    #[test]
    fn transfer_of_free_slot_fails() {
        let (mut pool, _) = pool_of(1);
        assert_eq!(pool.transfer(0, SoundId(2)), None);
        assert!(!pool.is_in_use(0));
    }

    #[test]
    fn cache_rejects_duplicate_key() {
        let mut cache = AudioCache::new();
        cache
            .insert("hit", VirtualHandle::pool(1.0, 2).iter().map(VirtualHandle::boxed).collect())
            .unwrap();
        let err = cache.insert("hit", Vec::new()).unwrap_err();
        assert!(matches!(err, ChannelError::DuplicateAsset { .. }));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn pool_duration_from_first_handle() {
        let (pool, _) = pool_of(3);
        assert_eq!(pool.duration(), 5.0);

        let empty = HandlePool::new(SoundKey::from("none"), Vec::new());
        assert_eq!(empty.duration(), 0.0);
        assert!(empty.is_empty());
    }

    #[test]
    fn victim_prefers_non_looping_closest_to_end() {
        let candidates = [
            candidate(1, false, 0.9),
            candidate(2, true, 0.1),
            candidate(3, false, 0.2),
        ];
        assert_eq!(select_victim(&candidates), Some(SoundId(1)));
    }

    #[test]
    fn victim_is_looping_only_when_all_loop() {
        let candidates = [candidate(1, true, 0.3), candidate(2, true, 0.8)];
        assert_eq!(select_victim(&candidates), Some(SoundId(2)));
    }

    #[test]
    fn victim_ties_keep_input_order() {
        let candidates = [candidate(4, false, 0.5), candidate(2, false, 0.5)];
        assert_eq!(select_victim(&candidates), Some(SoundId(4)));
    }

    #[test]
    fn victim_with_unknown_progress_ranks_last() {
        let candidates = [candidate(1, false, f64::NAN), candidate(2, false, 0.1)];
        assert_eq!(select_victim(&candidates), Some(SoundId(2)));
    }

    #[test]
    fn no_candidates_no_victim() {
        assert_eq!(select_victim(&[]), None);
    }
}
