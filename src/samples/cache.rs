// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The cache facade: open/close/budget under one lock.

use std::fs;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::eviction::{self, EvictionPlan};
use super::registry::{ResidentSample, SampleRegistry};
use super::{OpenRequest, SampleHandle};
use crate::config::CacheConfig;
use crate::decode::{self, DecodeError};
use crate::playback::Playback;
use crate::util::filename_display;

/// Why a miss failed to produce a handle. Never crosses the public boundary;
/// the facade logs it and returns the sentinel.
#[derive(Debug, thiserror::Error)]
enum OpenError {
    #[error("Budget exhausted: {shortfall} bytes short after eviction sweep")]
    ResourceExhausted { shortfall: usize },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Failed to read sample file: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic counters. Snapshot of relaxed atomics; values may lag the
/// locked state and are never used to drive eviction.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Opens served from a resident buffer.
    pub hits: u64,
    /// Opens that had to decode.
    pub misses: u64,
    /// Resident samples sacrificed under memory pressure.
    pub evictions: u64,
    /// Opens abandoned because the shortfall could not be covered, the bytes
    /// were undecodable, or the file was unreadable.
    pub rejections: u64,
    /// Resident sample count.
    pub resident: usize,
    /// Resident byte total.
    pub used_bytes: usize,
    /// Configured budget in bytes.
    pub max_bytes: usize,
}

/// Registry and byte accounting, guarded by the facade's one mutex. The
/// facade is the sole mutator.
struct CacheState {
    registry: SampleRegistry,
    used_bytes: usize,
    max_bytes: usize,
    shut_down: bool,
}

/// The bounded-memory sample cache.
///
/// Sits between audio-event dispatch and the mixing layer: dispatch opens and
/// closes samples by filename, the mixer reads the shared buffers and is told
/// to stop voices whose buffer is about to be reclaimed. One instance is
/// owned by the audio subsystem and shared by reference; there is no global.
///
/// Every mutating operation takes the internal mutex for its full duration,
/// so any interleaving of opens and closes across threads keeps the byte
/// accounting exact. Exhausted budget and undecodable assets degrade to
/// silence for that one request; nothing panics across this boundary.
pub struct SampleCache {
    state: Mutex<CacheState>,
    playback: Arc<dyn Playback>,
    // Relaxed mirrors of the locked state for diagnostic reads.
    used_bytes: AtomicUsize,
    max_bytes: AtomicUsize,
    resident: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rejections: AtomicU64,
}

impl SampleCache {
    /// Creates a cache with the given byte budget.
    pub fn new(max_bytes: usize, playback: Arc<dyn Playback>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                registry: SampleRegistry::new(),
                used_bytes: 0,
                max_bytes,
                shut_down: false,
            }),
            playback,
            used_bytes: AtomicUsize::new(0),
            max_bytes: AtomicUsize::new(max_bytes),
            resident: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &CacheConfig, playback: Arc<dyn Playback>) -> Self {
        Self::new(config.max_bytes(), playback)
    }

    /// Opens a sample for playback.
    ///
    /// Returns the shared buffer handle, or `None` when there is nothing to
    /// play: an empty clip segment, an undecodable or unreadable asset, or a
    /// budget shortfall that eviction could not cover. Failures are logged;
    /// the caller just skips the sound.
    pub fn open(&self, request: &OpenRequest) -> Option<SampleHandle> {
        if request.empty_segment() {
            debug!(
                file = filename_display(request.path()),
                "Open of empty clip segment, nothing to play"
            );
            return None;
        }

        let mut state = self.state.lock();
        if state.shut_down {
            warn!(
                file = filename_display(request.path()),
                "Open after cache shutdown"
            );
            return None;
        }

        // Hit: share the resident buffer, no decode, no budget check.
        if let Some(entry) = state.registry.find_mut(request.path()) {
            entry.open_count += 1;
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(
                file = filename_display(request.path()),
                open_count = entry.open_count,
                "Sample cache hit"
            );
            return Some(SampleHandle::new(entry.buffer.clone()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match self.open_miss(&mut state, request) {
            Ok(handle) => Some(handle),
            Err(err) => {
                self.rejections.fetch_add(1, Ordering::Relaxed);
                match err {
                    OpenError::ResourceExhausted { .. } => warn!(
                        file = filename_display(request.path()),
                        priority = request.priority(),
                        error = %err,
                        "Sample skipped"
                    ),
                    _ => error!(
                        file = filename_display(request.path()),
                        error = %err,
                        "Sample skipped"
                    ),
                }
                None
            }
        }
    }

    /// Miss path: read, decode, make room, insert.
    fn open_miss(
        &self,
        state: &mut CacheState,
        request: &OpenRequest,
    ) -> Result<SampleHandle, OpenError> {
        let bytes = fs::read(request.path())?;
        let buffer = decode::decode(bytes, request.require_mono())?;
        let size = buffer.size_bytes();

        if state.used_bytes + size > state.max_bytes {
            let shortfall = state.used_bytes + size - state.max_bytes;
            let plan = eviction::plan(&state.registry, shortfall, request.priority())
                .ok_or(OpenError::ResourceExhausted { shortfall })?;
            // The just-decoded buffer is dropped by `?` above when the plan
            // fails; nothing has been inserted yet.
            self.apply_eviction(state, plan);
        }

        let buffer = Arc::new(buffer);
        state.registry.insert(
            request.path().to_path_buf(),
            ResidentSample::new(buffer.clone(), request.priority()),
        );
        state.used_bytes += size;
        self.mirror(state);

        info!(
            file = filename_display(request.path()),
            size,
            used = state.used_bytes,
            max = state.max_bytes,
            "Sample resident"
        );
        Ok(SampleHandle::new(buffer))
    }

    /// Applies an eviction plan: force-stop, release, subtract, in order.
    fn apply_eviction(&self, state: &mut CacheState, plan: EvictionPlan) {
        for path in plan.victims {
            if let Some(entry) = state.registry.remove(&path) {
                self.playback.force_stop(&entry.buffer);
                state.used_bytes -= entry.size;
                self.evictions.fetch_add(1, Ordering::Relaxed);
                info!(
                    file = filename_display(&path),
                    size = entry.size,
                    open_count = entry.open_count,
                    "Evicted resident sample"
                );
                // The registry's share drops here. A voice still holding the
                // buffer keeps the bytes alive until it stops.
            }
        }
        self.mirror(state);
    }

    /// Releases one playback instance's use of a sample.
    ///
    /// A handle that matches no resident entry, or an entry already at zero,
    /// is a caller bookkeeping defect: logged and tolerated, shared state is
    /// left intact. Close never evicts; reclaiming happens lazily on a
    /// future open.
    pub fn close(&self, handle: &SampleHandle) {
        let mut state = self.state.lock();
        match state.registry.find_by_buffer_mut(handle.buffer()) {
            Some((path, entry)) => {
                if entry.open_count == 0 {
                    error!(
                        file = filename_display(path),
                        "Close on sample with zero open count"
                    );
                    return;
                }
                entry.open_count -= 1;
                debug!(
                    file = filename_display(path),
                    open_count = entry.open_count,
                    "Sample closed"
                );
            }
            None => {
                error!("Close on a buffer not resident in the cache");
            }
        }
    }

    /// Updates the byte budget. Never evicts retroactively; an over-budget
    /// cache shrinks as future opens force eviction.
    pub fn set_max_bytes(&self, max_bytes: usize) {
        let mut state = self.state.lock();
        info!(from = state.max_bytes, to = max_bytes, "Cache budget changed");
        state.max_bytes = max_bytes;
        self.max_bytes.store(max_bytes, Ordering::Relaxed);
    }

    /// Releases every resident sample and empties the registry.
    ///
    /// Entries still open are a caller bug: diagnosed, force-stopped, then
    /// released like the rest. Idempotent; later opens are refused.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        self.shutdown_locked(&mut state);
    }

    fn shutdown_locked(&self, state: &mut CacheState) {
        if state.shut_down {
            return;
        }
        state.shut_down = true;

        let entries = state.registry.drain();
        let count = entries.len();
        for (path, entry) in entries {
            if entry.open_count > 0 {
                warn!(
                    file = filename_display(&path),
                    open_count = entry.open_count,
                    "Sample still open at cache shutdown"
                );
                self.playback.force_stop(&entry.buffer);
            }
        }
        state.used_bytes = 0;
        self.mirror(state);
        if count > 0 {
            info!(released = count, "Sample cache shut down");
        }
    }

    /// Resident byte total. Diagnostic only: unsynchronized, may lag the
    /// authoritative locked value.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes.load(Ordering::Relaxed)
    }

    /// Configured budget in bytes. Diagnostic only, like [`used_bytes`].
    ///
    /// [`used_bytes`]: SampleCache::used_bytes
    pub fn max_bytes(&self) -> usize {
        self.max_bytes.load(Ordering::Relaxed)
    }

    /// Snapshot of the diagnostic counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            resident: self.resident.load(Ordering::Relaxed),
            used_bytes: self.used_bytes.load(Ordering::Relaxed),
            max_bytes: self.max_bytes.load(Ordering::Relaxed),
        }
    }

    /// Refreshes the relaxed mirrors from the locked state.
    fn mirror(&self, state: &CacheState) {
        self.used_bytes.store(state.used_bytes, Ordering::Relaxed);
        self.resident.store(state.registry.len(), Ordering::Relaxed);
    }
}

impl Drop for SampleCache {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        self.shutdown_locked(&mut state);
    }
}

impl std::fmt::Debug for SampleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleCache")
            .field("resident", &self.resident.load(Ordering::Relaxed))
            .field("used_bytes", &self.used_bytes.load(Ordering::Relaxed))
            .field("max_bytes", &self.max_bytes.load(Ordering::Relaxed))
            .finish()
    }
}
