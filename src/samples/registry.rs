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

//! Associative storage for resident samples.
//!
//! Pure bookkeeping: the registry carries no eviction policy and no locking.
//! Iteration follows insertion order, which is what keeps the first-fit
//! eviction sweep deterministic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::decode::SampleBuffer;

/// One resident cache entry: a decoded buffer plus the bookkeeping the
/// eviction policy reads.
pub(crate) struct ResidentSample {
    /// The registry's share of the buffer. Voices hold their own clones.
    pub buffer: Arc<SampleBuffer>,
    /// Resident size in bytes, counted against the budget.
    pub size: usize,
    /// Number of live playback instances using the buffer. Never negative by
    /// construction; zero means nothing is reading the buffer.
    pub open_count: u32,
    /// Priority of the request that first made this sample resident.
    pub priority: u32,
}

impl ResidentSample {
    pub fn new(buffer: Arc<SampleBuffer>, priority: u32) -> Self {
        let size = buffer.size_bytes();
        Self {
            buffer,
            size,
            open_count: 1,
            priority,
        }
    }
}

/// Resident samples keyed by the file path that produced them.
#[derive(Default)]
pub(crate) struct SampleRegistry {
    entries: IndexMap<PathBuf, ResidentSample>,
}

impl SampleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, path: &Path) -> Option<&ResidentSample> {
        self.entries.get(path)
    }

    pub fn find_mut(&mut self, path: &Path) -> Option<&mut ResidentSample> {
        self.entries.get_mut(path)
    }

    pub fn insert(&mut self, path: PathBuf, entry: ResidentSample) {
        self.entries.insert(path, entry);
    }

    /// Removes an entry, handing back its bookkeeping so the caller can
    /// release the buffer and adjust the byte total.
    pub fn remove(&mut self, path: &Path) -> Option<ResidentSample> {
        // shift_remove preserves insertion order for the remaining entries.
        self.entries.shift_remove(path)
    }

    /// Finds the entry whose buffer is the given allocation. Identity is
    /// pointer identity, matching how handles refer back to entries.
    pub fn find_by_buffer_mut(
        &mut self,
        buffer: &Arc<SampleBuffer>,
    ) -> Option<(&Path, &mut ResidentSample)> {
        self.entries
            .iter_mut()
            .find(|(_, entry)| Arc::ptr_eq(&entry.buffer, buffer))
            .map(|(path, entry)| (path.as_path(), entry))
    }

    /// Iterates entries in insertion order for administrative scans.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &ResidentSample)> {
        self.entries.iter().map(|(path, entry)| (path.as_path(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry, returning them in insertion order for teardown.
    pub fn drain(&mut self) -> Vec<(PathBuf, ResidentSample)> {
        self.entries.drain(..).collect()
    }

    /// Sum of resident entry sizes. The facade's byte total must equal this
    /// after every mutation; tests check the invariant through it.
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(|entry| entry.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::decoded_pcm_buffer;

    fn entry(samples: usize, priority: u32) -> ResidentSample {
        let data = vec![0i16; samples];
        ResidentSample::new(Arc::new(decoded_pcm_buffer(&data, 1, 22050)), priority)
    }

    #[test]
    fn test_find_insert_remove() {
        let mut registry = SampleRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.find(Path::new("a.wav")).is_none());

        registry.insert(PathBuf::from("a.wav"), entry(100, 5));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find(Path::new("a.wav")).unwrap().open_count, 1);
        assert_eq!(registry.total_bytes(), 200);

        let removed = registry.remove(Path::new("a.wav")).unwrap();
        assert_eq!(removed.size, 200);
        assert!(registry.is_empty());
        assert_eq!(registry.total_bytes(), 0);
    }

    #[test]
    fn test_iteration_order_is_insertion_order() {
        let mut registry = SampleRegistry::new();
        registry.insert(PathBuf::from("c.wav"), entry(10, 1));
        registry.insert(PathBuf::from("a.wav"), entry(10, 1));
        registry.insert(PathBuf::from("b.wav"), entry(10, 1));

        let names: Vec<_> = registry.iter().map(|(path, _)| path.to_path_buf()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("c.wav"),
                PathBuf::from("a.wav"),
                PathBuf::from("b.wav")
            ]
        );

        // Removal keeps the order of the survivors.
        registry.remove(Path::new("a.wav"));
        let names: Vec<_> = registry.iter().map(|(path, _)| path.to_path_buf()).collect();
        assert_eq!(names, vec![PathBuf::from("c.wav"), PathBuf::from("b.wav")]);
    }

    #[test]
    fn test_find_by_buffer_identity() {
        let mut registry = SampleRegistry::new();
        let first = entry(10, 1);
        let buffer = first.buffer.clone();
        registry.insert(PathBuf::from("a.wav"), first);
        registry.insert(PathBuf::from("b.wav"), entry(10, 1));

        let (path, found) = registry.find_by_buffer_mut(&buffer).unwrap();
        assert_eq!(path, Path::new("a.wav"));
        assert!(Arc::ptr_eq(&found.buffer, &buffer));

        // A buffer with identical contents but a different allocation is not
        // the same entry.
        let stranger = Arc::new(decoded_pcm_buffer(&vec![0i16; 10], 1, 22050));
        assert!(registry.find_by_buffer_mut(&stranger).is_none());
    }
}
