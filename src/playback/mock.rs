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
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::decode::SampleBuffer;

/// A mock playback layer. Doesn't stop anything, just records the buffers it
/// was told to stop.
#[derive(Clone, Default)]
pub struct Playback {
    stopped: Arc<Mutex<Vec<Arc<SampleBuffer>>>>,
}

impl Playback {
    /// Creates a new mock playback layer.
    pub fn new() -> Playback {
        Playback::default()
    }

    /// Returns the buffers force-stopped so far, in notification order.
    pub fn stopped(&self) -> Vec<Arc<SampleBuffer>> {
        self.stopped.lock().clone()
    }

    /// Returns the number of force-stop notifications received.
    pub fn stop_count(&self) -> usize {
        self.stopped.lock().len()
    }
}

impl crate::playback::Playback for Playback {
    fn force_stop(&self, buffer: &Arc<SampleBuffer>) {
        debug!(size = buffer.size_bytes(), "Force-stop (mock)");
        self.stopped.lock().push(buffer.clone());
    }
}
