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

//! The playback collaborator seam.
//!
//! The cache never talks to voices directly. When eviction or shutdown is
//! about to release a buffer, it notifies the playback layer through the
//! [`Playback`] trait so any voice still reading that buffer is stopped
//! first.

pub mod mock;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::decode::SampleBuffer;

/// Receives force-stop notifications from the cache.
///
/// Implementations are called with the cache lock held and must be fast and
/// non-blocking: enqueue and return. They must never call back into the
/// cache, even transitively, or open/close from another thread will deadlock.
pub trait Playback: Send + Sync {
    /// Instructs the playback layer to immediately stop every voice reading
    /// the given buffer. The buffer is about to be released by the cache.
    fn force_stop(&self, buffer: &Arc<SampleBuffer>);
}

/// A force-stop instruction for the mixing thread.
pub struct StopCommand {
    /// The buffer being reclaimed. Voices reading it must stop.
    pub buffer: Arc<SampleBuffer>,
}

/// Sends [`StopCommand`]s over a channel drained by the mixing thread.
///
/// This keeps the notification enqueue-only, so holding the cache lock while
/// notifying cannot block on playback code.
pub struct ChannelPlayback {
    stop_tx: crossbeam_channel::Sender<StopCommand>,
}

impl ChannelPlayback {
    /// Creates a channel-backed playback notifier and the receiving end for
    /// the mixing thread.
    pub fn new() -> (Self, crossbeam_channel::Receiver<StopCommand>) {
        let (stop_tx, stop_rx) = crossbeam_channel::unbounded();
        (Self { stop_tx }, stop_rx)
    }
}

impl Playback for ChannelPlayback {
    fn force_stop(&self, buffer: &Arc<SampleBuffer>) {
        debug!(size = buffer.size_bytes(), "Queueing force-stop");
        if self
            .stop_tx
            .send(StopCommand {
                buffer: buffer.clone(),
            })
            .is_err()
        {
            // The mixing thread is gone; nothing is reading buffers anymore.
            warn!("Force-stop receiver disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::decoded_pcm_buffer;

    #[test]
    fn test_channel_playback_delivers_stop() {
        let (playback, stop_rx) = ChannelPlayback::new();
        let buffer = Arc::new(decoded_pcm_buffer(&[1i16, 2, 3], 1, 22050));

        playback.force_stop(&buffer);

        let command = stop_rx.try_recv().unwrap();
        assert!(Arc::ptr_eq(&command.buffer, &buffer));
    }

    #[test]
    fn test_channel_playback_tolerates_disconnect() {
        let (playback, stop_rx) = ChannelPlayback::new();
        drop(stop_rx);

        let buffer = Arc::new(decoded_pcm_buffer(&[1i16], 1, 22050));
        playback.force_stop(&buffer);
    }
}
